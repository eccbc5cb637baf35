use std::{collections::HashMap, str::FromStr as _};

use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    data::models::{education_status_model::EducationStatusModel, iso_date_model::ISODateModel},
    entities::EducationRecord,
    errors::{InvalidCsv, InvalidCsvContent, ReadError},
};

/// Reads an education system export with the columns
/// `client_external_id, status, status_change_date` (the date may be empty).
#[async_trait]
pub(crate) trait EducationCsvDatasource: Send + Sync {
    fn from_string(&self, s: &str) -> Result<HashMap<String, EducationRecord>, ServerError>;

    async fn from_file<P>(&self, path: P) -> Result<HashMap<String, EducationRecord>, ServerError>
    where
        P: AsRef<std::path::Path> + Send;
}

pub(crate) struct EducationCsvDatasourceImpl;

impl EducationCsvDatasourceImpl {
    pub(crate) fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EducationCsvDatasource for EducationCsvDatasourceImpl {
    fn from_string(&self, s: &str) -> Result<HashMap<String, EducationRecord>, ServerError> {
        csv::Reader::from_reader(s.as_bytes())
            .records()
            .map(|r| {
                r.map_err(|e| InvalidCsv::with_debug(&e)).and_then(|r| {
                    // Extract from CSV record.
                    let raw_client = r.get(0).unwrap_or("").trim();
                    let raw_status = r.get(1).unwrap_or("");
                    let raw_date = r.get(2).unwrap_or("").trim();

                    // Parse.
                    if raw_client.is_empty() {
                        return Err(InvalidCsvContent::new("missing client external id"));
                    }
                    let status = EducationStatusModel::from_str(raw_status)?;
                    let date = match raw_date {
                        "" => None,
                        d => Some(ISODateModel::from_str(d)?),
                    };

                    // Build.
                    Ok((
                        raw_client.to_string(),
                        EducationRecord::new(status.into(), date.map(Into::into)),
                    ))
                })
            })
            .collect()
    }

    async fn from_file<P>(&self, path: P) -> Result<HashMap<String, EducationRecord>, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
    {
        let s = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ReadError::with_debug(&e))?;
        self.from_string(&s)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::entities::EducationStatus;

    use super::*;

    #[test]
    fn parses_export() {
        let csv = "client_external_id,status,status_change_date\n\
                   c-1,Graduated,2025-03-14\n\
                   c-2,early dropped,\n";
        let records = EducationCsvDatasourceImpl::new().from_string(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records["c-1"],
            EducationRecord::new(
                EducationStatus::Graduated,
                NaiveDate::from_ymd_opt(2025, 3, 14)
            )
        );
        assert_eq!(records["c-2"].status, EducationStatus::EarlyDropped);
        assert_eq!(records["c-2"].status_change_date, None);
    }

    #[test]
    fn rejects_rows_without_client() {
        let csv = "client_external_id,status,status_change_date\n,ENDED,\n";
        assert!(EducationCsvDatasourceImpl::new().from_string(csv).is_err());
    }
}
