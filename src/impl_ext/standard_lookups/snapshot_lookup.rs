use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::{
    data::datasources::education_csv_datasource::{
        EducationCsvDatasource as _, EducationCsvDatasourceImpl,
    },
    domain::repositories::education_lookup::EducationLookup,
    entities::EducationRecord,
};

use super::static_lookup::StaticEducationLookup;

/// Education lookup backed by a CSV export of the education system, with the
/// columns `client_external_id, status, status_change_date`.
pub struct SnapshotEducationLookup {
    records: StaticEducationLookup,
}

impl SnapshotEducationLookup {
    pub fn from_string(csv: &str) -> Result<Self, ServerError> {
        Ok(Self {
            records: EducationCsvDatasourceImpl::new().from_string(csv)?.into(),
        })
    }

    pub async fn from_file<P>(path: P) -> Result<Self, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
    {
        Ok(Self {
            records: EducationCsvDatasourceImpl::new().from_file(path).await?.into(),
        })
    }
}

#[async_trait]
impl EducationLookup for SnapshotEducationLookup {
    async fn lookup(
        &self,
        client_external_id: &str,
    ) -> Result<Option<EducationRecord>, ServerError> {
        self.records.lookup(client_external_id).await
    }
}
