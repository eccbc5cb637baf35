use std::str::FromStr;

use fractic_server_error::ServerError;

use crate::entities::EducationStatus;

/// Raw education status as exported by the education system. Case and
/// separators vary between exports ("Early dropped", "EARLY_DROPPED").
#[derive(Debug)]
pub(crate) struct EducationStatusModel(EducationStatus);

impl FromStr for EducationStatusModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s
            .trim()
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase();
        let status = match normalised.as_str() {
            "ACTIVE" => EducationStatus::Active,
            "POSTPONED" => EducationStatus::Postponed,
            "GRADUATED" => EducationStatus::Graduated,
            "ENDED" => EducationStatus::Ended,
            "NOT_COMPLETING" => EducationStatus::NotCompleting,
            "DROPPED" => EducationStatus::Dropped,
            "EARLY_DROPPED" => EducationStatus::EarlyDropped,
            "SUSPENDED" => EducationStatus::Suspended,
            _ => EducationStatus::Other(normalised),
        };
        Ok(EducationStatusModel(status))
    }
}

impl Into<EducationStatus> for EducationStatusModel {
    fn into(self) -> EducationStatus {
        self.0
    }
}
