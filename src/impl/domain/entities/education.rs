use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};

/// Educational status of a client as reported by the education system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationStatus {
    Active,
    Postponed,
    Graduated,
    Ended,
    NotCompleting,
    Dropped,
    EarlyDropped,
    Suspended,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub status: EducationStatus,
    /// Drop date or certification date, whichever applies.
    pub status_change_date: Option<NaiveDate>,
}

// --

impl EducationStatus {
    /// Ended family: the client left the program after finishing it, with or
    /// without a certificate.
    pub fn is_ended(&self) -> bool {
        matches!(
            self,
            EducationStatus::Graduated | EducationStatus::Ended | EducationStatus::NotCompleting
        )
    }

    /// Dropped family: drop-outs and suspensions.
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            EducationStatus::Dropped | EducationStatus::EarlyDropped | EducationStatus::Suspended
        )
    }

    /// Whether the outcome counts as a successful completion. Every other
    /// terminal outcome is a non-completion.
    pub fn is_completion(&self) -> bool {
        matches!(self, EducationStatus::Graduated | EducationStatus::Ended)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_ended() || self.is_dropped()
    }
}

impl std::fmt::Display for EducationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EducationStatus::Active => write!(f, "ACTIVE"),
            EducationStatus::Postponed => write!(f, "POSTPONED"),
            EducationStatus::Graduated => write!(f, "GRADUATED"),
            EducationStatus::Ended => write!(f, "ENDED"),
            EducationStatus::NotCompleting => write!(f, "NOT_COMPLETING"),
            EducationStatus::Dropped => write!(f, "DROPPED"),
            EducationStatus::EarlyDropped => write!(f, "EARLY_DROPPED"),
            EducationStatus::Suspended => write!(f, "SUSPENDED"),
            EducationStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

impl EducationRecord {
    pub fn new(status: EducationStatus, status_change_date: Option<NaiveDate>) -> Self {
        Self {
            status,
            status_change_date,
        }
    }
}
