use serde_derive::{Deserialize, Serialize};

use super::contract::ContractId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Local status contradicts the education system. Needs human review.
    NotCongruentStatus,
    /// Recent contract not yet known to the education system. Retried on the
    /// next run.
    MissingCrmData,
    /// Unexpected failure while processing a contract. The contract was left
    /// untouched.
    ProcessingError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub contract_id: ContractId,
    pub message: String,
}

// --

impl NotificationKind {
    pub fn is_critical(&self) -> bool {
        matches!(self, NotificationKind::NotCongruentStatus)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::NotCongruentStatus => write!(f, "not_congruent_status"),
            NotificationKind::MissingCrmData => write!(f, "missing_crm_data"),
            NotificationKind::ProcessingError => write!(f, "processing_error"),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] contract {}: {}",
            self.kind, self.contract_id, self.message
        )
    }
}
