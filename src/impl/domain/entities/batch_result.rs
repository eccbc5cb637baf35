use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};

use super::{
    accrual_state::AccrualStatus,
    contract::{ContractId, ContractStatus},
    notification::{Notification, NotificationKind},
    posting::Posting,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Success,
    Skipped,
    Failed,
}

/// What happened to one contract during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOutcome {
    pub contract_id: ContractId,
    pub case: String,
    pub status: ProcessingStatus,
    pub action: String,
    /// Sum of the postings written for the contract this run.
    pub amount_accrued: f64,
    pub contract_status_before: ContractStatus,
    pub contract_status: ContractStatus,
    pub accrual_status: Option<AccrualStatus>,
    /// Whether the accrual state reached COMPLETED during this run.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// First day of the processed month.
    pub month: NaiveDate,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub postings_created: usize,
    pub postings_updated: usize,
    /// Postings written by this run, ordered by natural key.
    pub postings: Vec<Posting>,
    /// Ordered by contract id.
    pub outcomes: Vec<ContractOutcome>,
    pub notifications: BTreeMap<NotificationKind, Vec<Notification>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Success,
    Partial,
    Failed,
}

/// Condensed view of a run for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub month: NaiveDate,
    pub status: OverallStatus,
    pub total_contracts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Accrued amounts per currency code.
    pub total_accrued: BTreeMap<String, f64>,
    pub contracts_completed: usize,
    pub contracts_closed: usize,
    pub contracts_canceled: usize,
    pub critical_notifications: usize,
    pub warning_notifications: usize,
    pub failed_contract_ids: Vec<ContractId>,
    pub data_consistent: bool,
    pub requires_manual_review: bool,
}

// --

impl BatchResult {
    pub fn notifications_of(&self, kind: NotificationKind) -> &[Notification] {
        self.notifications
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn outcome(&self, contract_id: ContractId) -> Option<&ContractOutcome> {
        self.outcomes.iter().find(|o| o.contract_id == contract_id)
    }

    pub fn summary(&self) -> BatchSummary {
        let status = if self.failed == 0 {
            OverallStatus::Success
        } else if self.succeeded == 0 {
            OverallStatus::Failed
        } else {
            OverallStatus::Partial
        };

        let mut total_accrued: BTreeMap<String, f64> = BTreeMap::new();
        for posting in &self.postings {
            *total_accrued
                .entry(posting.currency.code().to_string())
                .or_default() += posting.amount;
        }

        let transitioned_to = |status: ContractStatus| {
            self.outcomes
                .iter()
                .filter(|o| o.contract_status == status && o.contract_status_before != status)
                .count()
        };

        let critical_notifications = self
            .notifications
            .iter()
            .filter(|(kind, _)| kind.is_critical())
            .map(|(_, v)| v.len())
            .sum::<usize>();
        let warning_notifications = self
            .notifications
            .values()
            .map(Vec::len)
            .sum::<usize>()
            - critical_notifications;

        let failure_rate = self.failed as f64 / self.processed.max(1) as f64;

        BatchSummary {
            month: self.month,
            status,
            total_contracts: self.processed,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            total_accrued,
            contracts_completed: self.outcomes.iter().filter(|o| o.completed).count(),
            contracts_closed: transitioned_to(ContractStatus::Closed),
            contracts_canceled: transitioned_to(ContractStatus::Canceled),
            critical_notifications,
            warning_notifications,
            failed_contract_ids: self
                .outcomes
                .iter()
                .filter(|o| o.status == ProcessingStatus::Failed)
                .map(|o| o.contract_id)
                .collect(),
            data_consistent: self.failed == 0,
            requires_manual_review: critical_notifications > 0
                || self.failed > 0
                || failure_rate > 0.1,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Success => write!(f, "SUCCESS"),
            OverallStatus::Partial => write!(f, "PARTIAL"),
            OverallStatus::Failed => write!(f, "FAILED"),
        }
    }
}
