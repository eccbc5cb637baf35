use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};

use super::contract::{Contract, ContractId, ContractStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccrualStateId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Active,
    Paused,
    Completed,
}

/// Progressive accrual bookkeeping of a single contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualState {
    pub id: AccrualStateId,
    pub contract_id: ContractId,
    pub total_amount_to_accrue: f64,
    pub total_amount_accrued: f64,
    pub remaining_amount_to_accrue: f64,
    pub total_sessions_to_accrue: u32,
    pub total_sessions_accrued: u32,
    pub remaining_sessions_to_accrue: u32,
    pub status: AccrualStatus,
    /// Latest month in which a run changed this state. Runs for earlier months
    /// leave the contract untouched.
    pub last_accrual_month: Option<NaiveDate>,
    pub checkpoint: Option<AccrualCheckpoint>,
}

/// Balances of an accrual state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualSnapshot {
    pub total_amount_to_accrue: f64,
    pub total_amount_accrued: f64,
    pub remaining_amount_to_accrue: f64,
    pub total_sessions_to_accrue: u32,
    pub total_sessions_accrued: u32,
    pub remaining_sessions_to_accrue: u32,
    pub status: AccrualStatus,
}

/// State as it was before the run for `month` touched it. Restored when the
/// same month is processed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualCheckpoint {
    pub month: NaiveDate,
    pub before: AccrualSnapshot,
    pub contract_status_before: ContractStatus,
    pub previous_accrual_month: Option<NaiveDate>,
}

// --

impl std::fmt::Display for AccrualStateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Active => write!(f, "ACTIVE"),
            AccrualStatus::Paused => write!(f, "PAUSED"),
            AccrualStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl AccrualState {
    /// Initial state for a contract that is processed for the first time.
    pub fn for_contract(id: AccrualStateId, contract: &Contract) -> Self {
        Self {
            id,
            contract_id: contract.id,
            total_amount_to_accrue: contract.total_amount,
            total_amount_accrued: 0.0,
            remaining_amount_to_accrue: contract.total_amount,
            total_sessions_to_accrue: contract.total_sessions,
            total_sessions_accrued: 0,
            remaining_sessions_to_accrue: contract.total_sessions,
            status: AccrualStatus::Active,
            last_accrual_month: None,
            checkpoint: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AccrualStatus::Completed
    }

    pub fn snapshot(&self) -> AccrualSnapshot {
        AccrualSnapshot {
            total_amount_to_accrue: self.total_amount_to_accrue,
            total_amount_accrued: self.total_amount_accrued,
            remaining_amount_to_accrue: self.remaining_amount_to_accrue,
            total_sessions_to_accrue: self.total_sessions_to_accrue,
            total_sessions_accrued: self.total_sessions_accrued,
            remaining_sessions_to_accrue: self.remaining_sessions_to_accrue,
            status: self.status,
        }
    }

    /// Rolls the state back to its checkpoint, returning the contract status
    /// recorded with it. No-op returning `None` when there is no checkpoint
    /// for `month`.
    pub fn rollback_to(&mut self, month: NaiveDate) -> Option<ContractStatus> {
        if self.checkpoint.as_ref().map(|c| c.month) != Some(month) {
            return None;
        }
        let checkpoint = self.checkpoint.take()?;
        let AccrualSnapshot {
            total_amount_to_accrue,
            total_amount_accrued,
            remaining_amount_to_accrue,
            total_sessions_to_accrue,
            total_sessions_accrued,
            remaining_sessions_to_accrue,
            status,
        } = checkpoint.before;
        self.total_amount_to_accrue = total_amount_to_accrue;
        self.total_amount_accrued = total_amount_accrued;
        self.remaining_amount_to_accrue = remaining_amount_to_accrue;
        self.total_sessions_to_accrue = total_sessions_to_accrue;
        self.total_sessions_accrued = total_sessions_accrued;
        self.remaining_sessions_to_accrue = remaining_sessions_to_accrue;
        self.status = status;
        self.last_accrual_month = checkpoint.previous_accrual_month;
        Some(checkpoint.contract_status_before)
    }

    /// Records that the run for `month` changed this state, keeping `before`
    /// so the month can be replayed.
    pub fn seal(
        &mut self,
        month: NaiveDate,
        before: AccrualSnapshot,
        contract_status_before: ContractStatus,
        previous_accrual_month: Option<NaiveDate>,
    ) {
        self.checkpoint = Some(AccrualCheckpoint {
            month,
            before,
            contract_status_before,
            previous_accrual_month,
        });
        self.last_accrual_month = Some(month);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use iso_currency::Currency;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rollback_restores_balances_and_contract_status() {
        let contract = Contract::new(1, "Full-Stack", 1000.0, Currency::EUR, date(2025, 1, 1), 10);
        let mut state = AccrualState::for_contract(AccrualStateId(7), &contract);
        let before = state.snapshot();

        state.total_amount_accrued = 400.0;
        state.remaining_amount_to_accrue = 600.0;
        state.total_sessions_accrued = 4;
        state.remaining_sessions_to_accrue = 6;
        state.seal(date(2025, 2, 1), before.clone(), ContractStatus::Active, None);

        assert_eq!(state.rollback_to(date(2025, 3, 1)), None);
        assert_eq!(
            state.rollback_to(date(2025, 2, 1)),
            Some(ContractStatus::Active)
        );
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.last_accrual_month, None);
        assert!(state.checkpoint.is_none());
    }
}
