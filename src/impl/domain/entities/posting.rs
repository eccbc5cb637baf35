use chrono::NaiveDate;
use iso_currency::Currency;
use serde_derive::{Deserialize, Serialize};

use super::{
    accrual_state::AccrualStateId,
    contract::ContractId,
    period::{PeriodId, PeriodStatus},
};

/// Natural key of a posting. At most one posting exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostingKey {
    pub accrual_state_id: AccrualStateId,
    pub period_id: Option<PeriodId>,
    pub month: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub accrual_state_id: AccrualStateId,
    pub contract_id: ContractId,
    /// `None` for catch-all postings that don't map to an enrollment period.
    pub period_id: Option<PeriodId>,
    /// First day of the accrued month.
    pub accrual_date: NaiveDate,
    pub amount: f64,
    /// Share of the remaining amount accrued by this posting.
    pub portion: f64,
    pub sessions: u32,
    pub total_contract_amount: f64,
    pub currency: Currency,
    pub period_status: Option<PeriodStatus>,
    pub status_change_date: Option<NaiveDate>,
}

// --

impl Posting {
    pub fn key(&self) -> PostingKey {
        PostingKey {
            accrual_state_id: self.accrual_state_id,
            period_id: self.period_id,
            month: self.accrual_date,
        }
    }
}
