use chrono::NaiveDate;

use super::{
    accrual_state::AccrualState,
    contract::{ContractId, ContractStatus},
    posting::Posting,
};

/// Everything one contract run writes. Committed atomically: the postings of
/// `month` for the accrual state are replaced by `postings`, the state is
/// saved and the contract takes `contract_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractChangeset {
    pub contract_id: ContractId,
    pub month: NaiveDate,
    pub contract_status: ContractStatus,
    pub state: AccrualState,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub postings_created: usize,
    pub postings_updated: usize,
    pub postings_removed: usize,
}
