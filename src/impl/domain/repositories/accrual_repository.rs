use async_trait::async_trait;
use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::entities::{
    AccrualConfig, AccrualState, AccrualStateId, CommitReceipt, Contract, ContractChangeset,
    ContractId, Period, PeriodId, Posting,
};

/// Storage of contracts, periods, accrual states and postings.
///
/// Errors returned by a repository abort the whole batch, so implementations
/// should only fail on storage problems and on invalid input.
#[async_trait]
pub trait AccrualRepository: Send + Sync {
    async fn save_contract(&self, contract: Contract) -> Result<(), ServerError>;

    async fn contract(&self, id: ContractId) -> Result<Contract, ServerError>;

    /// Inserts or replaces a period. Periods with an invalid date range or
    /// session cadence are rejected.
    async fn save_period(&self, period: Period) -> Result<(), ServerError>;

    async fn remove_period(&self, id: PeriodId) -> Result<(), ServerError>;

    async fn periods_for_contract(&self, id: ContractId) -> Result<Vec<Period>, ServerError>;

    async fn accrual_state(&self, id: ContractId) -> Result<Option<AccrualState>, ServerError>;

    /// Creates the accrual state of a contract. Fails if one exists already.
    async fn create_accrual_state(&self, contract: &Contract)
        -> Result<AccrualState, ServerError>;

    async fn postings_for_state(&self, id: AccrualStateId) -> Result<Vec<Posting>, ServerError>;

    async fn postings_for_month(&self, month: NaiveDate) -> Result<Vec<Posting>, ServerError>;

    /// Contracts that may need work in `month`: started by the end of the
    /// month and not yet settled.
    async fn candidate_contracts(
        &self,
        month: NaiveDate,
        config: &AccrualConfig,
    ) -> Result<Vec<ContractId>, ServerError>;

    /// Writes a contract run atomically. The postings of the changeset month
    /// replace the ones stored for the accrual state in that month; postings of
    /// any other month are rejected.
    async fn commit(&self, changeset: ContractChangeset) -> Result<CommitReceipt, ServerError>;
}
