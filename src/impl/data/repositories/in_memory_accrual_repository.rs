use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use fractic_server_error::ServerError;
use tokio::sync::RwLock;

use crate::{
    domain::{
        logic::utils::{month_end_date, month_start_date},
        repositories::accrual_repository::AccrualRepository,
    },
    entities::{
        AccrualConfig, AccrualState, AccrualStateId, CommitReceipt, Contract, ContractChangeset,
        ContractId, Period, PeriodId, Posting, PostingKey,
    },
    errors::{AccrualStateAlreadyExists, ContractNotFound, HistoricalPostingRejected},
};

#[derive(Debug, Default)]
struct Store {
    contracts: BTreeMap<ContractId, Contract>,
    periods: BTreeMap<PeriodId, Period>,
    states: BTreeMap<ContractId, AccrualState>,
    postings: BTreeMap<PostingKey, Posting>,
    next_state_id: u64,
}

/// Repository keeping everything in memory behind a single lock, which makes
/// every commit atomic.
#[derive(Debug, Default)]
pub struct InMemoryAccrualRepository {
    store: RwLock<Store>,
}

impl InMemoryAccrualRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored posting, ordered by natural key.
    pub async fn all_postings(&self) -> Vec<Posting> {
        self.store.read().await.postings.values().cloned().collect()
    }
}

#[async_trait]
impl AccrualRepository for InMemoryAccrualRepository {
    async fn save_contract(&self, contract: Contract) -> Result<(), ServerError> {
        self.store
            .write()
            .await
            .contracts
            .insert(contract.id, contract);
        Ok(())
    }

    async fn contract(&self, id: ContractId) -> Result<Contract, ServerError> {
        self.store
            .read()
            .await
            .contracts
            .get(&id)
            .cloned()
            .ok_or_else(|| ContractNotFound::new(&id))
    }

    async fn save_period(&self, period: Period) -> Result<(), ServerError> {
        period.validate()?;
        self.store.write().await.periods.insert(period.id, period);
        Ok(())
    }

    async fn remove_period(&self, id: PeriodId) -> Result<(), ServerError> {
        self.store.write().await.periods.remove(&id);
        Ok(())
    }

    async fn periods_for_contract(&self, id: ContractId) -> Result<Vec<Period>, ServerError> {
        Ok(self
            .store
            .read()
            .await
            .periods
            .values()
            .filter(|p| p.contract_id == id)
            .cloned()
            .collect())
    }

    async fn accrual_state(&self, id: ContractId) -> Result<Option<AccrualState>, ServerError> {
        Ok(self.store.read().await.states.get(&id).cloned())
    }

    async fn create_accrual_state(
        &self,
        contract: &Contract,
    ) -> Result<AccrualState, ServerError> {
        let mut store = self.store.write().await;
        if store.states.contains_key(&contract.id) {
            return Err(AccrualStateAlreadyExists::new(&contract.id));
        }
        store.next_state_id += 1;
        let state = AccrualState::for_contract(AccrualStateId(store.next_state_id), contract);
        store.states.insert(contract.id, state.clone());
        Ok(state)
    }

    async fn postings_for_state(&self, id: AccrualStateId) -> Result<Vec<Posting>, ServerError> {
        Ok(self
            .store
            .read()
            .await
            .postings
            .values()
            .filter(|p| p.accrual_state_id == id)
            .cloned()
            .collect())
    }

    async fn postings_for_month(&self, month: NaiveDate) -> Result<Vec<Posting>, ServerError> {
        let month = month_start_date(month);
        Ok(self
            .store
            .read()
            .await
            .postings
            .values()
            .filter(|p| p.accrual_date == month)
            .cloned()
            .collect())
    }

    async fn candidate_contracts(
        &self,
        month: NaiveDate,
        config: &AccrualConfig,
    ) -> Result<Vec<ContractId>, ServerError> {
        let month_end = month_end_date(month)?;
        let store = self.store.read().await;
        Ok(store
            .contracts
            .values()
            .filter(|c| c.start_date <= month_end)
            .filter(|c| match store.states.get(&c.id) {
                None => true,
                Some(state) if !state.is_completed() => true,
                // Completed: only a status left to settle, or a recalculated
                // total that grew since.
                Some(state) => {
                    !c.status.is_terminal()
                        || (config.is_recalculated_product(&c.product)
                            && c.total_amount > state.total_amount_to_accrue)
                }
            })
            .map(|c| c.id)
            .collect())
    }

    async fn commit(&self, changeset: ContractChangeset) -> Result<CommitReceipt, ServerError> {
        let ContractChangeset {
            contract_id,
            month,
            contract_status,
            state,
            postings,
        } = changeset;
        if let Some(p) = postings.iter().find(|p| p.accrual_date != month) {
            return Err(HistoricalPostingRejected::new(
                &contract_id,
                &p.accrual_date,
                &month,
            ));
        }

        let mut store = self.store.write().await;
        let contract = store
            .contracts
            .get_mut(&contract_id)
            .ok_or_else(|| ContractNotFound::new(&contract_id))?;
        contract.status = contract_status;

        let stale: Vec<PostingKey> = store
            .postings
            .keys()
            .filter(|k| k.accrual_state_id == state.id && k.month == month)
            .copied()
            .collect();
        let mut receipt = CommitReceipt::default();
        let mut previous = BTreeMap::new();
        for key in stale {
            if let Some(posting) = store.postings.remove(&key) {
                previous.insert(key, posting);
            }
        }
        for posting in postings {
            let key = posting.key();
            match previous.remove(&key) {
                Some(_) => receipt.postings_updated += 1,
                None => receipt.postings_created += 1,
            }
            store.postings.insert(key, posting);
        }
        receipt.postings_removed = previous.len();

        store.states.insert(contract_id, state);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use iso_currency::Currency;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(state: &AccrualState, month: NaiveDate, amount: f64) -> Posting {
        Posting {
            accrual_state_id: state.id,
            contract_id: state.contract_id,
            period_id: None,
            accrual_date: month,
            amount,
            portion: 1.0,
            sessions: 0,
            total_contract_amount: state.total_amount_to_accrue,
            currency: Currency::EUR,
            period_status: None,
            status_change_date: None,
        }
    }

    #[tokio::test]
    async fn accrual_state_is_unique_per_contract() {
        let repo = InMemoryAccrualRepository::new();
        let contract = Contract::new(1, "Python", 100.0, Currency::EUR, date(2025, 1, 1), 10);
        repo.save_contract(contract.clone()).await.unwrap();
        repo.create_accrual_state(&contract).await.unwrap();
        assert!(repo.create_accrual_state(&contract).await.is_err());
    }

    #[tokio::test]
    async fn commit_replaces_month_postings_and_rejects_other_months() {
        let repo = InMemoryAccrualRepository::new();
        let contract = Contract::new(1, "Python", 100.0, Currency::EUR, date(2025, 1, 1), 10);
        repo.save_contract(contract.clone()).await.unwrap();
        let state = repo.create_accrual_state(&contract).await.unwrap();
        let month = date(2025, 2, 1);

        let changeset = |amount: f64| ContractChangeset {
            contract_id: contract.id,
            month,
            contract_status: contract.status,
            state: state.clone(),
            postings: vec![posting(&state, month, amount)],
        };
        let receipt = repo.commit(changeset(40.0)).await.unwrap();
        assert_eq!(receipt.postings_created, 1);
        let receipt = repo.commit(changeset(40.0)).await.unwrap();
        assert_eq!(receipt.postings_updated, 1);
        assert_eq!(repo.postings_for_month(month).await.unwrap().len(), 1);

        let mut historical = changeset(10.0);
        historical.postings = vec![posting(&state, date(2025, 1, 1), 10.0)];
        assert!(repo.commit(historical).await.is_err());
        assert!(repo
            .postings_for_month(date(2025, 1, 1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn invalid_period_is_rejected() {
        let repo = InMemoryAccrualRepository::new();
        let period = Period::new(1, ContractId(1), date(2025, 3, 1), date(2025, 2, 1), 2);
        assert!(repo.save_period(period).await.is_err());
    }
}
