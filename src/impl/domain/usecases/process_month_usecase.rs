use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use fractic_server_error::ServerError;
use futures::{stream, StreamExt as _, TryStreamExt as _};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    data::repositories::{
        in_memory_accrual_repository::InMemoryAccrualRepository,
        memoized_education_lookup::MemoizedEducationLookup,
    },
    domain::{
        logic::{
            accrual_math::reopen,
            case_handlers::{resolve, HandlerContext},
            classifier::classify,
            resolution_executor::{Execution, ResolutionExecutor},
            utils::{month_start_date, month_start_dates},
        },
        repositories::{accrual_repository::AccrualRepository, education_lookup::EducationLookup},
    },
    entities::{
        AccrualConfig, AccrualState, AccrualStatus, BatchResult, Case, Continuation, Contract,
        ContractChangeset, ContractId, ContractOutcome, ContractStatus, Notification,
        NotificationKind, Period, Posting, ProcessingStatus,
    },
};

#[async_trait]
pub trait ProcessMonthUsecase: Send + Sync {
    /// Runs the engine for the month containing `target_month`.
    async fn process_month(&self, target_month: NaiveDate) -> Result<BatchResult, ServerError>;

    /// Runs the engine once per month from `from` to `to`, in chronological
    /// order.
    async fn process_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BatchResult>, ServerError>;
}

pub(crate) struct ProcessMonthUsecaseImpl<
    L,
    R = InMemoryAccrualRepository, // Default.
> where
    L: EducationLookup + ?Sized,
    R: AccrualRepository + ?Sized,
{
    repository: Arc<R>,
    education_lookup: Arc<L>,
    config: AccrualConfig,
    contract_locks: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

/// Result of one contract run, before aggregation.
struct ContractRun {
    outcome: ContractOutcome,
    postings: Vec<Posting>,
    postings_created: usize,
    postings_updated: usize,
    notification: Option<Notification>,
}

/// Contract run computed in memory, not yet committed.
struct Evaluation {
    case: Case,
    execution: Execution,
}

#[async_trait]
impl<L, R> ProcessMonthUsecase for ProcessMonthUsecaseImpl<L, R>
where
    L: EducationLookup + ?Sized,
    R: AccrualRepository + ?Sized,
{
    async fn process_month(&self, target_month: NaiveDate) -> Result<BatchResult, ServerError> {
        let month = month_start_date(target_month);
        let candidates = self
            .repository
            .candidate_contracts(month, &self.config)
            .await?;
        info!(%month, candidates = candidates.len(), "accrual run started");

        let lookup = MemoizedEducationLookup::new(
            self.education_lookup.clone(),
            self.config.lookup_timeout,
        );
        let runs: Vec<ContractRun> = stream::iter(candidates)
            .map(|contract_id| self.process_contract(contract_id, month, &lookup))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;
        self.release_idle_locks().await;

        let result = aggregate(month, runs);
        info!(
            %month,
            processed = result.processed,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            postings = result.postings.len(),
            "accrual run finished"
        );
        Ok(result)
    }

    async fn process_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BatchResult>, ServerError> {
        let mut results = Vec::new();
        for month in month_start_dates(from, to)? {
            results.push(self.process_month(month).await?);
        }
        Ok(results)
    }
}

impl<L, R> ProcessMonthUsecaseImpl<L, R>
where
    L: EducationLookup + ?Sized,
    R: AccrualRepository + ?Sized,
{
    pub(crate) fn new(
        repository: Arc<R>,
        education_lookup: Arc<L>,
        config: AccrualConfig,
    ) -> Self {
        ProcessMonthUsecaseImpl {
            repository,
            education_lookup,
            config,
            contract_locks: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn config(&self) -> &AccrualConfig {
        &self.config
    }

    async fn contract_lock(&self, contract_id: ContractId) -> Arc<Mutex<()>> {
        self.contract_locks
            .lock()
            .await
            .entry(contract_id)
            .or_default()
            .clone()
    }

    /// Forgets the locks no run is holding on to.
    async fn release_idle_locks(&self) {
        self.contract_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Runs a single contract under its lock. Only repository errors are
    /// returned; anything else becomes a FAILED outcome.
    async fn process_contract(
        &self,
        contract_id: ContractId,
        month: NaiveDate,
        lookup: &MemoizedEducationLookup<L>,
    ) -> Result<ContractRun, ServerError> {
        let lock = self.contract_lock(contract_id).await;
        let _guard = lock.lock().await;

        let mut contract = self.repository.contract(contract_id).await?;
        let periods = self.repository.periods_for_contract(contract_id).await?;
        let mut state = match self.repository.accrual_state(contract_id).await? {
            Some(state) => state,
            None => self.repository.create_accrual_state(&contract).await?,
        };

        if state.last_accrual_month.is_some_and(|m| m > month) {
            debug!(%contract_id, %month, "history sealed by a later run");
            return Ok(ContractRun::skipped(
                &contract,
                &state,
                "sealed",
                "skipped: a later month was already processed",
            ));
        }

        // Same-month re-run: start again from the state before the last run.
        let restored = state.rollback_to(month);
        if let Some(status) = restored {
            debug!(%contract_id, %month, "restored checkpoint");
            contract.status = status;
        }
        let contract_status_before = contract.status;
        let snapshot_before = state.snapshot();
        let previous_accrual_month = state.last_accrual_month;

        let evaluation = self
            .evaluate(&mut contract, &mut state, &periods, month, lookup)
            .await;
        let Evaluation { case, execution } = match evaluation {
            Ok(evaluation) => evaluation,
            Err(e) => {
                error!(%contract_id, %month, error = ?e, "contract processing failed");
                return Ok(ContractRun::failed(contract_id, contract_status_before, &e));
            }
        };
        debug!(
            %contract_id,
            %month,
            case = %case,
            action = %execution.action,
            "contract processed"
        );

        let changed = state.snapshot() != snapshot_before
            || contract.status != contract_status_before
            || !execution.postings.is_empty();
        if changed {
            state.seal(
                month,
                snapshot_before.clone(),
                contract_status_before,
                previous_accrual_month,
            );
        }
        let (postings_created, postings_updated) = if changed || restored.is_some() {
            let receipt = self
                .repository
                .commit(ContractChangeset {
                    contract_id,
                    month,
                    contract_status: contract.status,
                    state: state.clone(),
                    postings: execution.postings.clone(),
                })
                .await?;
            (receipt.postings_created, receipt.postings_updated)
        } else {
            (0, 0)
        };

        let notification = execution.notification.map(|(kind, message)| {
            warn!(%contract_id, %month, kind = %kind, "{}", message);
            Notification {
                kind,
                contract_id,
                message,
            }
        });
        let amount_accrued = execution.postings.iter().map(|p| p.amount).sum();
        Ok(ContractRun {
            outcome: ContractOutcome {
                contract_id,
                case: case.name().to_string(),
                status: execution.status,
                action: execution.action,
                amount_accrued,
                contract_status_before,
                contract_status: contract.status,
                accrual_status: Some(state.status),
                completed: state.is_completed() && snapshot_before.status != AccrualStatus::Completed,
            },
            postings: execution.postings,
            postings_created,
            postings_updated,
            notification,
        })
    }

    /// Pure part of a contract run: reopen check, classification, lookup,
    /// handling and execution. Errors here never abort the batch.
    async fn evaluate(
        &self,
        contract: &mut Contract,
        state: &mut AccrualState,
        periods: &[Period],
        month: NaiveDate,
        lookup: &MemoizedEducationLookup<L>,
    ) -> Result<Evaluation, ServerError> {
        // The contract keeps its status, so a settled contract is settled
        // again through the decision table.
        let reopened = self.config.is_recalculated_product(&contract.product)
            && state.is_completed()
            && contract.total_amount > state.total_amount_to_accrue;
        if reopened {
            debug!(contract_id = %contract.id, "reopening recalculated contract");
            reopen(state, contract.total_amount, contract.currency);
        }

        let case = match classify(contract, state, periods, month, &self.config)? {
            // The invoices that raised the total may predate this month.
            Case::Deferred if reopened => Case::Continuation(Continuation::RecalculatedInvoices),
            case => case,
        };

        let education = match (&case, contract.client_external_id.as_deref()) {
            (Case::WithoutPeriods, Some(client)) => lookup.lookup(client).await?,
            _ => None,
        };

        let resolution = resolve(
            &case,
            &HandlerContext {
                contract,
                state,
                periods,
                month,
                config: &self.config,
                education: education.as_ref(),
            },
        )?;
        let execution = ResolutionExecutor::new(contract, state, periods, month, &self.config)
            .execute(resolution)?;
        Ok(Evaluation { case, execution })
    }
}

impl ContractRun {
    fn skipped(contract: &Contract, state: &AccrualState, case: &str, action: &str) -> Self {
        Self {
            outcome: ContractOutcome {
                contract_id: contract.id,
                case: case.to_string(),
                status: ProcessingStatus::Skipped,
                action: action.to_string(),
                amount_accrued: 0.0,
                contract_status_before: contract.status,
                contract_status: contract.status,
                accrual_status: Some(state.status),
                completed: false,
            },
            postings: Vec::new(),
            postings_created: 0,
            postings_updated: 0,
            notification: None,
        }
    }

    fn failed(
        contract_id: ContractId,
        contract_status: ContractStatus,
        error: &ServerError,
    ) -> Self {
        Self {
            outcome: ContractOutcome {
                contract_id,
                case: "error".to_string(),
                status: ProcessingStatus::Failed,
                action: "left unmodified".to_string(),
                amount_accrued: 0.0,
                contract_status_before: contract_status,
                contract_status,
                accrual_status: None,
                completed: false,
            },
            postings: Vec::new(),
            postings_created: 0,
            postings_updated: 0,
            notification: Some(Notification {
                kind: NotificationKind::ProcessingError,
                contract_id,
                message: format!("{:?}", error),
            }),
        }
    }
}

fn aggregate(month: NaiveDate, runs: Vec<ContractRun>) -> BatchResult {
    let mut result = BatchResult {
        month,
        processed: runs.len(),
        succeeded: 0,
        failed: 0,
        skipped: 0,
        postings_created: 0,
        postings_updated: 0,
        postings: Vec::new(),
        outcomes: Vec::with_capacity(runs.len()),
        notifications: Default::default(),
    };
    for run in runs {
        match run.outcome.status {
            ProcessingStatus::Success => result.succeeded += 1,
            ProcessingStatus::Skipped => result.skipped += 1,
            ProcessingStatus::Failed => result.failed += 1,
        }
        result.postings_created += run.postings_created;
        result.postings_updated += run.postings_updated;
        result.postings.extend(run.postings);
        result.outcomes.push(run.outcome);
        if let Some(notification) = run.notification {
            result
                .notifications
                .entry(notification.kind)
                .or_default()
                .push(notification);
        }
    }
    result.postings.sort_by_key(|p| p.key());
    result.outcomes.sort_by_key(|o| o.contract_id);
    for notifications in result.notifications.values_mut() {
        notifications.sort_by_key(|n| n.contract_id);
    }
    result
}

#[cfg(test)]
mod tests {
    use iso_currency::Currency;

    use crate::ext::standard_lookups::StaticEducationLookup;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn contract_locks_are_released_after_a_run() {
        let repository = Arc::new(InMemoryAccrualRepository::new());
        for id in [1, 2, 3] {
            let contract =
                Contract::new(id, "Data Science", 900.0, Currency::EUR, date(2025, 1, 1), 18);
            repository.save_contract(contract.clone()).await.unwrap();
            repository
                .save_period(Period::new(id, contract.id, date(2025, 1, 1), date(2025, 6, 30), 1))
                .await
                .unwrap();
        }
        let usecase = ProcessMonthUsecaseImpl::new(
            repository,
            Arc::new(StaticEducationLookup::new()),
            AccrualConfig::default(),
        );

        let result = usecase.process_month(date(2025, 2, 1)).await.unwrap();

        assert_eq!(result.succeeded, 3);
        assert!(usecase.contract_locks.lock().await.is_empty());
    }
}
