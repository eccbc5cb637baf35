use std::sync::Arc;

use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::{
    data::datasources::config_ron_datasource::{
        AccrualConfigRonDatasource as _, AccrualConfigRonDatasourceImpl,
    },
    domain::usecases::process_month_usecase::{ProcessMonthUsecase as _, ProcessMonthUsecaseImpl},
    entities::{AccrualConfig, BatchResult},
    presentation::accrual_ledger_printer::AccrualLedgerPrinter,
    repositories::{AccrualRepository, EducationLookup, InMemoryAccrualRepository},
};

pub type Ledger = String;

pub struct ContractAccrualUtil<L, R = InMemoryAccrualRepository>
where
    L: EducationLookup + ?Sized,
    R: AccrualRepository + ?Sized,
{
    process_month_usecase: ProcessMonthUsecaseImpl<L, R>,
    printer: AccrualLedgerPrinter,
}

impl<L, R> ContractAccrualUtil<L, R>
where
    L: EducationLookup + ?Sized,
    R: AccrualRepository + ?Sized,
{
    pub fn new(repository: Arc<R>, education_lookup: Arc<L>, config: AccrualConfig) -> Self {
        Self {
            process_month_usecase: ProcessMonthUsecaseImpl::new(
                repository,
                education_lookup,
                config,
            ),
            printer: AccrualLedgerPrinter::new(),
        }
    }

    /// Same as `new`, reading the configuration from a RON file.
    pub async fn with_config_file<P>(
        repository: Arc<R>,
        education_lookup: Arc<L>,
        config_ron: P,
    ) -> Result<Self, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
    {
        let config = Self::config_from_file(config_ron).await?;
        Ok(Self::new(repository, education_lookup, config))
    }

    pub fn config_from_string(config_ron: &str) -> Result<AccrualConfig, ServerError> {
        AccrualConfigRonDatasourceImpl::new().from_string(config_ron)
    }

    pub async fn config_from_file<P>(config_ron: P) -> Result<AccrualConfig, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
    {
        AccrualConfigRonDatasourceImpl::new()
            .from_file(config_ron)
            .await
    }

    pub fn config(&self) -> &AccrualConfig {
        self.process_month_usecase.config()
    }

    pub async fn process_month(&self, target_month: NaiveDate) -> Result<BatchResult, ServerError> {
        self.process_month_usecase.process_month(target_month).await
    }

    /// Processes every month from `from` to `to` in order. Stops at the first
    /// month that fails.
    pub async fn process_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BatchResult>, ServerError> {
        self.process_month_usecase.process_range(from, to).await
    }

    pub async fn process_month_with_ledger(
        &self,
        target_month: NaiveDate,
    ) -> Result<(BatchResult, Ledger), ServerError> {
        let result = self.process_month(target_month).await?;
        let ledger = self.print_ledger(&result);
        Ok((result, ledger))
    }

    pub fn print_ledger(&self, result: &BatchResult) -> Ledger {
        self.printer.print_ledger(result)
    }
}
