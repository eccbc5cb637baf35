use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::entities::{
    AccrualConfig, AccrualState, AccrualStatus, CatchAllAttribution, Contract, ContractStatus,
    Instruction, NotificationKind, Period, PeriodStatus, Posting, ProcessingStatus, Resolution,
};

use super::{
    accrual_math::{
        accrue_full, accrue_portion, is_exhausted, monthly_portion, rebase_sessions,
        sessions_in_range,
    },
    classifier::effective_status,
    utils::{month_end_date, month_start_date},
};

/// Result of applying a resolution to a contract.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Execution {
    pub(crate) status: ProcessingStatus,
    pub(crate) action: String,
    pub(crate) postings: Vec<Posting>,
    pub(crate) notification: Option<(NotificationKind, String)>,
}

/// Applies a resolution to the in-memory contract and accrual state, producing
/// the postings of the target month. Nothing is persisted here.
pub(crate) struct ResolutionExecutor<'a> {
    contract: &'a mut Contract,
    state: &'a mut AccrualState,
    periods: &'a [Period],
    month: NaiveDate,
    config: &'a AccrualConfig,
}

impl<'a> ResolutionExecutor<'a> {
    pub(crate) fn new(
        contract: &'a mut Contract,
        state: &'a mut AccrualState,
        periods: &'a [Period],
        month: NaiveDate,
        config: &'a AccrualConfig,
    ) -> Self {
        Self {
            contract,
            state,
            periods,
            month: month_start_date(month),
            config,
        }
    }

    pub(crate) fn execute(mut self, resolution: Resolution) -> Result<Execution, ServerError> {
        let Resolution {
            instruction,
            contract_status,
            accrual_status,
        } = resolution;
        let accrues_portion = matches!(instruction, Instruction::AccruePortion { .. });

        let mut execution = match instruction {
            Instruction::Skip { reason } => Execution {
                status: ProcessingStatus::Skipped,
                action: format!("skipped: {}", reason),
                postings: Vec::new(),
                notification: None,
            },
            Instruction::Notify { kind, message } => Execution {
                status: ProcessingStatus::Skipped,
                action: format!("notified {}", kind),
                postings: Vec::new(),
                notification: Some((kind, message)),
            },
            Instruction::AccrueFull { period } => {
                let period = match period {
                    Some(p) => Some(p),
                    None => self.catch_all_period()?.cloned(),
                };
                let (amount, sessions) = accrue_full(self.state, self.contract.currency)?;
                Execution {
                    status: ProcessingStatus::Success,
                    action: format!("accrued remaining {:.2}", amount),
                    postings: vec![self.posting(period.as_ref(), amount, 1.0, sessions)],
                    notification: None,
                }
            }
            Instruction::AccruePortion {
                period,
                until,
                final_sweep,
            } => {
                let pausing = accrual_status == Some(AccrualStatus::Paused);
                self.prepare_sessions(&period, until, pausing)?;

                let sessions = sessions_in_range(
                    &period,
                    self.month,
                    until,
                    &self.config.holidays,
                );
                let remaining_sessions = self.state.remaining_sessions_to_accrue;
                let portion = if final_sweep || (!pausing && remaining_sessions == 0) {
                    1.0
                } else {
                    monthly_portion(remaining_sessions, sessions)
                };
                let (amount, accrued_sessions) =
                    accrue_portion(self.state, portion, sessions, self.contract.currency)?;
                Execution {
                    status: ProcessingStatus::Success,
                    action: format!("accrued portion {:.2}% ({:.2})", portion * 100.0, amount),
                    postings: vec![self.posting(Some(&period), amount, portion, accrued_sessions)],
                    notification: None,
                }
            }
        };

        if let Some(status) = accrual_status {
            if status != AccrualStatus::Completed || self.state.is_completed() {
                self.state.status = status;
            }
        }

        // Portions may use up the accrual on their own.
        if accrues_portion
            && !self.state.is_completed()
            && is_exhausted(self.state, self.contract.currency)
        {
            self.state.remaining_amount_to_accrue = 0.0;
            self.state.status = AccrualStatus::Completed;
            execution.action.push_str(", completed");
            if contract_status.is_none() && self.contract.status == ContractStatus::Active {
                self.contract.status =
                    ContractStatus::derived_from_total(self.state.total_amount_to_accrue);
            }
        }

        if let Some(status) = contract_status {
            self.contract.status = status;
        }
        Ok(execution)
    }

    /// Resumes a paused accrual, and re-derives the session count when it ran
    /// dry while an amount is still open.
    fn prepare_sessions(
        &mut self,
        period: &Period,
        until: NaiveDate,
        pausing: bool,
    ) -> Result<(), ServerError> {
        let resuming = !pausing && self.state.status == AccrualStatus::Paused;
        let drifted = self.state.remaining_sessions_to_accrue == 0
            && (self.state.remaining_amount_to_accrue != 0.0
                || self.state.total_sessions_accrued == 0);
        if resuming || drifted {
            let sessions_ahead = self.sessions_ahead(period, until)?;
            rebase_sessions(self.state, sessions_ahead);
        }
        if resuming {
            self.state.status = AccrualStatus::Active;
        }
        Ok(())
    }

    /// Sessions still to be delivered from the start of the target month: the
    /// whole schedule ahead of every period active in that month, plus the
    /// sessions of `current` before `until` when it is being paused.
    /// Postponed and dropped periods won't deliver the rest of their sessions.
    fn sessions_ahead(&self, current: &Period, until: NaiveDate) -> Result<u32, ServerError> {
        let mut active = Vec::new();
        for period in self.periods {
            if effective_status(period, self.month)? == PeriodStatus::Active {
                active.push(period);
            }
        }
        let horizon = match active.iter().map(|p| p.end_date).max() {
            Some(end) => end,
            None => month_end_date(self.month)?,
        };
        let horizon = horizon.succ_opt().unwrap_or(horizon);
        let mut sessions: u32 = active
            .iter()
            .map(|p| sessions_in_range(p, self.month, horizon, &self.config.holidays))
            .sum();
        if !active.iter().any(|p| p.id == current.id) {
            sessions += sessions_in_range(current, self.month, until, &self.config.holidays);
        }
        Ok(sessions)
    }

    /// Period a full accrual outside any overlapping period is attributed to.
    fn catch_all_period(&self) -> Result<Option<&'a Period>, ServerError> {
        let month_end = month_end_date(self.month)?;
        Ok(match self.config.catch_all_attribution {
            CatchAllAttribution::NullPeriod => None,
            CatchAllAttribution::MostRecentEnded => self
                .periods
                .iter()
                .filter(|p| p.status == PeriodStatus::Ended && p.end_date <= month_end)
                .max_by_key(|p| (p.end_date, p.id)),
            CatchAllAttribution::ClosestToMonth => self
                .periods
                .iter()
                .min_by_key(|p| {
                    let distance = if p.end_date < self.month {
                        (self.month - p.end_date).num_days()
                    } else if p.start_date > month_end {
                        (p.start_date - month_end).num_days()
                    } else {
                        0
                    };
                    (distance, std::cmp::Reverse((p.start_date, p.id)))
                }),
        })
    }

    fn posting(
        &self,
        period: Option<&Period>,
        amount: f64,
        portion: f64,
        sessions: u32,
    ) -> Posting {
        Posting {
            accrual_state_id: self.state.id,
            contract_id: self.contract.id,
            period_id: period.map(|p| p.id),
            accrual_date: self.month,
            amount,
            portion,
            sessions,
            total_contract_amount: self.contract.total_amount,
            currency: self.contract.currency,
            period_status: period.map(|p| p.status),
            status_change_date: period.and_then(|p| p.status_change_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use iso_currency::Currency;

    use crate::entities::{AccrualStateId, ContractId};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(total: f64, sessions: u32) -> (Contract, AccrualState) {
        let contract = Contract::new(
            9,
            "Cybersecurity",
            total,
            Currency::EUR,
            date(2025, 6, 1),
            sessions,
        );
        let state = AccrualState::for_contract(AccrualStateId(3), &contract);
        (contract, state)
    }

    #[test]
    fn postponed_on_the_tenth_accrues_days_one_to_nine() {
        // Every weekday in June 2025 (30 days): 21 sessions, 6 before the 10th.
        let (mut contract, mut state) = setup(2_100.0, 21);
        let period = Period::new(1, contract.id, date(2025, 6, 1), date(2025, 6, 30), 5)
            .with_status(PeriodStatus::Postponed, date(2025, 6, 10));
        let periods = vec![period.clone()];
        let config = AccrualConfig::default();

        let resolution = Resolution::accrue_portion(period, date(2025, 6, 10), false)
            .with_accrual_status(AccrualStatus::Paused);
        let execution = ResolutionExecutor::new(
            &mut contract,
            &mut state,
            &periods,
            date(2025, 6, 1),
            &config,
        )
        .execute(resolution)
        .unwrap();

        assert_eq!(execution.postings.len(), 1);
        assert_eq!(execution.postings[0].sessions, 6);
        assert_eq!(execution.postings[0].amount, 600.0);
        assert_eq!(state.status, AccrualStatus::Paused);
        assert_eq!(state.remaining_amount_to_accrue, 1_500.0);
        assert_eq!(contract.status, ContractStatus::Active);
    }

    #[test]
    fn resuming_rebases_sessions_on_schedule_ahead() {
        let (mut contract, mut state) = setup(1_000.0, 40);
        state.status = AccrualStatus::Paused;
        state.total_amount_accrued = 500.0;
        state.remaining_amount_to_accrue = 500.0;
        state.total_sessions_accrued = 20;
        state.remaining_sessions_to_accrue = 20;
        // Tue/Thu from 2025-09-01 to 2025-10-31: 9 + 9 sessions.
        let period = Period::new(2, contract.id, date(2025, 9, 1), date(2025, 10, 31), 2);
        let periods = vec![period.clone()];
        let config = AccrualConfig::default();

        let execution = ResolutionExecutor::new(
            &mut contract,
            &mut state,
            &periods,
            date(2025, 9, 1),
            &config,
        )
        .execute(Resolution::accrue_portion(period, date(2025, 10, 1), false))
        .unwrap();

        assert_eq!(state.status, AccrualStatus::Active);
        assert_eq!(state.total_sessions_to_accrue, 38);
        assert_eq!(execution.postings[0].amount, 250.0);
        assert_eq!(state.remaining_sessions_to_accrue, 9);
    }

    #[test]
    fn resuming_ignores_sessions_of_postponed_periods() {
        let (mut contract, mut state) = setup(1_200.0, 24);
        state.status = AccrualStatus::Paused;
        state.total_amount_accrued = 250.0;
        state.remaining_amount_to_accrue = 950.0;
        state.total_sessions_accrued = 5;
        state.remaining_sessions_to_accrue = 19;
        // Mondays only. The first period was postponed and won't resume.
        let postponed = Period::new(1, contract.id, date(2025, 1, 6), date(2025, 6, 30), 1)
            .with_status(PeriodStatus::Postponed, date(2025, 2, 10));
        let resumed = Period::new(2, contract.id, date(2025, 4, 1), date(2025, 6, 30), 1);
        let periods = vec![postponed, resumed.clone()];
        let config = AccrualConfig::default();

        let execution = ResolutionExecutor::new(
            &mut contract,
            &mut state,
            &periods,
            date(2025, 4, 1),
            &config,
        )
        .execute(Resolution::accrue_portion(resumed, date(2025, 5, 1), false))
        .unwrap();

        // 13 Mondays from April to June, 4 of them in April.
        assert_eq!(state.total_sessions_to_accrue, 18);
        assert_eq!(execution.postings[0].sessions, 4);
        assert_eq!(execution.postings[0].amount, 292.31);
        assert_eq!(state.remaining_sessions_to_accrue, 9);
    }

    #[test]
    fn final_sweep_completes_and_closes() {
        let (mut contract, mut state) = setup(900.0, 30);
        state.total_amount_accrued = 600.0;
        state.remaining_amount_to_accrue = 300.0;
        state.total_sessions_accrued = 20;
        state.remaining_sessions_to_accrue = 10;
        let period = Period::new(1, contract.id, date(2025, 6, 1), date(2025, 8, 12), 1);
        let periods = vec![period.clone()];
        let config = AccrualConfig::default();

        let execution = ResolutionExecutor::new(
            &mut contract,
            &mut state,
            &periods,
            date(2025, 8, 1),
            &config,
        )
        .execute(Resolution::accrue_portion(period, date(2025, 9, 1), true))
        .unwrap();

        assert_eq!(execution.postings[0].amount, 300.0);
        assert_eq!(execution.postings[0].portion, 1.0);
        assert_eq!(state.status, AccrualStatus::Completed);
        assert_eq!(state.remaining_amount_to_accrue, 0.0);
        assert_eq!(contract.status, ContractStatus::Closed);
    }

    #[test]
    fn zero_amount_contract_still_posts() {
        let (mut contract, mut state) = setup(0.0, 4);
        let config = AccrualConfig::default();
        let execution =
            ResolutionExecutor::new(&mut contract, &mut state, &[], date(2025, 8, 1), &config)
                .execute(Resolution::accrue_full(None, ContractStatus::Canceled))
                .unwrap();
        assert_eq!(execution.postings.len(), 1);
        assert_eq!(execution.postings[0].amount, 0.0);
        assert_eq!(execution.postings[0].period_id, None);
        assert_eq!(contract.status, ContractStatus::Canceled);
    }

    #[test]
    fn catch_all_attribution_policies() {
        let (contract, state) = setup(500.0, 10);
        let periods = vec![
            Period::new(1, ContractId(9), date(2025, 1, 1), date(2025, 2, 28), 2)
                .with_status(PeriodStatus::Ended, date(2025, 2, 28)),
            Period::new(2, ContractId(9), date(2025, 3, 1), date(2025, 4, 30), 2)
                .with_status(PeriodStatus::Dropped, date(2025, 4, 15)),
        ];
        let month = date(2025, 6, 1);

        let attributed = |attribution: CatchAllAttribution| {
            let config = AccrualConfig::default().with_catch_all_attribution(attribution);
            let (mut contract, mut state) = (contract.clone(), state.clone());
            ResolutionExecutor::new(&mut contract, &mut state, &periods, month, &config)
                .execute(Resolution::accrue_full(None, ContractStatus::Canceled))
                .unwrap()
                .postings[0]
                .period_id
        };

        assert_eq!(attributed(CatchAllAttribution::NullPeriod), None);
        assert_eq!(
            attributed(CatchAllAttribution::MostRecentEnded).map(|id| id.0),
            Some(1)
        );
        assert_eq!(
            attributed(CatchAllAttribution::ClosestToMonth).map(|id| id.0),
            Some(2)
        );
    }

    #[test]
    fn notification_leaves_state_untouched() {
        let (mut contract, mut state) = setup(500.0, 10);
        let before = state.clone();
        let config = AccrualConfig::default();
        let execution =
            ResolutionExecutor::new(&mut contract, &mut state, &[], date(2025, 8, 1), &config)
                .execute(Resolution::notify(
                    NotificationKind::MissingCrmData,
                    "unknown client",
                ))
                .unwrap();
        assert_eq!(execution.status, ProcessingStatus::Skipped);
        assert!(execution.postings.is_empty());
        assert_eq!(state, before);
    }
}
