use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::entities::{
    AccrualConfig, AccrualState, Case, Continuation, Contract, ContractStatus, Period,
    PeriodStatus,
};

use super::utils::{month_end_date, month_start_date, months_between};

/// Routes a contract to the case that applies to it in `month`. Pure: the
/// outcome depends on the arguments only, never on the current date.
pub(crate) fn classify(
    contract: &Contract,
    state: &AccrualState,
    periods: &[Period],
    month: NaiveDate,
    config: &AccrualConfig,
) -> Result<Case, ServerError> {
    let month_start = month_start_date(month);
    let month_end = month_end_date(month)?;

    if contract.start_date > month_end {
        return Ok(Case::NotStartable);
    }

    if state.is_completed() {
        let status = match contract.status {
            ContractStatus::Active => {
                ContractStatus::derived_from_total(state.total_amount_to_accrue)
            }
            terminal => terminal,
        };
        return Ok(Case::Finalize { status });
    }

    if periods.is_empty() {
        return Ok(Case::WithoutPeriods);
    }

    if let Some(period) = overlapping_period(periods, month_start, month_end) {
        let status = effective_status(period, month)?;
        return Ok(Case::Overlapping {
            period: period.clone(),
            status,
        });
    }

    // Nothing overlaps the month.

    let dropped_in_month = latest(periods.iter().filter(|p| {
        p.status == PeriodStatus::Dropped
            && p.status_change_date
                .is_some_and(|d| d >= month_start && d <= month_end)
    }));
    if let Some(period) = dropped_in_month {
        return Ok(Case::Continuation(Continuation::DroppedInMonth {
            period: period.clone(),
        }));
    }

    if let Some(period) = last_period(periods) {
        if postponement_expired(period, periods, month, config) {
            return Ok(Case::Continuation(Continuation::PostponementExpired {
                period: period.clone(),
            }));
        }
    }

    if config.is_recalculated_product(&contract.product)
        && contract.has_invoice_between(month_start, month_end)
    {
        return Ok(Case::Continuation(Continuation::RecalculatedInvoices));
    }

    if contract.status.is_terminal() {
        let started = latest(periods.iter().filter(|p| p.start_date <= month_end));
        if let Some(period) = started {
            let status = effective_status(period, month)?;
            return Ok(Case::Continuation(Continuation::TerminalContract {
                period: period.clone(),
                status,
            }));
        }
    }

    Ok(Case::Deferred)
}

/// Whether the contract started at most `recency_window_days` before the end
/// of the target month.
pub(crate) fn is_recent(
    contract: &Contract,
    month: NaiveDate,
    config: &AccrualConfig,
) -> Result<bool, ServerError> {
    let month_end = month_end_date(month)?;
    Ok((month_end - contract.start_date).num_days() <= config.recency_window_days)
}

/// Whether `period` is the contract's last period and has been POSTPONED for
/// longer than the configured limit as of the target month.
pub(crate) fn postponement_expired(
    period: &Period,
    periods: &[Period],
    month: NaiveDate,
    config: &AccrualConfig,
) -> bool {
    if period.status != PeriodStatus::Postponed {
        return false;
    }
    let is_last = last_period(periods).is_some_and(|last| last.id == period.id);
    if !is_last {
        return false;
    }
    period
        .status_change_date
        .is_some_and(|changed| months_between(changed, month) > config.postponement_limit_months)
}

/// Status of the period as seen from `month`. A status change recorded after
/// the month doesn't apply to it yet, unless the period naturally finished in
/// that month and was only marked ENDED/DROPPED afterwards.
pub(crate) fn effective_status(
    period: &Period,
    month: NaiveDate,
) -> Result<PeriodStatus, ServerError> {
    if period.status == PeriodStatus::Active {
        return Ok(PeriodStatus::Active);
    }
    let Some(changed) = period.status_change_date else {
        return Ok(period.status);
    };
    let month_end = month_end_date(month)?;
    if changed <= month_end {
        return Ok(period.status);
    }
    let natural_completion = matches!(period.status, PeriodStatus::Ended | PeriodStatus::Dropped)
        && changed > period.end_date
        && period.end_date <= month_end;
    if natural_completion {
        Ok(period.status)
    } else {
        Ok(PeriodStatus::Active)
    }
}

/// Period overlapping [start, end]. When several do, the one that started
/// last wins.
pub(crate) fn overlapping_period(
    periods: &[Period],
    start: NaiveDate,
    end: NaiveDate,
) -> Option<&Period> {
    latest(periods.iter().filter(|p| p.overlaps(start, end)))
}

/// Period with the latest start date (ties: highest id).
pub(crate) fn last_period(periods: &[Period]) -> Option<&Period> {
    latest(periods.iter())
}

fn latest<'a>(periods: impl Iterator<Item = &'a Period>) -> Option<&'a Period> {
    periods.max_by_key(|p| (p.start_date, p.id))
}

#[cfg(test)]
mod tests {
    use iso_currency::Currency;

    use crate::entities::{AccrualStateId, AccrualStatus, ContractId};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(start: NaiveDate) -> Contract {
        Contract::new(1, "Web Development", 3_000.0, Currency::EUR, start, 60)
    }

    fn state_for(contract: &Contract) -> AccrualState {
        AccrualState::for_contract(AccrualStateId(1), contract)
    }

    fn period(id: u64, start: NaiveDate, end: NaiveDate) -> Period {
        Period::new(id, ContractId(1), start, end, 3)
    }

    #[test]
    fn future_contract_is_not_startable() {
        let c = contract(date(2025, 4, 1));
        let case = classify(
            &c,
            &state_for(&c),
            &[],
            date(2025, 3, 1),
            &AccrualConfig::default(),
        )
        .unwrap();
        assert_eq!(case, Case::NotStartable);
    }

    #[test]
    fn completed_state_finalizes_active_contract() {
        let c = contract(date(2025, 1, 1));
        let mut s = state_for(&c);
        s.status = AccrualStatus::Completed;
        let config = AccrualConfig::default();
        assert_eq!(
            classify(&c, &s, &[], date(2025, 3, 1), &config).unwrap(),
            Case::Finalize {
                status: ContractStatus::Closed
            }
        );

        let canceled = c.clone().with_status(ContractStatus::Canceled);
        assert_eq!(
            classify(&canceled, &s, &[], date(2025, 3, 1), &config).unwrap(),
            Case::Finalize {
                status: ContractStatus::Canceled
            }
        );
    }

    #[test]
    fn latest_overlapping_period_is_selected() {
        let c = contract(date(2025, 1, 1));
        let periods = vec![
            period(1, date(2025, 1, 1), date(2025, 3, 15)),
            period(2, date(2025, 3, 10), date(2025, 6, 30)),
        ];
        let case = classify(
            &c,
            &state_for(&c),
            &periods,
            date(2025, 3, 1),
            &AccrualConfig::default(),
        )
        .unwrap();
        match case {
            Case::Overlapping { period, status } => {
                assert_eq!(period.id.0, 2);
                assert_eq!(status, PeriodStatus::Active);
            }
            other => panic!("unexpected case {:?}", other),
        }
    }

    #[test]
    fn later_status_change_is_ignored_for_earlier_months() {
        let p = period(1, date(2025, 1, 1), date(2025, 6, 30))
            .with_status(PeriodStatus::Postponed, date(2025, 4, 10));
        assert_eq!(
            effective_status(&p, date(2025, 3, 1)).unwrap(),
            PeriodStatus::Active
        );
        assert_eq!(
            effective_status(&p, date(2025, 4, 1)).unwrap(),
            PeriodStatus::Postponed
        );
    }

    #[test]
    fn period_marked_ended_after_its_end_is_ended_in_final_month() {
        let p = period(1, date(2025, 1, 1), date(2025, 3, 20))
            .with_status(PeriodStatus::Ended, date(2025, 4, 5));
        assert_eq!(
            effective_status(&p, date(2025, 3, 1)).unwrap(),
            PeriodStatus::Ended
        );
        assert_eq!(
            effective_status(&p, date(2025, 2, 1)).unwrap(),
            PeriodStatus::Active
        );
    }

    #[test]
    fn recency_uses_target_month() {
        let config = AccrualConfig::default();
        let c = contract(date(2025, 3, 26));
        assert!(is_recent(&c, date(2025, 3, 1), &config).unwrap());
        let c = contract(date(2025, 3, 10));
        assert!(!is_recent(&c, date(2025, 3, 1), &config).unwrap());
    }

    #[test]
    fn expired_postponement_of_last_period_continues() {
        let c = contract(date(2025, 1, 1));
        let periods = vec![
            period(1, date(2025, 1, 1), date(2025, 2, 28))
                .with_status(PeriodStatus::Postponed, date(2025, 2, 14)),
        ];
        let config = AccrualConfig::default();

        // Three months later: still within the limit.
        assert_eq!(
            classify(&c, &state_for(&c), &periods, date(2025, 5, 1), &config).unwrap(),
            Case::Deferred
        );
        // Four months later.
        let case = classify(&c, &state_for(&c), &periods, date(2025, 6, 1), &config).unwrap();
        assert!(matches!(
            case,
            Case::Continuation(Continuation::PostponementExpired { .. })
        ));
    }

    #[test]
    fn postponement_of_earlier_period_never_expires() {
        let periods = vec![
            period(1, date(2025, 1, 1), date(2025, 2, 28))
                .with_status(PeriodStatus::Postponed, date(2025, 2, 14)),
            period(2, date(2025, 9, 1), date(2025, 12, 31)),
        ];
        assert!(!postponement_expired(
            &periods[0],
            &periods,
            date(2025, 8, 1),
            &AccrualConfig::default()
        ));
    }

    #[test]
    fn drop_in_month_without_overlap_continues() {
        let c = contract(date(2025, 1, 1));
        let periods = vec![period(1, date(2025, 1, 1), date(2025, 2, 28))
            .with_status(PeriodStatus::Dropped, date(2025, 3, 3))];
        let case = classify(
            &c,
            &state_for(&c),
            &periods,
            date(2025, 3, 1),
            &AccrualConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            case,
            Case::Continuation(Continuation::DroppedInMonth { .. })
        ));
    }

    #[test]
    fn recalculated_product_with_invoice_continues() {
        let c = contract(date(2025, 1, 1)).with_invoice("F-12", date(2025, 4, 2), 500.0);
        let periods = vec![period(1, date(2025, 1, 1), date(2025, 2, 28))];
        let config = AccrualConfig::default()
            .with_recalculated_products("^Web")
            .unwrap();
        assert_eq!(
            classify(&c, &state_for(&c), &periods, date(2025, 4, 1), &config).unwrap(),
            Case::Continuation(Continuation::RecalculatedInvoices)
        );
        assert_eq!(
            classify(
                &c,
                &state_for(&c),
                &periods,
                date(2025, 5, 1),
                &config
            )
            .unwrap(),
            Case::Deferred
        );
    }

    #[test]
    fn terminal_contract_uses_latest_period() {
        let c = contract(date(2025, 1, 1)).with_status(ContractStatus::Closed);
        let periods = vec![period(1, date(2025, 1, 1), date(2025, 2, 28))
            .with_status(PeriodStatus::Ended, date(2025, 2, 28))];
        let case = classify(
            &c,
            &state_for(&c),
            &periods,
            date(2025, 4, 1),
            &AccrualConfig::default(),
        )
        .unwrap();
        match case {
            Case::Continuation(Continuation::TerminalContract { period, status }) => {
                assert_eq!(period.id.0, 1);
                assert_eq!(status, PeriodStatus::Ended);
            }
            other => panic!("unexpected case {:?}", other),
        }
    }
}
