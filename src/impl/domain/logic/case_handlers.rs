use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::entities::{
    AccrualConfig, AccrualState, AccrualStatus, Case, Continuation, Contract, ContractStatus,
    EducationRecord, Instruction, NotificationKind, Period, PeriodStatus, Resolution,
};

use super::{
    accrual_math::sessions_in_range,
    classifier::{is_recent, last_period, postponement_expired},
    utils::{month_end_date, month_start_date},
};

/// Inputs shared by all handlers.
pub(crate) struct HandlerContext<'a> {
    pub(crate) contract: &'a Contract,
    pub(crate) state: &'a AccrualState,
    pub(crate) periods: &'a [Period],
    pub(crate) month: NaiveDate,
    pub(crate) config: &'a AccrualConfig,
    /// Education record of the client, looked up for contracts without
    /// periods only. `None` means the client is unknown to the education
    /// system.
    pub(crate) education: Option<&'a EducationRecord>,
}

/// Dispatches a case to its handler.
pub(crate) fn resolve(case: &Case, ctx: &HandlerContext<'_>) -> Result<Resolution, ServerError> {
    match case {
        Case::NotStartable => Ok(Resolution::skip("contract has not started yet")),
        Case::Finalize { status } => Ok(finalize(ctx, *status)),
        Case::WithoutPeriods => without_periods(ctx),
        Case::Overlapping { period, status } => overlapping(ctx, period, *status),
        Case::Continuation(continuation) => continuation_of(ctx, continuation),
        Case::Deferred => Ok(Resolution::skip("nothing to accrue this month")),
    }
}

fn finalize(ctx: &HandlerContext<'_>, status: ContractStatus) -> Resolution {
    let resolution = Resolution::skip("accrual already completed");
    if status != ctx.contract.status {
        resolution.with_contract_status(status)
    } else {
        resolution
    }
}

fn not_congruent(ctx: &HandlerContext<'_>, detail: &str) -> Resolution {
    Resolution::notify(
        NotificationKind::NotCongruentStatus,
        format!("contract is {} but {}", ctx.contract.status, detail),
    )
}

// Without periods.
// ---

fn without_periods(ctx: &HandlerContext<'_>) -> Result<Resolution, ServerError> {
    let month_end = month_end_date(ctx.month)?;
    let contract_status = ctx.contract.status;

    let Some(record) = ctx.education else {
        let recent = is_recent(ctx.contract, ctx.month, ctx.config)?;
        return Ok(match contract_status {
            ContractStatus::Active if recent => {
                Resolution::notify(
                    NotificationKind::MissingCrmData,
                    "recent contract without periods is unknown to the education system",
                )
            }
            // Resignation.
            ContractStatus::Active | ContractStatus::Canceled => {
                Resolution::accrue_full(None, ContractStatus::Canceled)
            }
            ContractStatus::Closed => {
                not_congruent(ctx, "the client is unknown to the education system")
            }
        });
    };

    let status = &record.status;
    if status.is_terminal() && record.status_change_date.is_some_and(|d| d > month_end) {
        return Ok(Resolution::skip(format!(
            "education status {} only applies after this month",
            status
        )));
    }

    let outcome = if status.is_completion() {
        ContractStatus::Closed
    } else {
        ContractStatus::Canceled
    };
    Ok(match contract_status {
        ContractStatus::Active | ContractStatus::Canceled if status.is_terminal() => {
            Resolution::accrue_full(None, outcome)
        }
        ContractStatus::Closed if status.is_ended() => {
            Resolution::accrue_full(None, ContractStatus::Closed)
        }
        _ => not_congruent(ctx, &format!("the education status is {}", status)),
    })
}

// With an overlapping period.
// ---

fn overlapping(
    ctx: &HandlerContext<'_>,
    period: &Period,
    status: PeriodStatus,
) -> Result<Resolution, ServerError> {
    use ContractStatus as C;
    use PeriodStatus as P;

    Ok(match (ctx.contract.status, status) {
        (C::Active, P::Active) => active_period(ctx, period)?,
        (C::Active, P::Postponed) => postponed_period(ctx, period)?,
        (C::Active, P::Dropped) => Resolution::accrue_full(Some(period.clone()), C::Canceled),
        (C::Active, P::Ended) => Resolution::accrue_full(Some(period.clone()), C::Closed),
        (C::Canceled, P::Dropped | P::Postponed) => {
            Resolution::accrue_full(Some(period.clone()), C::Canceled)
        }
        (C::Closed, P::Ended) => Resolution::accrue_full(Some(period.clone()), C::Closed),
        (C::Canceled, P::Active | P::Ended) | (C::Closed, P::Active | P::Postponed | P::Dropped) => {
            not_congruent(ctx, &format!("period {} is {}", period.id, status))
        }
    })
}

fn active_period(ctx: &HandlerContext<'_>, period: &Period) -> Result<Resolution, ServerError> {
    let month_end = month_end_date(ctx.month)?;
    let until = month_end.succ_opt().unwrap_or(month_end);
    let is_last = last_period(ctx.periods).is_some_and(|last| last.id == period.id);
    let final_sweep = is_last && period.end_date <= month_end;
    Ok(Resolution::accrue_portion(period.clone(), until, final_sweep))
}

fn postponed_period(ctx: &HandlerContext<'_>, period: &Period) -> Result<Resolution, ServerError> {
    if postponement_expired(period, ctx.periods, ctx.month, ctx.config) {
        return Ok(Resolution::accrue_full(
            Some(period.clone()),
            ContractStatus::Canceled,
        ));
    }

    let month_start = month_start_date(ctx.month);
    let month_end = month_end_date(ctx.month)?;
    let month_limit = month_end.succ_opt().unwrap_or(month_end);
    // Without a change date there is no way to tell when the pause began.
    let until = period
        .status_change_date
        .map_or(month_start, |changed| std::cmp::min(month_limit, changed));

    let sessions = sessions_in_range(period, month_start, until, &ctx.config.holidays);
    if ctx.state.status == AccrualStatus::Paused && sessions == 0 {
        return Ok(Resolution::skip("accrual is paused"));
    }
    Ok(Resolution::accrue_portion(period.clone(), until, false)
        .with_accrual_status(AccrualStatus::Paused))
}

// Continuations.
// ---

fn continuation_of(
    ctx: &HandlerContext<'_>,
    continuation: &Continuation,
) -> Result<Resolution, ServerError> {
    match continuation {
        Continuation::DroppedInMonth { .. } => Ok(match ctx.contract.status {
            ContractStatus::Closed => not_congruent(ctx, "a period was dropped this month"),
            _ => Resolution::accrue_full(None, ContractStatus::Canceled),
        }),
        Continuation::PostponementExpired { .. } => Ok(match ctx.contract.status {
            ContractStatus::Closed => not_congruent(ctx, "its last period is postponed"),
            _ => Resolution::accrue_full(None, ContractStatus::Canceled),
        }),
        Continuation::RecalculatedInvoices => {
            let status = match ctx.contract.status {
                ContractStatus::Active => {
                    ContractStatus::derived_from_total(ctx.state.total_amount_to_accrue)
                }
                terminal => terminal,
            };
            Ok(Resolution::accrue_full(None, status))
        }
        Continuation::TerminalContract { period, status } => {
            let resolution = overlapping(ctx, period, *status)?;
            // Postings are only linked to periods overlapping the month.
            Ok(match resolution.instruction {
                Instruction::AccrueFull { .. } => Resolution {
                    instruction: Instruction::AccrueFull { period: None },
                    ..resolution
                },
                _ => resolution,
            })
        }
    }
}
