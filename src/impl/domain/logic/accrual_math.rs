use chrono::{Datelike as _, NaiveDate};
use fractic_server_error::ServerError;
use iso_currency::Currency;

use crate::{
    entities::{AccrualState, AccrualStatus, HolidayCalendar, Period},
    errors::{InvalidAccrualPortion, NonFiniteAccrualAmount},
};

/// Standard number decimal places for the given currency
/// (ex. JPY = 0, USD = 2).
pub(crate) fn decimal_places(currency: Currency) -> usize {
    currency.exponent().unwrap_or(0) as usize
}

/// Number of minor units in one major unit (ex. 100 for EUR, 1 for JPY).
pub(crate) fn minor_unit_factor(currency: Currency) -> f64 {
    10_f64.powi(decimal_places(currency) as i32)
}

/// Rounds to the currency's minor unit (ex. cents for EUR, whole yen for JPY).
pub(crate) fn round_to_currency(amount: f64, currency: Currency) -> f64 {
    let factor = minor_unit_factor(currency);
    (amount * factor).round() / factor
}

/// Counts the sessions of the period's weekly cadence within [start, end),
/// skipping holidays. Days outside the period never count.
pub(crate) fn sessions_in_range(
    period: &Period,
    start: NaiveDate,
    end: NaiveDate,
    holidays: &HolidayCalendar,
) -> u32 {
    let from = std::cmp::max(start, period.start_date);
    let until = std::cmp::min(
        end,
        period.end_date.succ_opt().unwrap_or(period.end_date),
    );
    if from >= until {
        return 0;
    }
    let session_days = period.schedule.session_days();
    from.iter_days()
        .take_while(|day| *day < until)
        .filter(|day| session_days.contains(&day.weekday()) && !holidays.contains(day))
        .count() as u32
}

/// Share of the remaining amount earned by the sessions of one month, capped
/// at 1 so drifting session bookkeeping can never over-accrue.
pub(crate) fn monthly_portion(remaining_sessions: u32, sessions_in_overlap: u32) -> f64 {
    if remaining_sessions == 0 {
        return 0.0;
    }
    f64::min(1.0, sessions_in_overlap as f64 / remaining_sessions as f64)
}

/// Accrues `portion` of the remaining amount, together with up to `sessions`
/// of the remaining sessions. Returns the accrued amount and sessions.
///
/// Amounts are rounded to the currency's minor unit. A portion of 1 posts the
/// exact remaining amount so that the postings add up to the contract total.
pub(crate) fn accrue_portion(
    state: &mut AccrualState,
    portion: f64,
    sessions: u32,
    currency: Currency,
) -> Result<(f64, u32), ServerError> {
    if !portion.is_finite() || !(0.0..=1.0).contains(&portion) {
        return Err(InvalidAccrualPortion::new(portion, &state.contract_id));
    }
    let remaining = state.remaining_amount_to_accrue;
    let amount = if portion >= 1.0 {
        remaining
    } else {
        let rounded = round_to_currency(remaining * portion, currency);
        if rounded.abs() > remaining.abs() {
            remaining
        } else {
            rounded
        }
    };
    if !amount.is_finite() {
        return Err(NonFiniteAccrualAmount::new(&state.contract_id));
    }
    let sessions = std::cmp::min(sessions, state.remaining_sessions_to_accrue);

    state.remaining_amount_to_accrue = round_to_currency(remaining - amount, currency);
    state.total_amount_accrued = round_to_currency(state.total_amount_accrued + amount, currency);
    state.remaining_sessions_to_accrue -= sessions;
    state.total_sessions_accrued += sessions;
    Ok((amount, sessions))
}

/// Accrues everything that remains (possibly negative) and completes the
/// accrual. Returns the accrued amount and sessions.
pub(crate) fn accrue_full(
    state: &mut AccrualState,
    currency: Currency,
) -> Result<(f64, u32), ServerError> {
    let amount = state.remaining_amount_to_accrue;
    if !amount.is_finite() {
        return Err(NonFiniteAccrualAmount::new(&state.contract_id));
    }
    let sessions = state.remaining_sessions_to_accrue;

    state.total_amount_accrued = round_to_currency(state.total_amount_accrued + amount, currency);
    state.remaining_amount_to_accrue = 0.0;
    state.total_sessions_accrued += sessions;
    state.remaining_sessions_to_accrue = 0;
    state.status = AccrualStatus::Completed;
    Ok((amount, sessions))
}

/// Re-derives the remaining sessions from the sessions still scheduled. Used
/// when resuming after a pause and when the session bookkeeping ran dry while
/// an amount is still open.
pub(crate) fn rebase_sessions(state: &mut AccrualState, sessions_ahead: u32) {
    state.remaining_sessions_to_accrue = sessions_ahead;
    state.total_sessions_to_accrue = state.total_sessions_accrued + sessions_ahead;
}

/// Re-opens a completed accrual after the contract total grew.
pub(crate) fn reopen(state: &mut AccrualState, new_total: f64, currency: Currency) {
    state.total_amount_to_accrue = new_total;
    state.remaining_amount_to_accrue =
        round_to_currency(new_total - state.total_amount_accrued, currency);
    state.status = AccrualStatus::Active;
}

/// Whether nothing is left to accrue. A zero-amount contract runs until its
/// sessions are used up, every other one until its amount is.
pub(crate) fn is_exhausted(state: &AccrualState, currency: Currency) -> bool {
    let amount_left = round_to_currency(state.remaining_amount_to_accrue, currency) != 0.0;
    if amount_left {
        return false;
    }
    state.total_amount_to_accrue != 0.0 || state.remaining_sessions_to_accrue == 0
}
