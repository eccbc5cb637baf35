use chrono::{NaiveDate, Weekday};
use fractic_server_error::ServerError;
use serde_derive::{Deserialize, Serialize};

use crate::errors::{InvalidPeriodRange, InvalidSessionCadence};

use super::contract::ContractId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    Active,
    Postponed,
    Dropped,
    Ended,
}

/// Weekly cadence of a period. When no explicit weekdays are given, the
/// sessions are spread over the week following a fixed pattern (3 sessions ->
/// Mon/Wed/Fri).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    pub sessions_per_week: u32,
    pub weekdays: Option<Vec<Weekday>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub contract_id: ContractId,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    /// Date on which `status` last changed. Cutoff for partial accrual on
    /// pause and drop.
    pub status_change_date: Option<NaiveDate>,
    pub schedule: SessionSchedule,
}

// --

impl std::fmt::Display for PeriodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodStatus::Active => write!(f, "ACTIVE"),
            PeriodStatus::Postponed => write!(f, "POSTPONED"),
            PeriodStatus::Dropped => write!(f, "DROPPED"),
            PeriodStatus::Ended => write!(f, "ENDED"),
        }
    }
}

impl SessionSchedule {
    pub fn per_week(sessions_per_week: u32) -> Self {
        Self {
            sessions_per_week,
            weekdays: None,
        }
    }

    pub fn on(weekdays: Vec<Weekday>) -> Self {
        Self {
            sessions_per_week: weekdays.len() as u32,
            weekdays: Some(weekdays),
        }
    }

    pub fn session_days(&self) -> Vec<Weekday> {
        if let Some(days) = &self.weekdays {
            return days.clone();
        }
        use Weekday::*;
        match self.sessions_per_week {
            0 => vec![],
            1 => vec![Mon],
            2 => vec![Tue, Thu],
            3 => vec![Mon, Wed, Fri],
            4 => vec![Mon, Tue, Wed, Thu],
            5 => vec![Mon, Tue, Wed, Thu, Fri],
            6 => vec![Mon, Tue, Wed, Thu, Fri, Sat],
            _ => vec![Mon, Tue, Wed, Thu, Fri, Sat, Sun],
        }
    }

    pub fn is_session_day(&self, day: Weekday) -> bool {
        self.session_days().contains(&day)
    }
}

impl Period {
    pub fn new(
        id: u64,
        contract_id: ContractId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        sessions_per_week: u32,
    ) -> Self {
        Self {
            id: PeriodId(id),
            contract_id,
            start_date,
            end_date,
            status: PeriodStatus::Active,
            status_change_date: None,
            schedule: SessionSchedule::per_week(sessions_per_week),
        }
    }

    /// Sets the status together with its change date, the way the sync job
    /// records status transitions.
    pub fn with_status(mut self, status: PeriodStatus, changed_on: NaiveDate) -> Self {
        self.status = status;
        self.status_change_date = Some(changed_on);
        self
    }

    pub fn with_schedule(mut self, schedule: SessionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.end_date < self.start_date {
            return Err(InvalidPeriodRange::new(
                &self.id,
                &self.start_date,
                &self.end_date,
            ));
        }
        let explicit_days_mismatch = self
            .schedule
            .weekdays
            .as_ref()
            .is_some_and(|days| days.is_empty());
        if self.schedule.sessions_per_week == 0
            || self.schedule.sessions_per_week > 7
            || explicit_days_mismatch
        {
            return Err(InvalidSessionCadence::new(
                &self.id,
                self.schedule.sessions_per_week,
            ));
        }
        Ok(())
    }
}
