use chrono::NaiveDate;

use super::{
    accrual_state::AccrualStatus,
    contract::ContractStatus,
    notification::NotificationKind,
    period::{Period, PeriodStatus},
};

/// Processing situation of a contract for one target month. Exactly one case
/// applies per contract and month.
#[derive(Debug, Clone, PartialEq)]
pub enum Case {
    /// Contract starts after the target month.
    NotStartable,
    /// Accrual already completed. The contract settles on `status`.
    Finalize { status: ContractStatus },
    /// Contract has no periods at all; the education system decides.
    WithoutPeriods,
    /// A period overlaps the target month. `status` is the period status as
    /// seen from that month.
    Overlapping {
        period: Period,
        status: PeriodStatus,
    },
    /// Nothing overlaps the month, but something still needs accruing.
    Continuation(Continuation),
    /// Nothing to do this month.
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    DroppedInMonth { period: Period },
    PostponementExpired { period: Period },
    RecalculatedInvoices,
    TerminalContract {
        period: Period,
        status: PeriodStatus,
    },
}

/// What a handler decided to do with a contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Accrue the share of the remaining amount earned by the sessions of
    /// `period` in `[month_start, until)`.
    AccruePortion {
        period: Period,
        until: NaiveDate,
        /// Accrue everything that remains, the period being the last one.
        final_sweep: bool,
    },
    /// Accrue everything that remains. `None` leaves the attribution to the
    /// catch-all policy.
    AccrueFull { period: Option<Period> },
    Skip { reason: String },
    Notify {
        kind: NotificationKind,
        message: String,
    },
}

/// Instruction plus the status transitions that come with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub instruction: Instruction,
    pub contract_status: Option<ContractStatus>,
    pub accrual_status: Option<AccrualStatus>,
}

// --

impl Case {
    pub fn name(&self) -> &'static str {
        match self {
            Case::NotStartable => "not_startable",
            Case::Finalize { .. } => "finalize",
            Case::WithoutPeriods => "without_periods",
            Case::Overlapping { .. } => "overlapping",
            Case::Continuation(Continuation::DroppedInMonth { .. }) => "dropped_in_month",
            Case::Continuation(Continuation::PostponementExpired { .. }) => {
                "postponement_expired"
            }
            Case::Continuation(Continuation::RecalculatedInvoices) => "recalculated_invoices",
            Case::Continuation(Continuation::TerminalContract { .. }) => "terminal_contract",
            Case::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Case::Overlapping { period, status } => {
                write!(f, "overlapping (period {}, {})", period.id, status)
            }
            Case::Finalize { status } => write!(f, "finalize ({})", status),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl Resolution {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            instruction: Instruction::Skip {
                reason: reason.into(),
            },
            contract_status: None,
            accrual_status: None,
        }
    }

    pub fn notify(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            instruction: Instruction::Notify {
                kind,
                message: message.into(),
            },
            contract_status: None,
            accrual_status: None,
        }
    }

    pub fn accrue_full(period: Option<Period>, contract_status: ContractStatus) -> Self {
        Self {
            instruction: Instruction::AccrueFull { period },
            contract_status: Some(contract_status),
            accrual_status: Some(AccrualStatus::Completed),
        }
    }

    pub fn accrue_portion(period: Period, until: NaiveDate, final_sweep: bool) -> Self {
        Self {
            instruction: Instruction::AccruePortion {
                period,
                until,
                final_sweep,
            },
            contract_status: None,
            accrual_status: None,
        }
    }

    pub fn with_contract_status(mut self, status: ContractStatus) -> Self {
        self.contract_status = Some(status);
        self
    }

    pub fn with_accrual_status(mut self, status: AccrualStatus) -> Self {
        self.accrual_status = Some(status);
        self
    }
}
