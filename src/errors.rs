use chrono::NaiveDate;
use fractic_server_error::{define_client_error, define_internal_error};

use crate::entities::{ContractId, PeriodId};

// IO-related.
define_client_error!(ReadError, "Error reading file.");

// Parsing-related.
define_client_error!(InvalidCsv, "Invalid CSV format.");
define_client_error!(InvalidCsvContent, "Invalid CSV content: {details}.", { details: &str });
define_client_error!(InvalidRon, "Invalid {ron_type} (invalid RON format).", { ron_type: &str });
define_client_error!(InvalidIsoDate, "Invalid ISO date: {date}.", { date: &str });
define_client_error!(
    InvalidRecalculatedProductPattern,
    "Invalid recalculated product pattern: '{pattern}'.",
    { pattern: &str }
);

// Contract and period data.
define_client_error!(
    InvalidPeriodRange,
    "Period {period_id} ends ({end}) before it starts ({start}).",
    { period_id: &PeriodId, start: &NaiveDate, end: &NaiveDate }
);
define_client_error!(
    InvalidSessionCadence,
    "Period {period_id} has an invalid session cadence of {sessions_per_week} sessions per week.",
    { period_id: &PeriodId, sessions_per_week: u32 }
);
define_client_error!(
    ContractNotFound,
    "Contract {contract_id} not found.",
    { contract_id: &ContractId }
);
define_internal_error!(
    AccrualStateAlreadyExists,
    "An accrual state already exists for contract {contract_id}.",
    { contract_id: &ContractId }
);

// Accrual-related.
define_internal_error!(
    InvalidAccrualPortion,
    "Accrual portion {portion} for contract {contract_id} is outside [0, 1].",
    { portion: f64, contract_id: &ContractId }
);
define_internal_error!(
    NonFiniteAccrualAmount,
    "Accrual for contract {contract_id} produced a non-finite amount.",
    { contract_id: &ContractId }
);
define_internal_error!(
    HistoricalPostingRejected,
    "Posting for contract {contract_id} dated {accrual_date} lies outside the target month {target_month}.",
    { contract_id: &ContractId, accrual_date: &NaiveDate, target_month: &NaiveDate }
);

// External lookups.
define_internal_error!(
    EducationLookupTimeout,
    "Education status lookup for client '{client}' timed out after {millis} ms.",
    { client: &str, millis: u128 }
);
define_internal_error!(
    EducationLookupFailed,
    "Education status lookup for client '{client}' failed.",
    { client: &str }
);
