use chrono::NaiveDate;
use iso_currency::Currency;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Canceled,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// Identifier of the client in the education system. `None` when the
    /// client was never linked, which the engine treats like an unknown
    /// client.
    pub client_external_id: Option<String>,
    pub product: String,
    /// Signed total; zero or negative for credit-note driven contracts.
    pub total_amount: f64,
    pub currency: Currency,
    pub start_date: NaiveDate,
    pub status: ContractStatus,
    /// Number of sessions the product comprises.
    pub total_sessions: u32,
    pub invoices: Vec<Invoice>,
}

// --

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Active => write!(f, "ACTIVE"),
            ContractStatus::Canceled => write!(f, "CANCELED"),
            ContractStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl ContractStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Canceled | ContractStatus::Closed)
    }

    /// Status a contract settles on once its accrual completes on its own.
    pub fn derived_from_total(total_amount_to_accrue: f64) -> Self {
        if total_amount_to_accrue > 0.0 {
            ContractStatus::Closed
        } else {
            ContractStatus::Canceled
        }
    }
}

impl Contract {
    pub fn new(
        id: u64,
        product: &str,
        total_amount: f64,
        currency: Currency,
        start_date: NaiveDate,
        total_sessions: u32,
    ) -> Self {
        Self {
            id: ContractId(id),
            client_external_id: None,
            product: product.to_string(),
            total_amount,
            currency,
            start_date,
            status: ContractStatus::Active,
            total_sessions,
            invoices: Vec::new(),
        }
    }

    pub fn with_client(mut self, client_external_id: &str) -> Self {
        self.client_external_id = Some(client_external_id.to_string());
        self
    }

    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_invoice(mut self, number: &str, date: NaiveDate, amount: f64) -> Self {
        self.invoices.push(Invoice {
            number: number.to_string(),
            date,
            amount,
        });
        self
    }

    pub fn has_invoice_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.invoices
            .iter()
            .any(|invoice| invoice.date >= start && invoice.date <= end)
    }
}
