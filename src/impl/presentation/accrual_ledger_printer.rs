use std::collections::BTreeSet;

use iso_currency::Currency;

use crate::entities::{BatchResult, Posting};

use super::utils::format_amount;

const DEFERRED_REVENUE: &str = "Liabilities:Deferred Revenue";
const ACCRUED_REVENUE: &str = "Income:Accrued Revenue";

/// Renders the postings of a run as an hledger journal: each posting moves
/// its amount from deferred to accrued revenue.
pub(crate) struct AccrualLedgerPrinter;

impl AccrualLedgerPrinter {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn print_ledger(&self, result: &BatchResult) -> String {
        let mut ledger_output = String::new();

        ledger_output.push_str(
            "; --- Accounts -----------------------------------------------------------------\n\n",
        );
        ledger_output.push_str(&format!("account {:61}  ; type: L\n", DEFERRED_REVENUE));
        ledger_output.push_str(&format!("account {:61}  ; type: R\n", ACCRUED_REVENUE));
        ledger_output.push_str("\n\n");

        ledger_output.push_str(
            "; --- Commodities --------------------------------------------------------------\n\n",
        );
        self.print_commodities(&mut ledger_output, &result.postings);
        ledger_output.push_str("\n\n");

        ledger_output.push_str(
            "; --- Accruals -----------------------------------------------------------------\n\n",
        );
        for posting in &result.postings {
            self.print_posting(&mut ledger_output, posting);
        }

        ledger_output.push_str(
            "\n; --- Notifications ------------------------------------------------------------\n\n",
        );
        for notification in result.notifications.values().flatten() {
            for line in textwrap::wrap(&notification.to_string(), 74) {
                ledger_output.push_str(&format!("; {}\n", line));
            }
        }

        ledger_output
    }

    fn print_commodities(&self, ledger_output: &mut String, postings: &[Posting]) {
        let currencies: BTreeSet<&str> = postings.iter().map(|p| p.currency.code()).collect();
        for code in currencies {
            if let Some(currency) = Currency::from_code(code) {
                ledger_output.push_str(&format!(
                    "commodity {}\n",
                    format_amount(1000.0, currency, true)
                ));
            }
        }
    }

    fn print_posting(&self, ledger_output: &mut String, posting: &Posting) {
        let period = match (posting.period_id, posting.period_status) {
            (Some(id), Some(status)) => format!("period {} ({})", id, status),
            (Some(id), None) => format!("period {}", id),
            _ => "no period".to_string(),
        };
        ledger_output.push_str(&format!(
            "{} (contract {}) Accrual | {}, {} sessions, portion {:.2}%\n",
            posting.accrual_date,
            posting.contract_id,
            period,
            posting.sessions,
            posting.portion * 100.0,
        ));
        ledger_output.push_str(&format!(
            "    {:55} {:>20}\n",
            DEFERRED_REVENUE,
            format_amount(posting.amount, posting.currency, false),
        ));
        ledger_output.push_str(&format!(
            "    {:55} {:>20}\n",
            ACCRUED_REVENUE,
            format_amount(-posting.amount, posting.currency, false),
        ));
        ledger_output.push_str(&format!(
            "    ; contract total: {}\n\n",
            format_amount(posting.total_contract_amount, posting.currency, false)
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::entities::{
        AccrualStateId, ContractId, Notification, NotificationKind, PeriodId, PeriodStatus,
    };

    use super::*;

    #[test]
    fn prints_balanced_accrual_entries() {
        let month = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut notifications = BTreeMap::new();
        notifications.insert(
            NotificationKind::MissingCrmData,
            vec![Notification {
                kind: NotificationKind::MissingCrmData,
                contract_id: ContractId(8),
                message: "client unknown".to_string(),
            }],
        );
        let result = BatchResult {
            month,
            processed: 2,
            succeeded: 1,
            failed: 0,
            skipped: 1,
            postings_created: 1,
            postings_updated: 0,
            postings: vec![Posting {
                accrual_state_id: AccrualStateId(1),
                contract_id: ContractId(12),
                period_id: Some(PeriodId(4)),
                accrual_date: month,
                amount: 1_500.0,
                portion: 0.5,
                sessions: 15,
                total_contract_amount: 10_000.0,
                currency: Currency::EUR,
                period_status: Some(PeriodStatus::Active),
                status_change_date: None,
            }],
            outcomes: Vec::new(),
            notifications,
        };

        let ledger = AccrualLedgerPrinter::new().print_ledger(&result);
        assert!(ledger.contains(
            "2025-03-01 (contract 12) Accrual | period 4 (ACTIVE), 15 sessions, portion 50.00%"
        ));
        assert!(ledger.contains(&format!("-1,500.00 {}", Currency::EUR.symbol())));
        assert!(ledger.contains(&format!("commodity 1,000.00 {}", Currency::EUR.symbol())));
        assert!(ledger.contains("; [missing_crm_data] contract 8: client unknown"));
    }
}
