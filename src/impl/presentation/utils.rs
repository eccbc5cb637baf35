use iso_currency::Currency;
use num_format::{Locale, ToFormattedString as _};

use crate::domain::logic::accrual_math::{decimal_places, minor_unit_factor};

/// Format cash amount with currency symbol, correct number of decimal places,
/// proper thousands separators, and optional trailing decimal mark.
///
/// For consistency, uses en locale ('.' as decimal mark, i.e. 1,000.00)
/// regardless of user's locale or currency.
///
/// For currencies with 0 decimal places, a decimal mark is always included if
/// 'trailing_decimal' is true. For other currencies, this flag has no effect.
pub(crate) fn format_amount(amount: f64, currency: Currency, trailing_decimal: bool) -> String {
    let decimal_places = decimal_places(currency);
    let factor = minor_unit_factor(currency);
    let minor_units = (amount * factor).round() as i64;
    let sign = if minor_units < 0 { "-" } else { "" };
    let minor_units = minor_units.unsigned_abs();
    if decimal_places == 0 {
        return format!(
            "{}{}{} {}",
            sign,
            minor_units.to_formatted_string(&Locale::en),
            if trailing_decimal { "." } else { "" },
            currency.symbol()
        );
    }
    let unit = factor as u64;
    format!(
        "{}{}.{:0decimal_places$} {}",
        sign,
        (minor_units / unit).to_formatted_string(&Locale::en),
        minor_units % unit,
        currency.symbol(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_signs_separators_and_minor_units() {
        let eur = Currency::EUR.symbol();
        assert_eq!(
            format_amount(1_500.0, Currency::EUR, false),
            format!("1,500.00 {}", eur)
        );
        assert_eq!(
            format_amount(-0.5, Currency::EUR, false),
            format!("-0.50 {}", eur)
        );
        assert!(format_amount(-1_234.567, Currency::USD, false).starts_with("-1,234.57 "));
        assert!(format_amount(12_000.0, Currency::JPY, true).starts_with("12,000. "));
    }
}
