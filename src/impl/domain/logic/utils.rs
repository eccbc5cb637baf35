use chrono::{Datelike, Duration, NaiveDate};
use fractic_server_error::{CriticalError, ServerError};

/// Returns the first day of the month of the given date.
pub(crate) fn month_start_date(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("copying a NaiveDate with overridden day=1 should never fail")
}

/// Returns the first day of the month following the given date.
pub(crate) fn next_month_start_date(date: NaiveDate) -> Result<NaiveDate, ServerError> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        CriticalError::with_debug(
            "next-month calculation unexpectedly resulted in invalid date",
            &format!("year: {}, month: {}", year, month),
        )
    })
}

/// Returns the last day of the month of the given date.
pub(crate) fn month_end_date(date: NaiveDate) -> Result<NaiveDate, ServerError> {
    Ok(next_month_start_date(date)? - Duration::days(1))
}

/// Number of calendar months from the month of `from` to the month of `to`,
/// ignoring the day. Negative when `to` lies before `from`.
pub(crate) fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Returns the first day of each month between the given dates (inclusive).
pub(crate) fn month_start_dates(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>, ServerError> {
    let mut dates = Vec::new();
    let mut current = month_start_date(start);
    while current <= end {
        dates.push(current);
        current = next_month_start_date(current)?;
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_end_handles_leap_years_and_december() {
        assert_eq!(month_end_date(date(2024, 2, 10)).unwrap(), date(2024, 2, 29));
        assert_eq!(month_end_date(date(2025, 2, 1)).unwrap(), date(2025, 2, 28));
        assert_eq!(month_end_date(date(2025, 12, 31)).unwrap(), date(2025, 12, 31));
    }

    #[test]
    fn months_between_ignores_days() {
        assert_eq!(months_between(date(2025, 1, 31), date(2025, 5, 1)), 4);
        assert_eq!(months_between(date(2024, 11, 15), date(2025, 2, 15)), 3);
        assert_eq!(months_between(date(2025, 3, 1), date(2025, 1, 1)), -2);
    }

    #[test]
    fn month_start_dates_covers_range() {
        assert_eq!(
            month_start_dates(date(2024, 11, 20), date(2025, 2, 1)).unwrap(),
            vec![
                date(2024, 11, 1),
                date(2024, 12, 1),
                date(2025, 1, 1),
                date(2025, 2, 1)
            ]
        );
        assert!(month_start_dates(date(2025, 3, 1), date(2025, 2, 1))
            .unwrap()
            .is_empty());
    }
}
