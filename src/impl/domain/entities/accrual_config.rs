use std::{collections::BTreeSet, time::Duration};

use chrono::NaiveDate;
use fractic_server_error::ServerError;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};

use crate::errors::InvalidRecalculatedProductPattern;

/// Days on which no sessions take place, regardless of the period cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar(BTreeSet<NaiveDate>);

/// Policy for attributing a full accrual that happens in a month no period
/// overlaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchAllAttribution {
    /// Posting is not linked to any period.
    #[default]
    NullPeriod,
    /// Posting is linked to the ENDED period that ended last on or before the
    /// target month.
    MostRecentEnded,
    /// Posting is linked to the period whose date range lies closest to the
    /// target month.
    ClosestToMonth,
}

/// Policy values of the engine. Passed explicitly so that a month can be
/// re-processed under a different policy without code changes.
#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// A contract is recent while the target month ends at most this many days
    /// after the contract start.
    pub recency_window_days: i64,
    /// A postponed last period expires once the target month lies more than
    /// this many calendar months after the postponement.
    pub postponement_limit_months: i32,
    pub holidays: HolidayCalendar,
    pub catch_all_attribution: CatchAllAttribution,
    /// Products whose committed amount can grow while the course runs.
    pub recalculated_products: Option<Regex>,
    pub lookup_timeout: Duration,
    pub max_concurrency: usize,
}

// --

impl HolidayCalendar {
    pub fn new<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self(dates.into_iter().collect())
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            recency_window_days: 15,
            postponement_limit_months: 3,
            holidays: HolidayCalendar::default(),
            catch_all_attribution: CatchAllAttribution::default(),
            recalculated_products: None,
            lookup_timeout: Duration::from_secs(5),
            max_concurrency: 8,
        }
    }
}

impl AccrualConfig {
    pub fn with_recalculated_products(mut self, pattern: &str) -> Result<Self, ServerError> {
        self.recalculated_products = Some(
            Regex::new(pattern)
                .map_err(|e| InvalidRecalculatedProductPattern::with_debug(pattern, &e))?,
        );
        Ok(self)
    }

    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_catch_all_attribution(mut self, attribution: CatchAllAttribution) -> Self {
        self.catch_all_attribution = attribution;
        self
    }

    pub fn is_recalculated_product(&self, product: &str) -> bool {
        self.recalculated_products
            .as_ref()
            .is_some_and(|re| re.is_match(product))
    }
}
