use std::time::Duration;

use fractic_server_error::ServerError;

use crate::entities::{AccrualConfig, CatchAllAttribution, HolidayCalendar};

use super::iso_date_model::ISODateModel;

/// On-disk shape of the engine configuration. Every field is optional and
/// falls back to the default policy.
#[derive(Debug, Default, serde_derive::Deserialize)]
pub(crate) struct AccrualConfigModel {
    pub(crate) recency_window_days: Option<i64>,
    pub(crate) postponement_limit_months: Option<i32>,
    pub(crate) holidays: Option<Vec<ISODateModel>>,
    pub(crate) catch_all_attribution: Option<CatchAllAttribution>,
    pub(crate) recalculated_products: Option<String>,
    pub(crate) lookup_timeout_ms: Option<u64>,
    pub(crate) max_concurrency: Option<usize>,
}

impl TryFrom<AccrualConfigModel> for AccrualConfig {
    type Error = ServerError;

    fn try_from(model: AccrualConfigModel) -> Result<AccrualConfig, ServerError> {
        let defaults = AccrualConfig::default();
        let config = AccrualConfig {
            recency_window_days: model
                .recency_window_days
                .unwrap_or(defaults.recency_window_days),
            postponement_limit_months: model
                .postponement_limit_months
                .unwrap_or(defaults.postponement_limit_months),
            holidays: model.holidays.map_or(defaults.holidays, |dates| {
                HolidayCalendar::new(dates.into_iter().map(Into::into))
            }),
            catch_all_attribution: model
                .catch_all_attribution
                .unwrap_or(defaults.catch_all_attribution),
            recalculated_products: None,
            lookup_timeout: model
                .lookup_timeout_ms
                .map_or(defaults.lookup_timeout, Duration::from_millis),
            max_concurrency: model
                .max_concurrency
                .unwrap_or(defaults.max_concurrency)
                .max(1),
        };
        match model.recalculated_products {
            Some(pattern) => config.with_recalculated_products(&pattern),
            None => Ok(config),
        }
    }
}
