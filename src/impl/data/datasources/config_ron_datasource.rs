use async_trait::async_trait;
use fractic_server_error::ServerError;
use ron::extensions::Extensions;

use crate::{
    data::models::accrual_config_model::AccrualConfigModel,
    entities::AccrualConfig,
    errors::{InvalidRon, ReadError},
};

#[async_trait]
pub(crate) trait AccrualConfigRonDatasource: Send + Sync {
    fn from_string(&self, s: &str) -> Result<AccrualConfig, ServerError>;

    async fn from_file<P>(&self, path: P) -> Result<AccrualConfig, ServerError>
    where
        P: AsRef<std::path::Path> + Send;
}

pub(crate) struct AccrualConfigRonDatasourceImpl;

impl AccrualConfigRonDatasourceImpl {
    pub(crate) fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AccrualConfigRonDatasource for AccrualConfigRonDatasourceImpl {
    fn from_string(&self, s: &str) -> Result<AccrualConfig, ServerError> {
        // Optional fields can be written without `Some(..)`.
        let model: AccrualConfigModel = ron::Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .from_str(s)
            .map_err(|e| InvalidRon::with_debug("AccrualConfig", &e))?;
        model.try_into()
    }

    async fn from_file<P>(&self, path: P) -> Result<AccrualConfig, ServerError>
    where
        P: AsRef<std::path::Path> + Send,
    {
        let s = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ReadError::with_debug(&e))?;
        self.from_string(&s)
    }
}
