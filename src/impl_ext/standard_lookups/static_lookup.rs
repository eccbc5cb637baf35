use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use fractic_server_error::ServerError;

use crate::{
    domain::repositories::education_lookup::EducationLookup,
    entities::{EducationRecord, EducationStatus},
};

/// Education lookup answering from a fixed set of records. Clients without a
/// record are unknown. An optional latency simulates a slow education system.
#[derive(Debug, Default)]
pub struct StaticEducationLookup {
    records: HashMap<String, EducationRecord>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticEducationLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(
        mut self,
        client_external_id: &str,
        status: EducationStatus,
        status_change_date: Option<NaiveDate>,
    ) -> Self {
        self.records.insert(
            client_external_id.to_string(),
            EducationRecord::new(status, status_change_date),
        );
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl From<HashMap<String, EducationRecord>> for StaticEducationLookup {
    fn from(records: HashMap<String, EducationRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EducationLookup for StaticEducationLookup {
    async fn lookup(
        &self,
        client_external_id: &str,
    ) -> Result<Option<EducationRecord>, ServerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.records.get(client_external_id).cloned())
    }
}
