use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use fractic_server_error::ServerError;
use tokio::sync::Mutex;

use crate::{
    domain::repositories::education_lookup::EducationLookup,
    entities::EducationRecord,
    errors::{EducationLookupFailed, EducationLookupTimeout},
};

/// Wraps a lookup for the duration of one run: answers are cached per client
/// (unknown clients included) and every call is bounded by `timeout`.
pub(crate) struct MemoizedEducationLookup<L: EducationLookup + ?Sized> {
    inner: Arc<L>,
    timeout: Duration,
    cache: Mutex<HashMap<String, Option<EducationRecord>>>,
}

impl<L: EducationLookup + ?Sized> MemoizedEducationLookup<L> {
    pub(crate) fn new(inner: Arc<L>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<L: EducationLookup + ?Sized> EducationLookup for MemoizedEducationLookup<L> {
    async fn lookup(
        &self,
        client_external_id: &str,
    ) -> Result<Option<EducationRecord>, ServerError> {
        if let Some(cached) = self.cache.lock().await.get(client_external_id) {
            return Ok(cached.clone());
        }

        // The cache lock is not held while waiting on the inner lookup.
        let record = tokio::time::timeout(self.timeout, self.inner.lookup(client_external_id))
            .await
            .map_err(|_| {
                EducationLookupTimeout::new(client_external_id, self.timeout.as_millis())
            })?
            .map_err(|e| EducationLookupFailed::with_debug(client_external_id, &e))?;

        self.cache
            .lock()
            .await
            .insert(client_external_id.to_string(), record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::entities::EducationStatus;

    use super::*;

    struct CountingLookup {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl EducationLookup for CountingLookup {
        async fn lookup(
            &self,
            client_external_id: &str,
        ) -> Result<Option<EducationRecord>, ServerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok((client_external_id == "known")
                .then(|| EducationRecord::new(EducationStatus::Graduated, None)))
        }
    }

    #[tokio::test]
    async fn caches_known_and_unknown_clients() {
        let inner = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let lookup = MemoizedEducationLookup::new(inner.clone(), Duration::from_secs(1));

        assert!(lookup.lookup("known").await.unwrap().is_some());
        assert!(lookup.lookup("known").await.unwrap().is_some());
        assert!(lookup.lookup("unknown").await.unwrap().is_none());
        assert!(lookup.lookup("unknown").await.unwrap().is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_lookup_times_out() {
        let inner = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(200),
        });
        let lookup = MemoizedEducationLookup::new(inner, Duration::from_millis(10));
        assert!(lookup.lookup("known").await.is_err());
    }
}
