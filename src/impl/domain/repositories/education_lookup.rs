use async_trait::async_trait;
use fractic_server_error::ServerError;

use crate::entities::EducationRecord;

/// Education status lookup. `Ok(None)` means the client is unknown to the
/// education system.
#[async_trait]
pub trait EducationLookup: Send + Sync {
    async fn lookup(&self, client_external_id: &str)
        -> Result<Option<EducationRecord>, ServerError>;
}
