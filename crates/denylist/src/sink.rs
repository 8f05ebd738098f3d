use async_trait::async_trait;
use light_primitives::DenylistEntry;

use crate::errors::DenylistError;

/// Append-only destination for denylist entries.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait DenylistSink: Send + Sync {
    async fn append(&self, entry: &DenylistEntry) -> Result<(), DenylistError>;
}
