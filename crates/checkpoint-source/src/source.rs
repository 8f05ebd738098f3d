use async_trait::async_trait;
use light_primitives::{CheckpointExport, SourceDescriptor};

use crate::errors::SourceError;

/// A single origin of checkpoints.
///
/// `fetch` retries transient failures internally, bounded by the source's retry policy.
/// Dropping the returned future cancels the fetch.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait CheckpointSource: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Fetches the checkpoint published for exactly block `height` with hash `hash`.
    async fn fetch(&self, height: u64, hash: &str) -> Result<CheckpointExport, SourceError>;
}
