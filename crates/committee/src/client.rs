use async_trait::async_trait;

use crate::{errors::CommitteeError, types::LatestStateProof};

/// Access to a committee indexer's evidence for its latest checkpoint.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait CommitteeClient: Send + Sync {
    /// Fetches the latest state proof from the indexer served at `source_url`.
    ///
    /// A protocol-level error reported by the indexer is returned inside the bundle, not as
    /// `Err`.
    async fn latest_state_proof(&self, source_url: &str)
        -> Result<LatestStateProof, CommitteeError>;
}
