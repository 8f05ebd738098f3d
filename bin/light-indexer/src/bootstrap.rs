//! Initial trusted checkpoints, taken from the block before the chain tip.

use std::time::Duration;

use light_btcio::ChainDataProvider;
use light_commitment::CommitmentOracle;
use light_primitives::CheckpointExport;
use light_reconciler::{commitments_agree, ConsistencyResolver, QuorumFetcher};
use tracing::*;

use crate::errors::BootstrapError;

/// Fetches the quorum for the parent of the current tip and returns it if it is unanimous.
///
/// A disagreeing bootstrap quorum is refused rather than reconciled, since there is no trusted
/// pre-state to replay from yet.
pub(crate) async fn bootstrap_checkpoints<O: CommitmentOracle>(
    chain: &dyn ChainDataProvider,
    fetcher: &QuorumFetcher,
    resolver: &ConsistencyResolver<O>,
    fetch_timeout: Duration,
) -> Result<Vec<CheckpointExport>, BootstrapError> {
    let tip = chain.latest_height().await?;
    let height = tip.checked_sub(1).ok_or(BootstrapError::AtGenesis)?;
    let hash = chain.block_hash(height).await?.to_string();
    info!(%height, %hash, "bootstrapping checkpoints");

    let results = fetcher.fetch_all(height, &hash, fetch_timeout).await;
    resolver.ensure_quorum(&results)?;
    if !commitments_agree(&results) {
        return Err(BootstrapError::Inconsistent { height, hash });
    }

    info!(%height, sources = results.len(), "bootstrap checkpoints agree");
    Ok(results)
}
