use light_btcio::ChainDataError;
use light_reconciler::ResolveError;
use thiserror::Error;

/// Reasons the indexer refuses to start from the current chain tip.
#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("chain data: {0}")]
    Chain(#[from] ChainDataError),

    #[error("chain tip is the genesis block, nothing to bootstrap from")]
    AtGenesis,

    #[error("bootstrap quorum: {0}")]
    Quorum(#[from] ResolveError),

    /// Sources disagree on the bootstrap block; resolving that needs historical verification.
    #[error("checkpoints for block {height} ({hash}) are inconsistent")]
    Inconsistent { height: u64, hash: String },
}
