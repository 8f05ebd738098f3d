use light_btcio::ChainDataError;
use light_reconciler::ResolveError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    #[error("runtime state needs at least one bootstrap checkpoint")]
    EmptyBootstrap,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("chain data: {0}")]
    Chain(#[from] ChainDataError),
}
