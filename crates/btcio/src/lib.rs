//! Bitcoin chain-data capability used to replay ordinal transfers.

mod bitcoind;
mod provider;

pub use bitcoind::BitcoindChainData;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockChainDataProvider;
pub use provider::{ChainDataError, ChainDataProvider};
