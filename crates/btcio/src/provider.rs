use async_trait::async_trait;
use bitcoin::{BlockHash, OutPoint, Transaction, TxOut, Txid};
use thiserror::Error;

/// Read access to the Bitcoin chain.
///
/// Implementations must be cancel-safe: dropping a returned future abandons the read.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Height of the current chain tip.
    async fn latest_height(&self) -> Result<u64, ChainDataError>;

    async fn block_hash(&self, height: u64) -> Result<BlockHash, ChainDataError>;

    async fn raw_transaction(&self, txid: &Txid) -> Result<Transaction, ChainDataError>;

    /// The output `outpoint` refers to, whether or not it has been spent.
    async fn previous_output(&self, outpoint: &OutPoint) -> Result<TxOut, ChainDataError>;

    /// Transactions of the block in block order, coinbase first.
    async fn block_transactions(&self, hash: &BlockHash) -> Result<Vec<Transaction>, ChainDataError>;
}

#[derive(Debug, Clone, Error)]
pub enum ChainDataError {
    #[error("rpc: {0}")]
    Rpc(String),

    #[error("output {0} does not exist")]
    MissingOutput(OutPoint),
}

impl ChainDataError {
    /// Whether retrying the same read could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_transient_classification() {
        let txid =
            Txid::from_str("6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799")
                .unwrap();
        assert!(ChainDataError::Rpc("timeout".into()).is_transient());
        assert!(!ChainDataError::MissingOutput(OutPoint::new(txid, 4)).is_transient());
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let mut mock = MockChainDataProvider::new();
        mock.expect_latest_height().returning(|| Ok(840_000));
        assert_eq!(mock.latest_height().await.unwrap(), 840_000);
    }
}
