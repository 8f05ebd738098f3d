use std::fmt;

use async_trait::async_trait;
use bitcoin::{BlockHash, OutPoint, Transaction, TxOut, Txid};
use bitcoind_async_client::traits::Reader;
use tracing::*;

use crate::provider::{ChainDataError, ChainDataProvider};

/// [`ChainDataProvider`] backed by a bitcoind RPC reader.
pub struct BitcoindChainData<R> {
    client: R,
}

impl<R> fmt::Debug for BitcoindChainData<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitcoindChainData").finish_non_exhaustive()
    }
}

impl<R: Reader> BitcoindChainData<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }
}

fn rpc_err(e: impl fmt::Display) -> ChainDataError {
    ChainDataError::Rpc(e.to_string())
}

/// Picks the output `outpoint.vout` out of its funding transaction.
fn output_of(tx: &Transaction, outpoint: &OutPoint) -> Result<TxOut, ChainDataError> {
    usize::try_from(outpoint.vout)
        .ok()
        .and_then(|vout| tx.output.get(vout))
        .cloned()
        .ok_or(ChainDataError::MissingOutput(*outpoint))
}

#[async_trait]
impl<R: Reader + Send + Sync> ChainDataProvider for BitcoindChainData<R> {
    async fn latest_height(&self) -> Result<u64, ChainDataError> {
        let info = self.client.get_blockchain_info().await.map_err(rpc_err)?;
        Ok(u64::from(info.blocks))
    }

    async fn block_hash(&self, height: u64) -> Result<BlockHash, ChainDataError> {
        self.client.get_block_hash(height).await.map_err(rpc_err)
    }

    async fn raw_transaction(&self, txid: &Txid) -> Result<Transaction, ChainDataError> {
        let resp = self
            .client
            .get_raw_transaction_verbosity_zero(txid)
            .await
            .map_err(|e| {
                debug!(%txid, ?e, "failed to fetch raw transaction");
                rpc_err(e)
            })?;
        Ok(resp.0)
    }

    async fn previous_output(&self, outpoint: &OutPoint) -> Result<TxOut, ChainDataError> {
        let tx = self.raw_transaction(&outpoint.txid).await?;
        output_of(&tx, outpoint)
    }

    async fn block_transactions(&self, hash: &BlockHash) -> Result<Vec<Transaction>, ChainDataError> {
        let block = self.client.get_block(hash).await.map_err(rpc_err)?;
        trace!(%hash, txs = block.txdata.len(), "fetched block");
        Ok(block.txdata)
    }
}
