use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use bitcoin::{Address, Network, Script, Transaction, TxOut, Txid};
use light_btcio::{ChainDataError, ChainDataProvider};
use light_common::{retry_with_backoff, RetryConfig};
use light_primitives::{InscriptionId, OrdTransfer};
use tracing::*;

use crate::{envelope::parse_inscriptions, errors::OrdVerifyError};

/// Checks claimed ordinal transfers against the chain.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TransferVerifier: Send + Sync {
    /// Succeeds only if every claim is physically consistent with block `height`.
    async fn verify(&self, claims: &[OrdTransfer], height: u64) -> Result<(), OrdVerifyError>;
}

/// An inscription in flight through one transaction.
#[derive(Debug)]
struct Flotsam {
    id: InscriptionId,
    /// Sat offset from the start of the transaction's inputs.
    offset: u64,
    content_type: Vec<u8>,
}

impl Flotsam {
    fn key(&self) -> (u64, InscriptionId) {
        (self.offset, self.id)
    }
}

/// Output a [`Flotsam`] landed in after replay.
#[derive(Debug)]
struct NewLocation<'a> {
    flotsam: Flotsam,
    vout: u32,
    output: &'a TxOut,
}

/// Replays claimed transfers against block bodies fetched from a [`ChainDataProvider`].
///
/// Sats are assigned to outputs first-in first-out by value range. Every inscription revealed
/// on an input is placed at the first sat of that input; pointer fields are not honored.
pub struct OrdTransferVerifier {
    chain: Arc<dyn ChainDataProvider>,
    network: Network,
    retry: RetryConfig,
}

impl fmt::Debug for OrdTransferVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrdTransferVerifier")
            .field("network", &self.network)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl OrdTransferVerifier {
    pub fn new(chain: Arc<dyn ChainDataProvider>, network: Network, retry: RetryConfig) -> Self {
        Self {
            chain,
            network,
            retry,
        }
    }

    async fn read<T, F, Fut>(&self, what: &str, op: F) -> Result<T, ChainDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainDataError>>,
    {
        retry_with_backoff(what, &self.retry, ChainDataError::is_transient, op).await
    }

    async fn verify_transaction(
        &self,
        tx: &Transaction,
        txid: Txid,
        claims: Vec<&OrdTransfer>,
    ) -> Result<(), OrdVerifyError> {
        let revealed = parse_inscriptions(tx);

        let mut flotsam = Vec::new();
        let mut cursor = 0u64;
        for (input_index, txin) in tx.input.iter().enumerate() {
            let prevout = &txin.previous_output;
            let spent = self
                .read("previous_output", || self.chain.previous_output(prevout))
                .await?;
            let value = spent.value.to_sat();

            for claim in &claims {
                let Some(old) = claim.old_satpoint.filter(|sp| sp.outpoint == *prevout) else {
                    continue;
                };
                if old.offset >= value {
                    return Err(OrdVerifyError::invalid(
                        claim.inscription_id,
                        format!("old satpoint {old} is past the end of a {value} sat output"),
                    ));
                }
                flotsam.push(Flotsam {
                    id: claim.inscription_id,
                    offset: cursor + old.offset,
                    content_type: self.prior_content_type(&claim.inscription_id).await?,
                });
            }

            for (index, ins) in revealed.iter().enumerate() {
                if ins.input_index != input_index {
                    continue;
                }
                flotsam.push(Flotsam {
                    id: InscriptionId::new(txid, index as u32),
                    offset: cursor,
                    content_type: ins.envelope.content_type.clone().unwrap_or_default(),
                });
            }

            cursor += value;
        }

        flotsam.sort_by_key(Flotsam::key);
        let locations = assign_outputs(tx, flotsam);

        let mut keyed = Vec::with_capacity(claims.len());
        for claim in claims {
            let vout = claim.new_satpoint.outpoint.vout;
            let start = output_start(tx, vout).ok_or_else(|| {
                OrdVerifyError::invalid(claim.inscription_id, format!("{txid} has no output {vout}"))
            })?;
            let offset = start.checked_add(claim.new_satpoint.offset).ok_or_else(|| {
                OrdVerifyError::invalid(
                    claim.inscription_id,
                    format!("offset of {} overflows", claim.new_satpoint),
                )
            })?;
            keyed.push((offset, claim));
        }
        keyed.sort_by_key(|(offset, claim)| (*offset, claim.inscription_id));

        let mut derived = locations.iter().peekable();
        for (offset, claim) in keyed {
            let key = (offset, claim.inscription_id);
            while derived.next_if(|l| l.flotsam.key() < key).is_some() {}
            match derived.next_if(|l| l.flotsam.key() == key) {
                Some(location) => self.compare(claim, location)?,
                None => {
                    return Err(OrdVerifyError::invalid(
                        claim.inscription_id,
                        format!("no inscription lands at {}", claim.new_satpoint),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Content type the inscription was revealed with, read from its genesis transaction.
    async fn prior_content_type(&self, id: &InscriptionId) -> Result<Vec<u8>, OrdVerifyError> {
        let genesis = self
            .read("raw_transaction", || self.chain.raw_transaction(&id.txid))
            .await?;
        parse_inscriptions(&genesis)
            .into_iter()
            .nth(id.index as usize)
            .map(|ins| ins.envelope.content_type.unwrap_or_default())
            .ok_or_else(|| OrdVerifyError::invalid(*id, "not revealed by its genesis transaction"))
    }

    fn compare(&self, claim: &OrdTransfer, location: &NewLocation<'_>) -> Result<(), OrdVerifyError> {
        let mismatch = |field, claimed: String, derived: String| OrdVerifyError::Mismatch {
            inscription_id: claim.inscription_id,
            field,
            claimed,
            derived,
        };

        let claimed_vout = claim.new_satpoint.outpoint.vout;
        if location.vout != claimed_vout {
            return Err(mismatch(
                "output",
                claimed_vout.to_string(),
                location.vout.to_string(),
            ));
        }

        let script = &location.output.script_pubkey;
        if *script != claim.new_pkscript {
            return Err(mismatch(
                "pkscript",
                claim.new_pkscript.to_hex_string(),
                script.to_hex_string(),
            ));
        }

        let wallet = wallet_for(script, self.network);
        if wallet != claim.new_wallet {
            return Err(mismatch("wallet", claim.new_wallet.clone(), wallet));
        }

        if location.flotsam.content_type != claim.content_type {
            return Err(mismatch(
                "content_type",
                String::from_utf8_lossy(&claim.content_type).into_owned(),
                String::from_utf8_lossy(&location.flotsam.content_type).into_owned(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl TransferVerifier for OrdTransferVerifier {
    async fn verify(&self, claims: &[OrdTransfer], height: u64) -> Result<(), OrdVerifyError> {
        if claims.is_empty() {
            return Err(OrdVerifyError::EmptyClaims);
        }

        let hash = self
            .read("block_hash", || self.chain.block_hash(height))
            .await?;
        let txs = self
            .read("block_transactions", || self.chain.block_transactions(&hash))
            .await?;

        // Fee-spent inscriptions land in the coinbase, which has no inputs to replay. Only
        // their location is checked.
        let coinbase_txid = txs.first().map(Transaction::compute_txid);
        for claim in claims {
            let in_coinbase = Some(claim.new_satpoint.outpoint.txid) == coinbase_txid;
            if claim.sent_as_fee != in_coinbase {
                let reason = if claim.sent_as_fee {
                    "sent as fee but not located in the coinbase"
                } else {
                    "located in the coinbase but not sent as fee"
                };
                return Err(OrdVerifyError::invalid(claim.inscription_id, reason));
            }
        }

        let mut by_tx: BTreeMap<Txid, Vec<&OrdTransfer>> = BTreeMap::new();
        for claim in claims.iter().filter(|c| !c.sent_as_fee) {
            by_tx
                .entry(claim.new_satpoint.outpoint.txid)
                .or_default()
                .push(claim);
        }

        for tx in txs.iter().skip(1) {
            let txid = tx.compute_txid();
            let Some(tx_claims) = by_tx.remove(&txid) else {
                continue;
            };
            let n = tx_claims.len();
            self.verify_transaction(tx, txid, tx_claims).await?;
            trace!(%txid, claims = n, "transfers replayed");
        }

        if let Some(stray) = by_tx.values().flatten().next() {
            return Err(OrdVerifyError::invalid(
                stray.inscription_id,
                format!(
                    "transaction {} is not in block {height}",
                    stray.new_satpoint.outpoint.txid
                ),
            ));
        }

        debug!(%height, %hash, claims = claims.len(), "all transfers verified");
        Ok(())
    }
}

/// Assigns sorted flotsam to the output whose value range contains each offset. Flotsam past
/// the last output went to fees and is dropped.
fn assign_outputs(tx: &Transaction, flotsam: Vec<Flotsam>) -> Vec<NewLocation<'_>> {
    let mut locations = Vec::with_capacity(flotsam.len());
    let mut pending = flotsam.into_iter().peekable();
    let mut end = 0u64;
    for (vout, output) in tx.output.iter().enumerate() {
        end += output.value.to_sat();
        while let Some(flotsam) = pending.next_if(|f| f.offset < end) {
            locations.push(NewLocation {
                flotsam,
                vout: vout as u32,
                output,
            });
        }
    }
    locations
}

/// Sat offset of the first sat of output `vout`.
fn output_start(tx: &Transaction, vout: u32) -> Option<u64> {
    let vout = vout as usize;
    (vout < tx.output.len()).then(|| {
        tx.output[..vout]
            .iter()
            .map(|o| o.value.to_sat())
            .sum()
    })
}

/// Address string for `script`, or its hex when it has no address form.
fn wallet_for(script: &Script, network: Network) -> String {
    Address::from_script(script, network)
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| script.to_hex_string())
}
