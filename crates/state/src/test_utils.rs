//! Fixtures shared by the runtime and poller tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use light_checkpoint_source::{CheckpointSource, MockCheckpointSource, SourceError};
use light_commitment::test_utils::ScriptedOracle;
use light_committee::{CommitteeClient, LatestStateProof, MockCommitteeClient};
use light_denylist::MockDenylistSink;
use light_ord::{MockTransferVerifier, OrdVerifyError};
use light_primitives::{
    Checkpoint, CheckpointExport, Commitment, DenylistEntry, RawOrdTransfer, S3Source,
    SourceDescriptor, StateProof,
};
use light_reconciler::{ConsistencyResolver, QuorumFetcher};
use parking_lot::Mutex;

use crate::RuntimeState;

pub(crate) const HEIGHT: u64 = 840_001;
pub(crate) const HASH: &str = "000000000000000000026e1a0a94bc8f6e6ec3a8dd0c0d0a3cf0b1b43ff7c2a1";
pub(crate) const PREV_HASH: &str = "00000000000000000001b4b5c8e6a2d3c2f7a1e5d4c3b2a1908f7e6d5c4b3a29";
pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

const TXID: &str = "6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799";
const WALLET: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
const FORGED_WALLET: &str = "bc1qforgedforgedforgedforgedforgedforgedfo";

pub(crate) fn commitment(tag: u8) -> Commitment {
    Commitment::new(vec![tag; 32])
}

fn committee_url(tag: u8) -> String {
    format!("https://committee-{tag}.example.org")
}

pub(crate) fn descriptor(name: &str) -> SourceDescriptor {
    SourceDescriptor::S3(S3Source {
        region: "us-west-2".into(),
        bucket: "ckpts".into(),
        name: name.into(),
    })
}

pub(crate) fn export(name: &str, tag: u8, height: u64, hash: &str) -> CheckpointExport {
    CheckpointExport::new(
        Checkpoint::new(
            commitment(tag),
            hash,
            height,
            "brc-20",
            name,
            committee_url(tag),
            "v0.1.0",
        ),
        descriptor(name),
    )
}

/// Trusted checkpoint at `HEIGHT - 1` with commitment `0`.
pub(crate) fn bootstrap() -> Vec<CheckpointExport> {
    vec![export("a", 0, HEIGHT - 1, PREV_HASH)]
}

/// Source `name` claiming commitment `tag` for whatever block is asked.
pub(crate) fn source(name: &'static str, tag: u8) -> Arc<dyn CheckpointSource> {
    let mut source = MockCheckpointSource::new();
    source.expect_descriptor().return_const(descriptor(name));
    source
        .expect_fetch()
        .returning(move |height, hash| Ok(export(name, tag, height, hash)));
    Arc::new(source)
}

/// Source that never has the checkpoint.
pub(crate) fn silent(name: &'static str) -> Arc<dyn CheckpointSource> {
    let mut source = MockCheckpointSource::new();
    source.expect_descriptor().return_const(descriptor(name));
    source.expect_fetch().returning(|_, _| {
        Err(SourceError::Status {
            url: "https://ckpts".into(),
            status: 404,
        })
    });
    Arc::new(source)
}

fn transfers(n: usize, wallet: &str) -> Vec<RawOrdTransfer> {
    (0..n)
        .map(|i| RawOrdTransfer {
            inscription_id: format!("{TXID}i{i}"),
            old_satpoint: None,
            new_satpoint: format!("{TXID}:{i}:0"),
            new_pkscript: "0014e8df018c7e326cc253faac7e46cdc51e68542c42".into(),
            new_wallet: wallet.into(),
            sent_as_fee: false,
            content: "e30=".into(),
            content_type: "746578742f706c61696e".into(),
        })
        .collect()
}

/// Evidence for commitment `tag` with `n` transfers, forged ones failing replay.
pub(crate) fn bundle(tag: u8, n: usize, forged: bool) -> LatestStateProof {
    LatestStateProof {
        error: None,
        transfers: transfers(n, if forged { FORGED_WALLET } else { WALLET }),
        proof: StateProof::new(vec![tag; 8]),
    }
}

pub(crate) fn committee(bundles: Vec<(u8, LatestStateProof)>) -> MockCommitteeClient {
    let by_url: HashMap<String, LatestStateProof> = bundles
        .into_iter()
        .map(|(tag, b)| (committee_url(tag), b))
        .collect();
    let mut client = MockCommitteeClient::new();
    client
        .expect_latest_state_proof()
        .returning(move |url| Ok(by_url[url].clone()));
    client
}

pub(crate) fn verifier() -> MockTransferVerifier {
    let mut verifier = MockTransferVerifier::new();
    verifier.expect_verify().returning(|claims, _| {
        match claims.iter().find(|c| c.new_wallet == FORGED_WALLET) {
            Some(c) => Err(OrdVerifyError::Mismatch {
                inscription_id: c.inscription_id,
                field: "new_wallet",
                claimed: c.new_wallet.clone(),
                derived: WALLET.to_owned(),
            }),
            None => Ok(()),
        }
    });
    verifier
}

/// Oracle where proof `tag` leads from commitment `0` to commitment `tag`.
pub(crate) fn oracle(tags: &[u8]) -> ScriptedOracle {
    tags.iter().fold(ScriptedOracle::new(commitment(0)), |o, tag| {
        o.with_transition(StateProof::new(vec![*tag; 8]), commitment(*tag))
    })
}

/// Denylist sink recording what it is given.
pub(crate) fn recording_denylist() -> (MockDenylistSink, Arc<Mutex<Vec<DenylistEntry>>>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink_log = recorded.clone();
    let mut sink = MockDenylistSink::new();
    sink.expect_append().returning(move |entry| {
        sink_log.lock().push(entry.clone());
        Ok(())
    });
    (sink, recorded)
}

pub(crate) fn runtime_state(
    sources: Vec<Arc<dyn CheckpointSource>>,
    committee: impl CommitteeClient + 'static,
    oracle: ScriptedOracle,
    denylist: MockDenylistSink,
) -> RuntimeState<ScriptedOracle> {
    let fetcher = QuorumFetcher::new(sources).with_retry_pause(Duration::from_millis(500));
    let resolver =
        ConsistencyResolver::new(2, Arc::new(committee), Arc::new(verifier()), Arc::new(oracle));
    RuntimeState::new(bootstrap(), fetcher, resolver, Arc::new(denylist), FETCH_TIMEOUT)
        .expect("bootstrap is not empty")
}
