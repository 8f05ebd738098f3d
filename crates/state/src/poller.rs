//! Drives [`RuntimeState::update_checkpoints`] from the Bitcoin chain tip.

use std::{sync::Arc, time::Duration};

use light_btcio::ChainDataProvider;
use light_commitment::CommitmentOracle;
use tokio::time::{self, MissedTickBehavior};
use tracing::*;

use crate::{errors::UpdateError, runtime::RuntimeState};

/// Polls the chain tip every `interval` and updates `state` when a new block appears.
///
/// Failed rounds are logged and retried on the next tick. Never returns.
pub async fn checkpoint_poller_task<O: CommitmentOracle>(
    state: Arc<RuntimeState<O>>,
    chain: Arc<dyn ChainDataProvider>,
    interval: Duration,
) {
    info!(?interval, "started checkpoint poller");
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = poll_once(&state, chain.as_ref()).await {
            warn!(%err, "checkpoint poll failed");
        }
    }
}

/// Runs one poll. Returns whether an update was performed.
pub async fn poll_once<O: CommitmentOracle>(
    state: &RuntimeState<O>,
    chain: &dyn ChainDataProvider,
) -> Result<bool, UpdateError> {
    let height = chain.latest_height().await?;
    let hash = chain.block_hash(height).await?.to_string();

    if state.status().is_active() && state.current_checkpoint().checkpoint().is_for_block(height, &hash) {
        trace!(%height, "chain tip unchanged");
        return Ok(false);
    }

    debug!(%height, %hash, "new chain tip, updating checkpoints");
    state.update_checkpoints(height, &hash).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::BlockHash;
    use light_btcio::{ChainDataError, MockChainDataProvider};
    use light_commitment::test_utils::ScriptedOracle;
    use light_committee::MockCommitteeClient;
    use light_denylist::MockDenylistSink;

    use super::*;
    use crate::{test_utils::*, Status};

    fn chain_at(height: u64, hash: &'static str) -> MockChainDataProvider {
        let mut chain = MockChainDataProvider::new();
        chain.expect_latest_height().returning(move || Ok(height));
        chain
            .expect_block_hash()
            .returning(move |_| Ok(BlockHash::from_str(hash).unwrap()));
        chain
    }

    fn agreeing_state() -> RuntimeState<ScriptedOracle> {
        let mut client = MockCommitteeClient::new();
        client.expect_latest_state_proof().never();
        let mut sink = MockDenylistSink::new();
        sink.expect_append().never();
        runtime_state(vec![source("a", 1), source("b", 1)], client, oracle(&[]), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_on_new_tip_then_skips() {
        let state = agreeing_state();
        let chain = chain_at(HEIGHT, HASH);

        assert!(poll_once(&state, &chain).await.unwrap());
        assert_eq!(state.status(), Status::Active);
        assert_eq!(state.current_height(), HEIGHT);

        assert!(!poll_once(&state, &chain).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_error_is_reported() {
        let state = agreeing_state();
        let mut chain = MockChainDataProvider::new();
        chain
            .expect_latest_height()
            .returning(|| Err(ChainDataError::Rpc("connection refused".into())));

        let err = poll_once(&state, &chain).await.unwrap_err();
        assert!(matches!(err, UpdateError::Chain(ChainDataError::Rpc(_))));
        assert_eq!(state.status(), Status::Syncing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_task_reaches_active() {
        let state = Arc::new(agreeing_state());
        let chain: Arc<dyn ChainDataProvider> = Arc::new(chain_at(HEIGHT, HASH));

        let task = tokio::spawn(checkpoint_poller_task(
            state.clone(),
            chain,
            Duration::from_secs(10),
        ));
        time::sleep(Duration::from_secs(25)).await;
        task.abort();

        assert_eq!(state.status(), Status::Active);
        assert_eq!(state.current_height(), HEIGHT);
    }
}
