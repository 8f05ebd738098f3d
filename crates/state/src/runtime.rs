use std::{fmt, sync::Arc, time::Duration};

use light_commitment::CommitmentOracle;
use light_denylist::DenylistSink;
use light_primitives::{CheckpointExport, DenylistEntry};
use light_reconciler::{commitments_agree, ConsistencyResolver, QuorumFetcher};
use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::*;

use crate::{
    errors::UpdateError,
    status::{AtomicStatus, Status},
};

/// Capacity of the status transition channel.
const STATUS_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
struct Checkpoints {
    /// Trusted checkpoint of the block before the current one.
    previous: CheckpointExport,
    /// Checkpoints of the current block. Slot 0 is authoritative.
    current: Vec<CheckpointExport>,
}

/// Trusted checkpoints and readiness status shared between the poller and the API layer.
///
/// Readers never wait on network I/O: the checkpoint lock is only held to copy or swap
/// values, and the status is a lock-free scalar. [`update_checkpoints`](Self::update_checkpoints)
/// calls are serialized.
pub struct RuntimeState<O> {
    fetcher: QuorumFetcher,
    resolver: ConsistencyResolver<O>,
    denylist: Arc<dyn DenylistSink>,
    fetch_timeout: Duration,
    checkpoints: RwLock<Checkpoints>,
    status: AtomicStatus,
    status_tx: broadcast::Sender<Status>,
    update_lock: Mutex<()>,
}

impl<O> fmt::Debug for RuntimeState<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeState")
            .field("status", &self.status)
            .field("checkpoints", &self.checkpoints)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl<O: CommitmentOracle> RuntimeState<O> {
    /// Creates the state from the last known-good checkpoints. The first one also serves as
    /// the pre-state for the first reconciliation.
    pub fn new(
        bootstrap: Vec<CheckpointExport>,
        fetcher: QuorumFetcher,
        resolver: ConsistencyResolver<O>,
        denylist: Arc<dyn DenylistSink>,
        fetch_timeout: Duration,
    ) -> Result<Self, UpdateError> {
        let previous = bootstrap.first().cloned().ok_or(UpdateError::EmptyBootstrap)?;
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Ok(Self {
            fetcher,
            resolver,
            denylist,
            fetch_timeout,
            checkpoints: RwLock::new(Checkpoints {
                previous,
                current: bootstrap,
            }),
            status: AtomicStatus::new(Status::Syncing),
            status_tx,
            update_lock: Mutex::new(()),
        })
    }

    pub fn status(&self) -> Status {
        self.status.load()
    }

    /// Receives every status transition from now on.
    pub fn subscribe_status(&self) -> broadcast::Receiver<Status> {
        self.status_tx.subscribe()
    }

    pub fn current_height(&self) -> u64 {
        self.checkpoints.read().current[0].height()
    }

    /// The authoritative checkpoint of the current block.
    pub fn current_checkpoint(&self) -> CheckpointExport {
        self.checkpoints.read().current[0].clone()
    }

    /// Checkpoints of the current block, authoritative one first.
    ///
    /// After an agreeing round this is every answer of the quorum. After a reconciled round it
    /// is the trusted checkpoint plus the answers that agree with it, which may be fewer than
    /// the minimal quorum even while the status is [`Status::Active`].
    pub fn current_checkpoints(&self) -> Vec<CheckpointExport> {
        self.checkpoints.read().current.clone()
    }

    pub fn last_checkpoint(&self) -> CheckpointExport {
        self.checkpoints.read().previous.clone()
    }

    fn set_status(&self, status: Status) -> Status {
        let prev = self.status.swap(status);
        if prev != status {
            debug!(from = %prev, to = %status, "status changed");
        }
        // No subscribers is fine.
        let _ = self.status_tx.send(status);
        prev
    }

    fn publish(&self, current: Vec<CheckpointExport>) {
        let mut guard = self.checkpoints.write();
        let last = guard.current[0].clone();
        guard.previous = last;
        guard.current = current;
    }

    /// Fetches and, if needed, reconciles the checkpoints of block `height` with hash `hash`,
    /// then publishes the trusted result.
    ///
    /// On failure, or when the returned future is dropped before completing, the published
    /// checkpoints are left untouched and the status goes back to [`Status::Active`] only if it
    /// was active before.
    pub async fn update_checkpoints(&self, height: u64, hash: &str) -> Result<(), UpdateError> {
        let _guard = self.update_lock.lock().await;

        let was = self.set_status(Status::Syncing);
        let mut rollback = StatusRollback {
            state: self,
            was,
            armed: true,
        };
        let res = self.fetch_and_resolve(height, hash).await;
        match &res {
            Ok(()) => rollback.armed = false,
            Err(err) => warn!(%height, %hash, %err, "checkpoint update failed"),
        }
        res
    }

    async fn fetch_and_resolve(&self, height: u64, hash: &str) -> Result<(), UpdateError> {
        let results = self
            .fetcher
            .fetch_all(height, hash, self.fetch_timeout)
            .await;
        self.resolver.ensure_quorum(&results)?;

        if commitments_agree(&results) {
            let commitment = results[0].commitment().clone();
            self.publish(results);
            self.set_status(Status::Active);
            info!(%height, %hash, %commitment, "checkpoints are consistent");
            return Ok(());
        }

        self.set_status(Status::Verifying);
        let pre_state = self.current_checkpoint();
        let rec = self.resolver.reconcile(&results, &pre_state).await?;

        // Keep the answers that agree with the trusted commitment, representative first.
        let mut current = vec![rec.trusted.clone()];
        current.extend(
            results
                .into_iter()
                .filter(|r| r.commitment() == rec.trusted.commitment() && *r != rec.trusted),
        );
        self.publish(current);
        self.set_status(Status::Active);
        info!(%height, %hash, commitment = %rec.trusted.commitment(), "checkpoints verified");

        self.record_denials(&rec.denylist).await;
        Ok(())
    }

    async fn record_denials(&self, entries: &[DenylistEntry]) {
        for entry in entries {
            if let Err(err) = self.denylist.append(entry).await {
                error!(source = %entry.source, %err, "failed to append to denylist");
            }
        }
    }
}

/// Restores the status of a round that did not complete, whether it failed or was cancelled.
struct StatusRollback<'a, O: CommitmentOracle> {
    state: &'a RuntimeState<O>,
    was: Status,
    armed: bool,
}

impl<O: CommitmentOracle> Drop for StatusRollback<'_, O> {
    fn drop(&mut self) {
        if self.armed {
            self.state.set_status(if self.was.is_active() {
                Status::Active
            } else {
                Status::Syncing
            });
        }
    }
}
