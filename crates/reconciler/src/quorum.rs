use std::{fmt, sync::Arc, time::Duration};

use light_checkpoint_source::CheckpointSource;
use light_primitives::CheckpointExport;
use tokio::{
    task::JoinSet,
    time::{self, Instant},
};
use tracing::*;

/// Pause between two fetch attempts against the same source within one round.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Fetches one block's checkpoint from every source concurrently under a shared deadline.
pub struct QuorumFetcher {
    sources: Vec<Arc<dyn CheckpointSource>>,
    retry_pause: Duration,
}

impl fmt::Debug for QuorumFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuorumFetcher")
            .field("sources", &self.sources.len())
            .field("retry_pause", &self.retry_pause)
            .finish()
    }
}

impl QuorumFetcher {
    pub fn new(sources: Vec<Arc<dyn CheckpointSource>>) -> Self {
        Self {
            sources,
            retry_pause: DEFAULT_RETRY_PAUSE,
        }
    }

    pub fn with_retry_pause(mut self, retry_pause: Duration) -> Self {
        self.retry_pause = retry_pause;
        self
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    /// Returns the checkpoints of every source that answered before `timeout` elapsed, in
    /// source order.
    ///
    /// Fewer answers than sources is not an error. Dropping the future aborts all outstanding
    /// fetches.
    pub async fn fetch_all(&self, height: u64, hash: &str, timeout: Duration) -> Vec<CheckpointExport> {
        let deadline = Instant::now() + timeout;
        let mut tasks = JoinSet::new();

        for (idx, source) in self.sources.iter().enumerate() {
            let source = source.clone();
            let hash = hash.to_owned();
            let pause = self.retry_pause;
            tasks.spawn(async move {
                let fetched =
                    time::timeout_at(deadline, fetch_until_success(source.as_ref(), height, &hash, pause))
                        .await;
                if fetched.is_err() {
                    warn!(source = %source.descriptor(), %height, "source did not answer before deadline");
                }
                (idx, fetched.ok())
            });
        }

        let mut answered = Vec::with_capacity(self.sources.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Some(export))) => answered.push((idx, export)),
                Ok((_, None)) => {}
                Err(err) => error!(%err, "checkpoint fetch task failed"),
            }
        }
        answered.sort_by_key(|(idx, _)| *idx);

        info!(%height, %hash, answered = answered.len(), sources = self.sources.len(), "quorum fetch finished");
        answered.into_iter().map(|(_, export)| export).collect()
    }
}

async fn fetch_until_success(
    source: &dyn CheckpointSource,
    height: u64,
    hash: &str,
    pause: Duration,
) -> CheckpointExport {
    loop {
        match source.fetch(height, hash).await {
            Ok(export) => return export,
            Err(err) => {
                debug!(source = %source.descriptor(), %height, %err, "checkpoint fetch failed, will retry");
                time::sleep(pause).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use light_checkpoint_source::{MockCheckpointSource, SourceError};
    use light_primitives::{Checkpoint, Commitment, S3Source, SourceDescriptor};
    use mockall::Sequence;
    use tokio::task;

    use super::*;

    const HASH: &str = "00000000000000000001b4b5c8e6a2d3c2f7a1e5d4c3b2a1908f7e6d5c4b3a29";

    fn descriptor(name: &str) -> SourceDescriptor {
        SourceDescriptor::S3(S3Source {
            region: "us-west-2".into(),
            bucket: "ckpts".into(),
            name: name.into(),
        })
    }

    fn export(name: &str) -> CheckpointExport {
        CheckpointExport::new(
            Checkpoint::new(
                Commitment::new(vec![0xaa]),
                HASH,
                840_000,
                "brc-20",
                name,
                "https://committee.example.org",
                "v0.1.0",
            ),
            descriptor(name),
        )
    }

    fn not_found() -> SourceError {
        SourceError::Status {
            url: "https://ckpts".into(),
            status: 404,
        }
    }

    fn answering(name: &'static str) -> Arc<dyn CheckpointSource> {
        let mut source = MockCheckpointSource::new();
        source.expect_descriptor().return_const(descriptor(name));
        source
            .expect_fetch()
            .returning(move |_, _| Ok(export(name)));
        Arc::new(source)
    }

    fn silent(name: &'static str) -> Arc<dyn CheckpointSource> {
        let mut source = MockCheckpointSource::new();
        source.expect_descriptor().return_const(descriptor(name));
        source.expect_fetch().returning(|_, _| Err(not_found()));
        Arc::new(source)
    }

    /// Fetches currently in flight against [`Stalled`] sources, and how many ever started.
    #[derive(Debug, Default)]
    struct InFlight {
        live: AtomicUsize,
        started: AtomicUsize,
    }

    struct LiveGuard(Arc<InFlight>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Source whose fetch never completes.
    struct Stalled {
        descriptor: SourceDescriptor,
        in_flight: Arc<InFlight>,
    }

    #[async_trait]
    impl CheckpointSource for Stalled {
        fn descriptor(&self) -> &SourceDescriptor {
            &self.descriptor
        }

        async fn fetch(&self, _height: u64, _hash: &str) -> Result<CheckpointExport, SourceError> {
            self.in_flight.started.fetch_add(1, Ordering::SeqCst);
            self.in_flight.live.fetch_add(1, Ordering::SeqCst);
            let _guard = LiveGuard(self.in_flight.clone());
            future::pending().await
        }
    }

    fn stalled(name: &str, in_flight: &Arc<InFlight>) -> Arc<dyn CheckpointSource> {
        Arc::new(Stalled {
            descriptor: descriptor(name),
            in_flight: in_flight.clone(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_fetch_aborts_outstanding_tasks() {
        let in_flight = Arc::new(InFlight::default());
        let fetcher = QuorumFetcher::new(vec![
            stalled("a", &in_flight),
            answering("b"),
            stalled("c", &in_flight),
        ]);

        let res = time::timeout(
            Duration::from_secs(1),
            fetcher.fetch_all(840_000, HASH, Duration::from_secs(60)),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(in_flight.started.load(Ordering::SeqCst), 2);

        // Aborted tasks drop their futures once the scheduler gets to them.
        for _ in 0..10 {
            if in_flight.live.load(Ordering::SeqCst) == 0 {
                break;
            }
            task::yield_now().await;
        }
        assert_eq!(in_flight.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_answers_in_source_order() {
        let fetcher = QuorumFetcher::new(vec![answering("a"), answering("b"), answering("c")]);
        let got = fetcher.fetch_all(840_000, HASH, Duration::from_secs(10)).await;
        let names: Vec<_> = got.iter().map(|e| e.checkpoint().name().to_owned()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_answers_after_deadline() {
        let fetcher = QuorumFetcher::new(vec![silent("a"), answering("b"), silent("c")]);

        let started = Instant::now();
        let got = fetcher.fetch_all(840_000, HASH, Duration::from_secs(30)).await;

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].source(), &descriptor("b"));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_failed_source_until_it_answers() {
        let mut source = MockCheckpointSource::new();
        let mut seq = Sequence::new();
        source.expect_descriptor().return_const(descriptor("a"));
        source
            .expect_fetch()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(not_found()));
        source
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(export("a")));

        let fetcher = QuorumFetcher::new(vec![Arc::new(source)]);
        let got = fetcher.fetch_all(840_000, HASH, Duration::from_secs(10)).await;
        assert_eq!(got, vec![export("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sources() {
        let got = QuorumFetcher::new(vec![]).fetch_all(1, HASH, Duration::from_secs(1)).await;
        assert!(got.is_empty());
    }
}
