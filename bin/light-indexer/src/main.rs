//! BRC-20 light indexer.
//!
//! Tracks the Bitcoin chain tip and keeps a trusted checkpoint of the BRC-20 balance state,
//! acquired from a committee of untrusted indexers and reconciled when they disagree.

mod args;
mod bootstrap;
mod errors;
mod noop_oracle;

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use args::Args;
use bitcoind_async_client::{Auth, Client};
use bootstrap::bootstrap_checkpoints;
use light_btcio::{BitcoindChainData, ChainDataProvider};
use light_checkpoint_source::{
    CheckpointSource, DaCheckpointSource, HttpDaNamespaceReader, S3CheckpointSource,
};
use light_committee::HttpCommitteeClient;
use light_common::logging;
use light_config::{Config, LoggingConfig};
use light_denylist::JsonLinesDenylist;
use light_ord::OrdTransferVerifier;
use light_primitives::{DaSource, S3Source};
use light_reconciler::{ConsistencyResolver, QuorumFetcher};
use light_state::{poller::checkpoint_poller_task, RuntimeState, Status};
use noop_oracle::NoopCommitmentOracle;
use tokio::{
    runtime::{Builder, Handle},
    signal,
    sync::broadcast::{self, error::RecvError},
};
use tracing::*;

/// Base service name reported to the logging backends.
const SERVICE_NAME: &str = "light-indexer";

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e:#}");

        return Err(e);
    }

    Ok(())
}

fn main_inner(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    // Start runtime for async IO tasks.
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("light-rt")
        .build()
        .context("init: build runtime")?;

    init_logging(runtime.handle(), &config.logging)?;

    prune_denylisted(&mut config, &args.deny)?;

    let res = runtime.block_on(run(config, &args.deny));
    logging::finalize();
    res
}

/// Sets up the logging system, entering the runtime so the OTLP exporter can spawn its tasks.
fn init_logging(rt: &Handle, lconf: &LoggingConfig) -> Result<()> {
    let service_name = logging::format_service_name(SERVICE_NAME, lconf.service_label.as_deref());
    let json = lconf.json_format.unwrap_or(false);

    let mut lconfig = logging::LoggerConfig::new(service_name)
        .with_service_version(env!("CARGO_PKG_VERSION").to_owned())
        .with_json_logging(json);

    if let Some(dir) = &lconf.log_dir {
        let prefix = lconf
            .log_file_prefix
            .clone()
            .unwrap_or_else(|| SERVICE_NAME.to_owned());
        lconfig = lconfig.with_file_logging(
            logging::FileLoggingConfig::new(dir.clone(), prefix).with_json_format(json),
        );
    }

    if let Some(url) = &lconf.otlp_url {
        lconfig = lconfig.with_otlp(logging::OtlpExportConfig::new(url.clone()));
    }

    {
        let _g = rt.enter();
        logging::init(lconfig)?;
    }

    info!(
        otlp = ?lconf.otlp_url,
        log_dir = ?lconf.log_dir,
        "logging initialized"
    );
    Ok(())
}

/// Drops sources convicted in the denylist file, then checks the quorum is still reachable.
fn prune_denylisted(config: &mut Config, deny_path: &Path) -> Result<()> {
    let entries = light_denylist::load(deny_path)
        .with_context(|| format!("loading denylist from {}", deny_path.display()))?;
    let removed = light_denylist::prune_sources(&mut config.committee_indexers, &entries);
    info!(entries = entries.len(), %removed, path = ?deny_path, "loaded denylist");

    config
        .check_quorum_reachable()
        .context("not enough sources left after applying the denylist")?;
    Ok(())
}

fn build_sources(config: &Config) -> Result<Vec<Arc<dyn CheckpointSource>>> {
    let v = &config.verification;
    let mut sources: Vec<Arc<dyn CheckpointSource>> =
        Vec::with_capacity(config.committee_indexers.len());

    for s3 in &config.committee_indexers.s3 {
        let source = S3CheckpointSource::new(
            S3Source {
                region: s3.region.clone(),
                bucket: s3.bucket.clone(),
                name: s3.name.clone(),
            },
            s3.endpoint.clone(),
            v.meta_protocol.clone(),
            v.fetch_timeout(),
            config.retry.clone(),
        )?;
        sources.push(Arc::new(source));
    }

    for da in &config.committee_indexers.da {
        let reader = HttpDaNamespaceReader::new(da.endpoint.clone(), v.fetch_timeout())?;
        let source = DaCheckpointSource::new(
            DaSource {
                network: da.network.clone(),
                namespace_id: da.namespace_id.clone(),
                name: da.name.clone(),
            },
            v.meta_protocol.clone(),
            Arc::new(reader),
            config.retry.clone(),
        );
        sources.push(Arc::new(source));
    }

    for source in &sources {
        debug!(source = %source.descriptor(), "configured checkpoint source");
    }
    Ok(sources)
}

async fn run(config: Config, deny_path: &Path) -> Result<()> {
    let v = &config.verification;

    let btc = &config.bitcoind;
    let client = Client::new(
        btc.rpc_url.clone(),
        Auth::UserPass(btc.rpc_user.clone(), btc.rpc_password.clone()),
        None,
        None,
        None,
    )
    .map_err(|e| anyhow!("failed to create bitcoind client: {e}"))?;
    let chain: Arc<dyn ChainDataProvider> = Arc::new(BitcoindChainData::new(client));

    let fetcher = QuorumFetcher::new(build_sources(&config)?);
    let committee = Arc::new(HttpCommitteeClient::new(v.fetch_timeout())?);
    let verifier = Arc::new(OrdTransferVerifier::new(
        chain.clone(),
        btc.network,
        config.retry.clone(),
    ));
    let resolver = ConsistencyResolver::new(
        v.minimal_checkpoint,
        committee,
        verifier,
        Arc::new(NoopCommitmentOracle),
    )
    .with_branch_timeout(v.branch_timeout())
    .with_tie_break(v.tie_break);

    let bootstrap = bootstrap_checkpoints(chain.as_ref(), &fetcher, &resolver, v.fetch_timeout())
        .await
        .context("bootstrap")?;

    let denylist = Arc::new(JsonLinesDenylist::new(deny_path));
    let state = Arc::new(RuntimeState::new(
        bootstrap,
        fetcher,
        resolver,
        denylist,
        v.fetch_timeout(),
    )?);
    info!(height = state.current_height(), "runtime state ready");

    let status_logger = tokio::spawn(log_status_transitions(state.subscribe_status()));
    let mut poller = tokio::spawn(checkpoint_poller_task(
        state.clone(),
        chain,
        v.poll_interval(),
    ));

    let res = tokio::select! {
        sig = signal::ctrl_c() => {
            info!("shutting down");
            poller.abort();
            sig.context("listening for ctrl-c")
        }
        joined = &mut poller => {
            error!(status = %state.status(), "checkpoint poller exited");
            match joined {
                Ok(()) => Err(anyhow!("checkpoint poller exited")),
                Err(e) => Err(anyhow!("checkpoint poller failed: {e}")),
            }
        }
    };

    status_logger.abort();
    res
}

async fn log_status_transitions(mut rx: broadcast::Receiver<Status>) {
    loop {
        match rx.recv().await {
            Ok(status) => info!(%status, "indexer status changed"),
            Err(RecvError::Lagged(skipped)) => warn!(%skipped, "missed status transitions"),
            Err(RecvError::Closed) => break,
        }
    }
}
