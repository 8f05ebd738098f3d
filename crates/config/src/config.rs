use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use bitcoin::Network;
use light_common::RetryConfig;
use light_primitives::{DaSource, S3Source, SourceDescriptor};
use serde::Deserialize;

use crate::errors::ConfigError;

/// Default value for `fetch_timeout_secs` in [`VerificationConfig`].
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// Default value for `poll_interval_secs` in [`VerificationConfig`].
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default value for `meta_protocol` in [`VerificationConfig`].
const DEFAULT_META_PROTOCOL: &str = "brc-20";

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_meta_protocol() -> String {
    DEFAULT_META_PROTOCOL.to_owned()
}

fn default_network() -> Network {
    Network::Bitcoin
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitcoindConfig {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    /// Network used when deriving wallet addresses from output scripts.
    #[serde(default = "default_network")]
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3SourceConfig {
    pub region: String,
    pub bucket: String,
    pub name: String,
    /// Overrides `https://{bucket}.s3.{region}.amazonaws.com`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl S3SourceConfig {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::S3(S3Source {
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            name: self.name.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DaSourceConfig {
    pub network: String,
    pub namespace_id: String,
    pub name: String,
    /// Base URL of the namespace query API.
    pub endpoint: String,
}

impl DaSourceConfig {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::Da(DaSource {
            network: self.network.clone(),
            namespace_id: self.namespace_id.clone(),
            name: self.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitteeIndexersConfig {
    #[serde(default)]
    pub s3: Vec<S3SourceConfig>,
    #[serde(default)]
    pub da: Vec<DaSourceConfig>,
}

impl CommitteeIndexersConfig {
    pub fn len(&self) -> usize {
        self.s3.len() + self.da.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every source whose descriptor `is_denied` accepts.
    pub fn retain_allowed(&mut self, is_denied: impl Fn(&SourceDescriptor) -> bool) {
        self.s3.retain(|s| !is_denied(&s.descriptor()));
        self.da.retain(|d| !is_denied(&d.descriptor()));
    }
}

/// How to pick among equally supported reconciliation candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The candidate whose commitment was seen first in the quorum wins.
    #[default]
    FirstSeen,
    /// A tie fails the round.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Minimal number of sources that must answer for a round to proceed.
    pub minimal_checkpoint: usize,

    #[serde(default = "default_meta_protocol")]
    pub meta_protocol: String,

    /// Shared deadline for one quorum fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Bound on each reconciliation branch. Unbounded when absent.
    #[serde(default)]
    pub branch_timeout_secs: Option<u64>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub tie_break: TieBreak,
}

impl VerificationConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn branch_timeout(&self) -> Option<Duration> {
        self.branch_timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Label appended to the service name (e.g. "prod").
    pub service_label: Option<String>,
    pub otlp_url: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_file_prefix: Option<String>,
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bitcoind: BitcoindConfig,

    #[serde(default)]
    pub committee_indexers: CommitteeIndexersConfig,

    pub verification: VerificationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.verification;
        if v.minimal_checkpoint == 0 {
            return Err(ConfigError::Invalid(
                "verification.minimal_checkpoint must be at least 1".into(),
            ));
        }
        if self.committee_indexers.is_empty() {
            return Err(ConfigError::Invalid(
                "no committee indexer sources configured".into(),
            ));
        }
        self.check_quorum_reachable()?;
        if v.meta_protocol.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "verification.meta_protocol is empty".into(),
            ));
        }
        if v.poll_interval_secs == 0 || v.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll interval and fetch timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Checks that the configured sources can still satisfy the minimal quorum.
    ///
    /// Run again after denylisted sources are pruned.
    pub fn check_quorum_reachable(&self) -> Result<(), ConfigError> {
        let have = self.committee_indexers.len();
        let need = self.verification.minimal_checkpoint;
        if have < need {
            return Err(ConfigError::Invalid(format!(
                "{have} sources configured, minimal_checkpoint is {need}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
        [bitcoind]
        rpc_url = "http://localhost:8332"
        rpc_user = "user"
        rpc_password = "pass"

        [[committee_indexers.s3]]
        region = "us-west-2"
        bucket = "nubit-modular-indexer-brc-20"
        name = "nubit-official-00"

        [[committee_indexers.da]]
        network = "Pre-Alpha Testnet"
        namespace_id = "0x00000003"
        name = "nubit-official-02"
        endpoint = "https://da.example.org"

        [verification]
        minimal_checkpoint = 2
        branch_timeout_secs = 300
        tie_break = "reject"

        [retry]
        max_retries = 5

        [logging]
        json_format = true
    "#;

    #[test]
    fn test_config_load() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.bitcoind.network, Network::Bitcoin);
        assert_eq!(config.committee_indexers.len(), 2);
        assert_eq!(config.committee_indexers.s3[0].endpoint, None);
        assert_eq!(config.verification.meta_protocol, "brc-20");
        assert_eq!(config.verification.fetch_timeout(), Duration::from_secs(120));
        assert_eq!(
            config.verification.branch_timeout(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(config.verification.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.verification.tie_break, TieBreak::Reject);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(config.logging.json_format, Some(true));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.verification.minimal_checkpoint, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/light.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate_rejects_unreachable_quorum() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.verification.minimal_checkpoint = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.verification.minimal_checkpoint = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.verification.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retain_allowed() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        let denied = config.committee_indexers.s3[0].descriptor();
        config.committee_indexers.retain_allowed(|d| *d == denied);
        assert!(config.committee_indexers.s3.is_empty());
        assert_eq!(config.committee_indexers.da.len(), 1);
        assert!(config.check_quorum_reachable().is_err());
    }
}
