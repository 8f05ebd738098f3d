//! Configuration model for the light indexer.

mod config;
mod errors;

pub use config::{
    BitcoindConfig, CommitteeIndexersConfig, Config, DaSourceConfig, LoggingConfig,
    S3SourceConfig, TieBreak, VerificationConfig,
};
pub use errors::ConfigError;
