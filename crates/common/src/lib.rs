//! Ambient plumbing shared by the light indexer crates: logging setup and retry policy.

pub mod logging;
pub mod retry;

pub use retry::{retry_with_backoff, RetryConfig};
