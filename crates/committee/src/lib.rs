//! Client for the committee indexer's verifiable state-proof API.

mod client;
mod errors;
mod http;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub use client::MockCommitteeClient;
pub use client::CommitteeClient;
pub use errors::CommitteeError;
pub use http::{HttpCommitteeClient, LATEST_STATE_PROOF_PATH};
pub use types::{LatestStateProof, LatestStateProofResponse, LatestStateProofResult};
