//! Quorum fetching of checkpoints and reconciliation of disagreeing ones.

mod errors;
mod quorum;
mod resolver;

pub use errors::{BranchError, ResolveError};
pub use quorum::{QuorumFetcher, DEFAULT_RETRY_PAUSE};
pub use resolver::{
    commitments_agree, BranchOutcome, ConsistencyResolver, Reconciliation, Resolution,
};
