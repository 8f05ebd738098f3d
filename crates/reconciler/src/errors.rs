use std::time::Duration;

use light_commitment::OracleError;
use light_ord::OrdVerifyError;
use light_primitives::{Commitment, ParseError};
use thiserror::Error;

/// Failures that end a whole resolution round.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("insufficient quorum: {got} of {required} sources answered")]
    InsufficientQuorum { required: usize, got: usize },

    #[error("all {candidates} candidate commitments at height {height} were rejected")]
    AllCandidatesRejected { height: u64, candidates: usize },

    #[error("{0} surviving candidates tie on transfer count")]
    Tie(usize),
}

/// Why one candidate commitment was not trusted.
#[derive(Debug, Clone, Error)]
pub enum BranchError {
    #[error("fetching state proof: {0}")]
    Committee(String),

    #[error("committee reported: {0}")]
    Protocol(String),

    #[error("malformed transfer claim: {0}")]
    Claim(#[from] ParseError),

    #[error("transfer verification: {0}")]
    Transfers(#[from] OrdVerifyError),

    #[error("commitment oracle: {0}")]
    Oracle(#[from] OracleError),

    #[error("derived commitment {derived} differs from claimed {claimed}")]
    Mismatch {
        claimed: Commitment,
        derived: Commitment,
    },

    #[error("branch exceeded {0:?}")]
    Timeout(Duration),
}
