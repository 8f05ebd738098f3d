use thiserror::Error;

pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("cannot reconstruct pre-state: {0}")]
    Reconstruct(String),

    #[error("proof does not verify: {0}")]
    InvalidProof(String),

    #[error("applying transfers: {0}")]
    Apply(String),

    #[error("no commitment scheme is linked")]
    Unavailable,
}
