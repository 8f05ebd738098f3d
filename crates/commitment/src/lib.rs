//! Interface to the balance accumulator's commitment scheme.
//!
//! The scheme itself lives outside this workspace. The
//! reconciler only needs to turn a trusted pre-state commitment, a proof, and a verified set
//! of transfers into a post-state commitment it can compare against a claim.

mod errors;
mod oracle;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{OracleError, OracleResult};
pub use oracle::{derive_post_commitment, CommitmentOracle};
