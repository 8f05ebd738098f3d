//! Independent re-derivation of ordinal transfers from Bitcoin blocks.

pub mod envelope;
mod errors;
mod verifier;

pub use errors::OrdVerifyError;
#[cfg(any(test, feature = "test-utils"))]
pub use verifier::MockTransferVerifier;
pub use verifier::{OrdTransferVerifier, TransferVerifier};
