//! Data model shared by the checkpoint acquisition and reconciliation crates.

pub mod checkpoint;
pub mod commitment;
pub mod denylist;
pub mod errors;
pub mod ord;
pub mod proof;
pub mod source;

pub use checkpoint::{Checkpoint, CheckpointExport};
pub use commitment::Commitment;
pub use denylist::{DenylistEntry, Evidence};
pub use errors::ParseError;
pub use ord::{InscriptionId, OrdTransfer, RawOrdTransfer, SatPoint};
pub use proof::StateProof;
pub use source::{DaSource, S3Source, SourceDescriptor};
