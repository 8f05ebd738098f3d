use serde::{Deserialize, Serialize};

use crate::{commitment::Commitment, source::SourceDescriptor};

/// Proof that a source claimed a commitment other than the one that survived reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub height: u64,
    pub hash: String,
    pub correct_commitment: Commitment,
    pub fraud_commitment: Commitment,
}

/// One line of the append-only denylist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenylistEntry {
    pub evidence: Evidence,
    pub source: SourceDescriptor,
}

impl DenylistEntry {
    pub fn new(evidence: Evidence, source: SourceDescriptor) -> Self {
        Self { evidence, source }
    }
}
