use light_primitives::{RawOrdTransfer, StateProof};
use serde::{Deserialize, Serialize};

/// Response body of the latest state proof endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestStateProofResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<LatestStateProofResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestStateProofResult {
    #[serde(default)]
    pub proof: StateProof,
    #[serde(default)]
    pub ord_transfers: Vec<RawOrdTransfer>,
}

/// Claimed transfers for the indexer's latest block, plus the proof of the state transition
/// they cause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestStateProof {
    pub error: Option<String>,
    pub transfers: Vec<RawOrdTransfer>,
    pub proof: StateProof,
}

impl From<LatestStateProofResponse> for LatestStateProof {
    fn from(resp: LatestStateProofResponse) -> Self {
        let result = resp.result.unwrap_or_default();
        Self {
            error: resp.error,
            transfers: result.ord_transfers,
            proof: result.proof,
        }
    }
}
