use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{commitment::Commitment, source::SourceDescriptor};

/// A committee indexer's claim about the meta-protocol state at one block.
///
/// Wire form uses camelCase keys and a decimal-string height.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    commitment: Commitment,
    hash: String,
    #[serde_as(as = "DisplayFromStr")]
    height: u64,
    meta_protocol: String,
    name: String,
    url: String,
    version: String,
}

impl Checkpoint {
    pub fn new(
        commitment: Commitment,
        hash: impl Into<String>,
        height: u64,
        meta_protocol: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            commitment,
            hash: hash.into(),
            height,
            meta_protocol: meta_protocol.into(),
            name: name.into(),
            url: url.into(),
            version: version.into(),
        }
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn meta_protocol(&self) -> &str {
        &self.meta_protocol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL of the committee indexer API that produced this checkpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this checkpoint is for the given block, comparing the hash case-insensitively.
    pub fn is_for_block(&self, height: u64, hash: &str) -> bool {
        self.height == height && self.hash.eq_ignore_ascii_case(hash)
    }
}

/// A checkpoint attributed to the source that served it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointExport {
    checkpoint: Checkpoint,
    source: SourceDescriptor,
}

impl CheckpointExport {
    pub fn new(checkpoint: Checkpoint, source: SourceDescriptor) -> Self {
        Self { checkpoint, source }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn commitment(&self) -> &Commitment {
        self.checkpoint.commitment()
    }

    pub fn height(&self) -> u64 {
        self.checkpoint.height()
    }

    pub fn hash(&self) -> &str {
        self.checkpoint.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE: &str = r#"{
        "commitment": "AQID",
        "hash": "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054",
        "height": "840000",
        "metaProtocol": "brc-20",
        "name": "alpha",
        "url": "https://alpha.example.org",
        "version": "v0.1.0"
    }"#;

    #[test]
    fn test_decodes_committee_wire_form() {
        let ckpt: Checkpoint = serde_json::from_str(WIRE).unwrap();
        assert_eq!(ckpt.height(), 840_000);
        assert_eq!(ckpt.commitment().as_bytes(), &[1, 2, 3]);
        assert_eq!(ckpt.meta_protocol(), "brc-20");
        assert_eq!(ckpt.url(), "https://alpha.example.org");

        let back = serde_json::to_value(&ckpt).unwrap();
        assert_eq!(back["height"], serde_json::json!("840000"));
        assert_eq!(back["metaProtocol"], serde_json::json!("brc-20"));
    }

    #[test]
    fn test_rejects_numeric_garbage_height() {
        let bad = WIRE.replace("\"840000\"", "\"84x\"");
        assert!(serde_json::from_str::<Checkpoint>(&bad).is_err());
    }

    #[test]
    fn test_is_for_block_ignores_hash_case() {
        let ckpt: Checkpoint = serde_json::from_str(WIRE).unwrap();
        assert!(ckpt.is_for_block(
            840_000,
            "00000000000000000002A7C4C1E48D76C5A37902165A270156B7A8D72728A054"
        ));
        assert!(!ckpt.is_for_block(840_001, ckpt.hash()));
    }
}
