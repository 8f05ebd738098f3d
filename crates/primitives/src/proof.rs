use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

/// Opaque proof of a pre to post state transition, as served by a committee indexer.
///
/// Only the commitment oracle interprets the bytes.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct StateProof(Vec<u8>);

impl StateProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_base64(s: &str) -> Result<Self, ParseError> {
        STANDARD
            .decode(s.trim())
            .map(Self)
            .map_err(|e| ParseError::InvalidBase64 {
                field: "proof",
                reason: e.to_string(),
            })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StateProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateProof({} bytes)", self.0.len())
    }
}

impl Serialize for StateProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for StateProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_payload() {
        let proof = StateProof::new(vec![7; 96]);
        assert_eq!(format!("{proof:?}"), "StateProof(96 bytes)");
    }

    #[test]
    fn test_decode_error_names_field() {
        let err = serde_json::from_str::<StateProof>("\"%%\"").unwrap_err();
        assert!(err.to_string().contains("proof"));
    }
}
