//! State commitment carried by checkpoints.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

/// Root of the balance accumulator as claimed (or derived) for a block.
///
/// Transported as standard base64. Two commitments are the same iff their bytes are.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Commitment(Vec<u8>);

impl Commitment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decodes a base64 commitment as served by committee indexers.
    pub fn from_base64(s: &str) -> Result<Self, ParseError> {
        STANDARD
            .decode(s.trim())
            .map(Self)
            .map_err(|e| ParseError::InvalidBase64 {
                field: "commitment",
                reason: e.to_string(),
            })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Commitment {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_base64())
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_transport_form() {
        let c = Commitment::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(c.to_string(), "3q2+7w==");
        assert_eq!(Commitment::from_base64("3q2+7w==").unwrap(), c);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = Commitment::from_base64("not base64!").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidBase64 {
                field: "commitment",
                ..
            }
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let c = Commitment::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"AQID\"");
        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
