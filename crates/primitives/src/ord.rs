//! Ordinal transfer claims and the identifiers they reference.

use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine};
use bitcoin::{OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// `<txid>i<index>`: the `index`-th inscription revealed by transaction `txid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InscriptionId {
    pub txid: Txid,
    pub index: u32,
}

impl InscriptionId {
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.txid, self.index)
    }
}

impl FromStr for InscriptionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidInscriptionId(s.to_owned());
        let (txid, index) = s.rsplit_once('i').ok_or_else(invalid)?;
        let txid = Txid::from_str(txid).map_err(|_| invalid())?;
        let index = index.parse().map_err(|_| invalid())?;
        Ok(Self { txid, index })
    }
}

/// `<txid>:<vout>:<offset>`: a satoshi located `offset` sats into output `vout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatPoint {
    pub outpoint: OutPoint,
    pub offset: u64,
}

impl SatPoint {
    pub fn new(outpoint: OutPoint, offset: u64) -> Self {
        Self { outpoint, offset }
    }
}

impl fmt::Display for SatPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.outpoint, self.offset)
    }
}

impl FromStr for SatPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidSatPoint(s.to_owned());
        let (outpoint, offset) = s.rsplit_once(':').ok_or_else(invalid)?;
        let outpoint = OutPoint::from_str(outpoint).map_err(|_| invalid())?;
        let offset = offset.parse().map_err(|_| invalid())?;
        Ok(Self { outpoint, offset })
    }
}

/// Transfer claim exactly as served by a committee indexer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrdTransfer {
    #[serde(alias = "inscription_id", alias = "inscriptionID")]
    pub inscription_id: String,
    #[serde(default, alias = "old_satpoint")]
    pub old_satpoint: Option<String>,
    #[serde(alias = "new_satpoint")]
    pub new_satpoint: String,
    /// Hex-encoded output script.
    #[serde(alias = "new_pkscript")]
    pub new_pkscript: String,
    #[serde(alias = "new_wallet")]
    pub new_wallet: String,
    #[serde(default, alias = "sent_as_fee")]
    pub sent_as_fee: bool,
    /// Base64 inscription body.
    #[serde(default)]
    pub content: String,
    /// Hex-encoded content type.
    #[serde(default, alias = "content_type")]
    pub content_type: String,
}

/// A structurally valid transfer claim, still unverified against the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdTransfer {
    pub inscription_id: InscriptionId,
    pub old_satpoint: Option<SatPoint>,
    pub new_satpoint: SatPoint,
    pub new_pkscript: ScriptBuf,
    pub new_wallet: String,
    pub sent_as_fee: bool,
    pub content: Vec<u8>,
    pub content_type: Vec<u8>,
}

impl TryFrom<RawOrdTransfer> for OrdTransfer {
    type Error = ParseError;

    fn try_from(raw: RawOrdTransfer) -> Result<Self, Self::Error> {
        let inscription_id = raw.inscription_id.parse()?;
        let old_satpoint = match raw.old_satpoint.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse()?),
        };
        let new_satpoint = raw.new_satpoint.parse()?;

        if raw.new_pkscript.is_empty() {
            return Err(ParseError::MissingField("new_pkscript"));
        }
        if raw.new_wallet.is_empty() {
            return Err(ParseError::MissingField("new_wallet"));
        }

        let new_pkscript = hex::decode(&raw.new_pkscript)
            .map(ScriptBuf::from_bytes)
            .map_err(|e| ParseError::InvalidHex {
                field: "new_pkscript",
                reason: e.to_string(),
            })?;
        let content_type = hex::decode(&raw.content_type).map_err(|e| ParseError::InvalidHex {
            field: "content_type",
            reason: e.to_string(),
        })?;
        let content = STANDARD
            .decode(&raw.content)
            .map_err(|e| ParseError::InvalidBase64 {
                field: "content",
                reason: e.to_string(),
            })?;

        Ok(Self {
            inscription_id,
            old_satpoint,
            new_satpoint,
            new_pkscript,
            new_wallet: raw.new_wallet,
            sent_as_fee: raw.sent_as_fee,
            content,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799";

    fn raw() -> RawOrdTransfer {
        RawOrdTransfer {
            inscription_id: format!("{TXID}i0"),
            old_satpoint: Some(String::new()),
            new_satpoint: format!("{TXID}:1:330"),
            new_pkscript: "5120".to_owned() + &"11".repeat(32),
            new_wallet: "bc1p...".into(),
            sent_as_fee: false,
            content: "eyJwIjoiYnJjLTIwIn0=".into(),
            content_type: hex::encode("text/plain;charset=utf-8"),
        }
    }

    #[test]
    fn test_parse_ids() {
        let id: InscriptionId = format!("{TXID}i12").parse().unwrap();
        assert_eq!(id.index, 12);
        assert_eq!(id.to_string(), format!("{TXID}i12"));

        let sp: SatPoint = format!("{TXID}:3:5000").parse().unwrap();
        assert_eq!(sp.outpoint.vout, 3);
        assert_eq!(sp.offset, 5000);
        assert_eq!(sp.to_string(), format!("{TXID}:3:5000"));
    }

    #[test]
    fn test_parse_ids_rejects_malformed() {
        assert!(InscriptionId::from_str(TXID).is_err());
        assert!(InscriptionId::from_str("abci0").is_err());
        assert!(SatPoint::from_str(&format!("{TXID}:3")).is_err());
        assert!(SatPoint::from_str(&format!("{TXID}:x:1")).is_err());
    }

    #[test]
    fn test_try_from_raw() {
        let t = OrdTransfer::try_from(raw()).unwrap();
        assert!(t.old_satpoint.is_none());
        assert_eq!(t.new_satpoint.offset, 330);
        assert_eq!(t.new_pkscript.len(), 34);
        assert_eq!(t.content, br#"{"p":"brc-20"}"#);
        assert_eq!(t.content_type, b"text/plain;charset=utf-8");
    }

    #[test]
    fn test_try_from_raw_structural_failures() {
        let mut r = raw();
        r.new_wallet.clear();
        assert_eq!(
            OrdTransfer::try_from(r).unwrap_err(),
            ParseError::MissingField("new_wallet")
        );

        let mut r = raw();
        r.new_pkscript = "zz".into();
        assert!(matches!(
            OrdTransfer::try_from(r),
            Err(ParseError::InvalidHex {
                field: "new_pkscript",
                ..
            })
        ));

        let mut r = raw();
        r.old_satpoint = Some("garbage".into());
        assert!(matches!(
            OrdTransfer::try_from(r),
            Err(ParseError::InvalidSatPoint(_))
        ));
    }

    #[test]
    fn test_raw_accepts_snake_case_keys() {
        let json = format!(
            r#"{{"inscription_id":"{TXID}i0","new_satpoint":"{TXID}:0:0","new_pkscript":"0014","new_wallet":"w","sent_as_fee":true}}"#
        );
        let r: RawOrdTransfer = serde_json::from_str(&json).unwrap();
        assert!(r.sent_as_fee);
        assert!(r.old_satpoint.is_none());
    }
}
