use thiserror::Error;

/// Errors raised while decoding the textual forms used by committee indexers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid inscription id: {0}")]
    InvalidInscriptionId(String),

    #[error("invalid satpoint: {0}")]
    InvalidSatPoint(String),

    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("invalid base64 in {field}: {reason}")]
    InvalidBase64 { field: &'static str, reason: String },

    #[error("missing {0}")]
    MissingField(&'static str),
}
