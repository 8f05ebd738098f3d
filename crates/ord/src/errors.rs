use light_btcio::ChainDataError;
use light_primitives::InscriptionId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum OrdVerifyError {
    /// A batch with nothing to check is treated as malformed.
    #[error("empty transfer batch")]
    EmptyClaims,

    /// A claim could not be matched to anything the chain derives.
    #[error("invalid transfer {inscription_id}: {reason}")]
    InvalidTransfer {
        inscription_id: InscriptionId,
        reason: String,
    },

    /// A claim matched a derived location but disagrees on `field`.
    #[error("transfer {inscription_id} mismatch on {field}: claimed {claimed}, derived {derived}")]
    Mismatch {
        inscription_id: InscriptionId,
        field: &'static str,
        claimed: String,
        derived: String,
    },

    #[error("chain data: {0}")]
    ChainData(#[from] ChainDataError),
}

impl OrdVerifyError {
    pub(crate) fn invalid(inscription_id: InscriptionId, reason: impl Into<String>) -> Self {
        Self::InvalidTransfer {
            inscription_id,
            reason: reason.into(),
        }
    }
}
