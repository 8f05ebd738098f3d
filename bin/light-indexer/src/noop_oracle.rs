use light_commitment::{CommitmentOracle, OracleError, OracleResult};
use light_primitives::{Commitment, OrdTransfer, StateProof};

/// [`CommitmentOracle`] that cannot check anything. Every reconciliation branch fails with
/// [`OracleError::Unavailable`], so a disagreeing quorum is never resolved. To be replaced once
/// the commitment scheme is linked in.
#[derive(Debug, Default)]
pub(crate) struct NoopCommitmentOracle;

impl CommitmentOracle for NoopCommitmentOracle {
    type PartialTree = ();

    fn reconstruct_pre_state(
        &self,
        _proof: &StateProof,
        _pre_commitment: &Commitment,
    ) -> OracleResult<()> {
        Err(OracleError::Unavailable)
    }

    fn verify_proof(&self, _proof: &StateProof, _tree: &()) -> OracleResult<()> {
        Err(OracleError::Unavailable)
    }

    fn apply_transfers(
        &self,
        _tree: (),
        _transfers: &[OrdTransfer],
        _height: u64,
    ) -> OracleResult<Commitment> {
        Err(OracleError::Unavailable)
    }
}
