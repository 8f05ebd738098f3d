use light_primitives::{Commitment, OrdTransfer, StateProof};

use crate::errors::OracleResult;

/// Commitment scheme operations needed to re-derive a post-state root.
pub trait CommitmentOracle: Send + Sync {
    /// Minimal subtree of the pre-state implied by a proof.
    type PartialTree: Send;

    /// Rebuilds the part of the pre-state the proof touches, rooted at `pre_commitment`.
    fn reconstruct_pre_state(
        &self,
        proof: &StateProof,
        pre_commitment: &Commitment,
    ) -> OracleResult<Self::PartialTree>;

    /// Checks the proof is internally consistent with the reconstructed subtree.
    fn verify_proof(&self, proof: &StateProof, tree: &Self::PartialTree) -> OracleResult<()>;

    /// Applies verified transfers at `height` and returns the resulting root.
    fn apply_transfers(
        &self,
        tree: Self::PartialTree,
        transfers: &[OrdTransfer],
        height: u64,
    ) -> OracleResult<Commitment>;
}

/// Runs the three oracle steps in order.
pub fn derive_post_commitment<O: CommitmentOracle + ?Sized>(
    oracle: &O,
    proof: &StateProof,
    pre_commitment: &Commitment,
    transfers: &[OrdTransfer],
    height: u64,
) -> OracleResult<Commitment> {
    let tree = oracle.reconstruct_pre_state(proof, pre_commitment)?;
    oracle.verify_proof(proof, &tree)?;
    oracle.apply_transfers(tree, transfers, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::ScriptedOracle, OracleError};

    #[test]
    fn test_derive_follows_script() {
        let pre = Commitment::new(vec![1]);
        let post = Commitment::new(vec![2]);
        let proof = StateProof::new(vec![0xaa]);
        let oracle = ScriptedOracle::new(pre.clone()).with_transition(proof.clone(), post.clone());

        assert_eq!(
            derive_post_commitment(&oracle, &proof, &pre, &[], 840_000).unwrap(),
            post
        );
    }

    #[test]
    fn test_wrong_pre_state_is_rejected() {
        let proof = StateProof::new(vec![0xaa]);
        let oracle = ScriptedOracle::new(Commitment::new(vec![1]))
            .with_transition(proof.clone(), Commitment::new(vec![2]));

        let err =
            derive_post_commitment(&oracle, &proof, &Commitment::new(vec![9]), &[], 1).unwrap_err();
        assert!(matches!(err, OracleError::Reconstruct(_)));
    }

    #[test]
    fn test_unknown_proof_is_invalid() {
        let pre = Commitment::new(vec![1]);
        let oracle = ScriptedOracle::new(pre.clone());
        let err =
            derive_post_commitment(&oracle, &StateProof::new(vec![3]), &pre, &[], 1).unwrap_err();
        assert!(matches!(err, OracleError::InvalidProof(_)));
    }
}
