//! Scripted commitment oracle for tests of code that drives a [`CommitmentOracle`].

use std::collections::HashMap;

use light_primitives::{Commitment, OrdTransfer, StateProof};

use crate::{errors::OracleResult, CommitmentOracle, OracleError};

/// Oracle whose transitions are declared up front.
///
/// The pre-state must equal the configured one, and each known proof maps to a fixed post
/// commitment. Any other proof fails verification.
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    pre_state: Commitment,
    transitions: HashMap<Vec<u8>, Commitment>,
}

impl ScriptedOracle {
    pub fn new(pre_state: Commitment) -> Self {
        Self {
            pre_state,
            transitions: HashMap::new(),
        }
    }

    pub fn with_transition(mut self, proof: StateProof, post: Commitment) -> Self {
        self.transitions.insert(proof.as_bytes().to_vec(), post);
        self
    }
}

/// Pre-state accepted by a [`ScriptedOracle`], with the post-state its proof leads to.
#[derive(Debug, Clone)]
pub struct ScriptedTree {
    post: Option<Commitment>,
}

impl CommitmentOracle for ScriptedOracle {
    type PartialTree = ScriptedTree;

    fn reconstruct_pre_state(
        &self,
        proof: &StateProof,
        pre_commitment: &Commitment,
    ) -> OracleResult<ScriptedTree> {
        if *pre_commitment != self.pre_state {
            return Err(OracleError::Reconstruct(format!(
                "unexpected pre-state {pre_commitment}"
            )));
        }
        Ok(ScriptedTree {
            post: self.transitions.get(proof.as_bytes()).cloned(),
        })
    }

    fn verify_proof(&self, proof: &StateProof, tree: &ScriptedTree) -> OracleResult<()> {
        match tree.post {
            Some(_) => Ok(()),
            None => Err(OracleError::InvalidProof(format!("{proof:?} is not scripted"))),
        }
    }

    fn apply_transfers(
        &self,
        tree: ScriptedTree,
        _transfers: &[OrdTransfer],
        _height: u64,
    ) -> OracleResult<Commitment> {
        tree.post
            .ok_or_else(|| OracleError::Apply("no scripted transition".to_owned()))
    }
}
