use std::{fmt, sync::Arc, time::Duration};

use futures::future::join_all;
use light_commitment::{derive_post_commitment, CommitmentOracle};
use light_committee::CommitteeClient;
use light_config::TieBreak;
use light_ord::TransferVerifier;
use light_primitives::{
    CheckpointExport, Commitment, DenylistEntry, Evidence, OrdTransfer, SourceDescriptor,
};
use tokio::time;
use tracing::*;

use crate::errors::{BranchError, ResolveError};

/// Whether every checkpoint claims the same commitment.
pub fn commitments_agree(results: &[CheckpointExport]) -> bool {
    results
        .windows(2)
        .all(|w| w[0].commitment() == w[1].commitment())
}

/// Result of re-deriving one candidate commitment.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    pub commitment: Commitment,
    pub source: SourceDescriptor,
    /// Number of verified transfers on success.
    pub result: Result<usize, BranchError>,
}

impl BranchOutcome {
    pub fn transfer_count(&self) -> Option<usize> {
        self.result.as_ref().ok().copied()
    }
}

/// Outcome of a disagreement round.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Representative checkpoint of the winning commitment.
    pub trusted: CheckpointExport,
    /// One outcome per distinct commitment, in first-seen order.
    pub branches: Vec<BranchOutcome>,
    /// Entries against every source that claimed a losing commitment.
    pub denylist: Vec<DenylistEntry>,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    /// All sources agreed; the checkpoints are returned unchanged.
    Agreed(Vec<CheckpointExport>),
    Reconciled(Reconciliation),
}

/// Decides which checkpoint to trust given a quorum's answers for one block.
pub struct ConsistencyResolver<O> {
    minimal_quorum: usize,
    committee: Arc<dyn CommitteeClient>,
    verifier: Arc<dyn TransferVerifier>,
    oracle: Arc<O>,
    branch_timeout: Option<Duration>,
    tie_break: TieBreak,
}

impl<O> fmt::Debug for ConsistencyResolver<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistencyResolver")
            .field("minimal_quorum", &self.minimal_quorum)
            .field("branch_timeout", &self.branch_timeout)
            .field("tie_break", &self.tie_break)
            .finish_non_exhaustive()
    }
}

impl<O: CommitmentOracle> ConsistencyResolver<O> {
    pub fn new(
        minimal_quorum: usize,
        committee: Arc<dyn CommitteeClient>,
        verifier: Arc<dyn TransferVerifier>,
        oracle: Arc<O>,
    ) -> Self {
        Self {
            minimal_quorum,
            committee,
            verifier,
            oracle,
            branch_timeout: None,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_branch_timeout(mut self, branch_timeout: Option<Duration>) -> Self {
        self.branch_timeout = branch_timeout;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn minimal_quorum(&self) -> usize {
        self.minimal_quorum
    }

    /// Fails unless at least `minimal_quorum` sources, and never zero, answered.
    pub fn ensure_quorum(&self, results: &[CheckpointExport]) -> Result<(), ResolveError> {
        let required = self.minimal_quorum.max(1);
        if results.len() < required {
            return Err(ResolveError::InsufficientQuorum {
                required,
                got: results.len(),
            });
        }
        Ok(())
    }

    /// Checks the quorum, then either accepts an agreeing quorum as is or reconciles it.
    pub async fn resolve(
        &self,
        results: Vec<CheckpointExport>,
        pre_state: &CheckpointExport,
    ) -> Result<Resolution, ResolveError> {
        self.ensure_quorum(&results)?;
        if commitments_agree(&results) {
            return Ok(Resolution::Agreed(results));
        }
        self.reconcile(&results, pre_state).await.map(Resolution::Reconciled)
    }

    /// Re-derives every distinct claimed commitment from `pre_state` and picks the best
    /// supported one.
    pub async fn reconcile(
        &self,
        results: &[CheckpointExport],
        pre_state: &CheckpointExport,
    ) -> Result<Reconciliation, ResolveError> {
        let candidates = distinct_candidates(results);
        let height = candidates.first().map(|c| c.height()).unwrap_or_default();
        warn!(%height, candidates = candidates.len(), "checkpoints disagree, re-deriving commitments");

        let branches = join_all(
            candidates
                .iter()
                .map(|candidate| self.run_branch(candidate, pre_state)),
        )
        .await;

        let champion = select_champion(&branches, self.tie_break).map_err(|err| match err {
            ChampionError::NoneSurvived => ResolveError::AllCandidatesRejected {
                height,
                candidates: candidates.len(),
            },
            ChampionError::Tie(n) => ResolveError::Tie(n),
        })?;
        let trusted = candidates[champion].clone();

        let denylist = results
            .iter()
            .filter(|r| r.commitment() != trusted.commitment())
            .map(|fraud| {
                DenylistEntry::new(
                    Evidence {
                        height: trusted.height(),
                        hash: trusted.hash().to_owned(),
                        correct_commitment: trusted.commitment().clone(),
                        fraud_commitment: fraud.commitment().clone(),
                    },
                    fraud.source().clone(),
                )
            })
            .collect();

        info!(
            %height,
            commitment = %trusted.commitment(),
            source = %trusted.source(),
            "reconciled disagreeing checkpoints"
        );
        Ok(Reconciliation {
            trusted,
            branches,
            denylist,
        })
    }

    async fn run_branch(
        &self,
        candidate: &CheckpointExport,
        pre_state: &CheckpointExport,
    ) -> BranchOutcome {
        let branch = self.verify_candidate(candidate, pre_state);
        let result = match self.branch_timeout {
            Some(limit) => time::timeout(limit, branch)
                .await
                .unwrap_or(Err(BranchError::Timeout(limit))),
            None => branch.await,
        };

        match &result {
            Ok(transfers) => {
                info!(commitment = %candidate.commitment(), %transfers, "candidate re-derived")
            }
            Err(err) => warn!(
                commitment = %candidate.commitment(),
                source = %candidate.source(),
                %err,
                "candidate rejected"
            ),
        }

        BranchOutcome {
            commitment: candidate.commitment().clone(),
            source: candidate.source().clone(),
            result,
        }
    }

    /// Fetches the candidate's evidence, replays its transfers, and recomputes its commitment.
    async fn verify_candidate(
        &self,
        candidate: &CheckpointExport,
        pre_state: &CheckpointExport,
    ) -> Result<usize, BranchError> {
        let checkpoint = candidate.checkpoint();
        let bundle = self
            .committee
            .latest_state_proof(checkpoint.url())
            .await
            .map_err(|e| BranchError::Committee(e.to_string()))?;
        if let Some(msg) = bundle.error {
            return Err(BranchError::Protocol(msg));
        }

        let transfers = bundle
            .transfers
            .into_iter()
            .map(OrdTransfer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.verifier.verify(&transfers, checkpoint.height()).await?;

        let derived = derive_post_commitment(
            self.oracle.as_ref(),
            &bundle.proof,
            pre_state.commitment(),
            &transfers,
            checkpoint.height(),
        )?;
        if derived != *checkpoint.commitment() {
            return Err(BranchError::Mismatch {
                claimed: checkpoint.commitment().clone(),
                derived,
            });
        }
        Ok(transfers.len())
    }
}

/// One representative per distinct commitment, first seen wins.
fn distinct_candidates(results: &[CheckpointExport]) -> Vec<CheckpointExport> {
    let mut candidates: Vec<CheckpointExport> = Vec::new();
    for r in results {
        if !candidates.iter().any(|c| c.commitment() == r.commitment()) {
            candidates.push(r.clone());
        }
    }
    candidates
}

#[derive(Debug)]
enum ChampionError {
    NoneSurvived,
    Tie(usize),
}

/// Index of the surviving branch with the most transfers. Ties go to the earliest branch
/// under [`TieBreak::FirstSeen`].
fn select_champion(branches: &[BranchOutcome], tie_break: TieBreak) -> Result<usize, ChampionError> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, count) in branches
        .iter()
        .enumerate()
        .filter_map(|(idx, b)| b.transfer_count().map(|c| (idx, c)))
    {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((idx, count));
        }
    }
    let (champion, top) = best.ok_or(ChampionError::NoneSurvived)?;

    if tie_break == TieBreak::Reject {
        let tied = branches
            .iter()
            .filter(|b| b.transfer_count() == Some(top))
            .count();
        if tied > 1 {
            return Err(ChampionError::Tie(tied));
        }
    }
    Ok(champion)
}
