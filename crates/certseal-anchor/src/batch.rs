//! # Batch Assembly and Anchoring Workflow
//!
//! A batch is an issuer-scoped set of credentials committed together under
//! one Merkle root. Assembly is pure and local; anchoring is the single
//! network-bound step of the whole pipeline and is guarded so each batch
//! pays for at most one ledger write.
//!
//! ## Lifecycle
//!
//! ```text
//! Assembled → PendingAnchor → Anchored
//!                  └──────→ Assembled   (explicit abandonment)
//! ```
//!
//! A ledger timeout leaves the batch in `PendingAnchor`: the transaction
//! may still confirm later, so the submission is neither failed nor
//! repeatable until the caller either confirms it or abandons it.

use std::sync::Arc;

use certseal_core::{ArtifactHash, BatchId, CanonicalizationError, CredentialId, Timestamp};
use certseal_credential::{canonicalize, CredentialFields};
use certseal_crypto::{MerkleError, MerkleTree};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{Ledger, LedgerError, TxRef};
use crate::store::{CertificateRecord, RecordStore, StoreError};

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// Root computed, proofs persisted, not yet submitted.
    Assembled,
    /// An anchoring submission is in flight or awaiting confirmation.
    PendingAnchor,
    /// The root is confirmed on-chain. Final state.
    Anchored,
}

/// Events that drive batch state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent {
    /// An anchoring submission was started.
    Submitted,
    /// The anchoring transaction was confirmed.
    Confirmed,
    /// The pending submission was explicitly given up on.
    Abandoned,
}

impl BatchState {
    /// Whether this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Anchored)
    }

    /// Attempt a state transition based on an event.
    ///
    /// Valid transitions:
    /// - Assembled → PendingAnchor (Submitted)
    /// - PendingAnchor → Anchored (Confirmed)
    /// - PendingAnchor → Assembled (Abandoned)
    pub fn transition(self, event: BatchEvent) -> Result<BatchState, BatchError> {
        let next = match (self, event) {
            (Self::Assembled, BatchEvent::Submitted) => Self::PendingAnchor,
            (Self::PendingAnchor, BatchEvent::Confirmed) => Self::Anchored,
            (Self::PendingAnchor, BatchEvent::Abandoned) => Self::Assembled,
            _ => {
                let target = match event {
                    BatchEvent::Submitted => Self::PendingAnchor,
                    BatchEvent::Confirmed => Self::Anchored,
                    BatchEvent::Abandoned => Self::Assembled,
                };
                return Err(BatchError::InvalidTransition {
                    from: self.to_string(),
                    to: target.to_string(),
                });
            }
        };

        tracing::debug!(from = %self, to = %next, event = ?event, "batch state transition");
        Ok(next)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Assembled => "Assembled",
            Self::PendingAnchor => "PendingAnchor",
            Self::Anchored => "Anchored",
        };
        f.write_str(s)
    }
}

/// Errors from batch assembly and anchoring.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Two credentials in the batch canonicalize to the same artifact hash.
    /// Resolved at admission time; the batch is not created.
    #[error("duplicate artifact hash in batch at position {index}: {hash}")]
    DuplicateArtifact {
        /// Position of the second occurrence in the submitted sequence.
        index: usize,
        /// The duplicated hash.
        hash: ArtifactHash,
    },

    /// An anchoring submission for this batch is already in flight or
    /// awaiting confirmation.
    #[error("anchoring already in flight for {batch_id}")]
    AnchorInFlight {
        /// The contested batch.
        batch_id: BatchId,
    },

    /// The batch is already anchored; re-anchoring would pay for a
    /// redundant ledger write.
    #[error("batch {0} is already anchored")]
    AlreadyAnchored(BatchId),

    /// No batch with the given id.
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),

    /// Attempted an invalid lifecycle transition.
    #[error("invalid batch transition from {from} to {to}")]
    InvalidTransition {
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
    },

    /// Canonicalization of a batch member failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Merkle tree operation failed.
    #[error("merkle error: {0}")]
    Merkle(MerkleError),

    /// Record store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The ledger call failed; the batch remains pending.
    #[error("ledger error for batch {batch_id}: {source}")]
    Ledger {
        /// The batch whose submission failed.
        batch_id: BatchId,
        /// The underlying ledger failure.
        #[source]
        source: LedgerError,
    },
}

/// An issuer-scoped set of credentials anchored together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch identifier.
    pub batch_id: BatchId,
    /// Leaf hashes in submission order.
    pub leaves: Vec<ArtifactHash>,
    /// Merkle root over the leaves.
    pub root: ArtifactHash,
    /// The anchoring transaction, once confirmed. Immutable thereafter.
    pub anchor_tx_ref: Option<TxRef>,
    /// Lifecycle state.
    pub state: BatchState,
    /// When the batch was assembled.
    pub created_at: Timestamp,
}

/// Assembles batches and drives the single-writer anchoring workflow.
///
/// Assembly canonicalizes each member independently (members are free to
/// be processed concurrently upstream — canonicalization is pure), builds
/// the tree, and persists each member's inclusion proof alongside its
/// record. Submission holds an in-process guard per batch id so concurrent
/// submissions are rejected rather than double-paid.
pub struct BatchAnchorer<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    in_flight: DashMap<BatchId, ()>,
}

impl<S: RecordStore, L: Ledger> BatchAnchorer<S, L> {
    /// Create an anchorer over a record store and a ledger.
    pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
        Self {
            store,
            ledger,
            in_flight: DashMap::new(),
        }
    }

    /// Assemble a batch: canonicalize every member, build the tree, and
    /// persist per-credential records with their inclusion proofs.
    ///
    /// # Errors
    ///
    /// [`BatchError::DuplicateArtifact`] if two members hash identically;
    /// store errors if a member is already recorded.
    pub fn assemble(
        &self,
        credentials: &[(CredentialId, CredentialFields)],
    ) -> Result<Batch, BatchError> {
        let mut hashes = Vec::with_capacity(credentials.len());
        for (_, fields) in credentials {
            hashes.push(canonicalize(fields)?.artifact_hash);
        }

        let tree = MerkleTree::build(&hashes).map_err(|e| match e {
            MerkleError::DuplicateLeaf { index, hash } => {
                BatchError::DuplicateArtifact { index, hash }
            }
            other => BatchError::Merkle(other),
        })?;

        let batch_id = BatchId::new();
        let root = *tree.root();

        for ((credential_id, _), hash) in credentials.iter().zip(&hashes) {
            let proof = tree.prove_inclusion(hash).map_err(BatchError::Merkle)?;
            self.store.put_record(CertificateRecord {
                credential_id: *credential_id,
                artifact_hash: *hash,
                batch_id: Some(batch_id),
                merkle_root: Some(root),
                inclusion_proof: Some(proof),
                anchor_tx_ref: None,
            })?;
        }

        let batch = Batch {
            batch_id,
            leaves: hashes,
            root,
            anchor_tx_ref: None,
            state: BatchState::Assembled,
            created_at: Timestamp::now(),
        };
        self.store.put_batch(batch.clone())?;

        tracing::info!(
            batch_id = %batch_id,
            members = credentials.len(),
            root = %root,
            "batch assembled"
        );
        Ok(batch)
    }

    /// Submit a batch's root for anchoring. Exactly one submission may be
    /// in flight per batch id; concurrent callers get
    /// [`BatchError::AnchorInFlight`].
    ///
    /// On a ledger failure the batch stays in `PendingAnchor` — the
    /// transaction may still confirm later. Use [`Self::confirm`] when it
    /// does, or [`Self::abandon`] to allow resubmission.
    pub fn submit(&self, batch_id: &BatchId) -> Result<TxRef, BatchError> {
        if self.in_flight.insert(*batch_id, ()).is_some() {
            return Err(BatchError::AnchorInFlight { batch_id: *batch_id });
        }
        let result = self.submit_guarded(batch_id);
        self.in_flight.remove(batch_id);
        result
    }

    fn submit_guarded(&self, batch_id: &BatchId) -> Result<TxRef, BatchError> {
        let batch = self
            .store
            .batch(batch_id)
            .ok_or(BatchError::UnknownBatch(*batch_id))?;

        match batch.state {
            BatchState::Anchored => return Err(BatchError::AlreadyAnchored(*batch_id)),
            BatchState::PendingAnchor => {
                return Err(BatchError::AnchorInFlight { batch_id: *batch_id })
            }
            BatchState::Assembled => {}
        }

        let pending = batch.state.transition(BatchEvent::Submitted)?;
        self.store.set_batch_state(batch_id, pending)?;

        match self.ledger.anchor_root(batch_id, &batch.root) {
            Ok(tx_ref) => {
                self.store.mark_anchored(batch_id, &tx_ref)?;
                tracing::info!(
                    batch_id = %batch_id,
                    tx_ref = %tx_ref,
                    chain_id = self.ledger.chain_id(),
                    "batch anchored"
                );
                Ok(tx_ref)
            }
            Err(source) => {
                tracing::warn!(
                    batch_id = %batch_id,
                    error = %source,
                    "anchoring submission failed, batch remains pending"
                );
                Err(BatchError::Ledger {
                    batch_id: *batch_id,
                    source,
                })
            }
        }
    }

    /// Record a confirmation for a batch left in `PendingAnchor` (e.g.,
    /// the submission timed out but the transaction later confirmed).
    pub fn confirm(&self, batch_id: &BatchId, tx_ref: &TxRef) -> Result<(), BatchError> {
        let batch = self
            .store
            .batch(batch_id)
            .ok_or(BatchError::UnknownBatch(*batch_id))?;
        batch.state.transition(BatchEvent::Confirmed)?;
        self.store.mark_anchored(batch_id, tx_ref)?;
        tracing::info!(batch_id = %batch_id, tx_ref = %tx_ref, "pending batch confirmed");
        Ok(())
    }

    /// Explicitly give up on a pending submission, returning the batch to
    /// `Assembled` so it can be resubmitted.
    pub fn abandon(&self, batch_id: &BatchId) -> Result<(), BatchError> {
        let batch = self
            .store
            .batch(batch_id)
            .ok_or(BatchError::UnknownBatch(*batch_id))?;
        let next = batch.state.transition(BatchEvent::Abandoned)?;
        self.store.set_batch_state(batch_id, next)?;
        tracing::warn!(batch_id = %batch_id, "pending anchor abandoned");
        Ok(())
    }
}
