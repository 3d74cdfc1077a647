//! # Verification Engine
//!
//! Classifies one presented credential (or uploaded artifact) into a trust
//! verdict by combining local proof validity with on-chain root existence.
//!
//! ## Phases
//!
//! ```text
//! Received → Recomputed → LocalChecked → ChainChecked → Decided
//! ```
//!
//! Local failures short-circuit before any network call: a locally
//! inconsistent proof can never become valid, so the chain is never
//! consulted for it. The chain check is the only network-bound phase and
//! runs under a retry schedule; exhausting it yields the distinct
//! `Unavailable` verdict — "absent" and "mismatched" are meaningful
//! negative results, and an outage must never masquerade as either.
//!
//! Verdicts are computed fresh on every request and never persisted — the
//! ledger and the record store are the sources of truth.

use std::sync::Arc;

use certseal_core::{content_digest, ArtifactHash, BatchId, CanonicalizationError, CredentialId};
use certseal_credential::{canonicalize, CredentialFields};
use certseal_crypto::verify_inclusion;
use serde::{Deserialize, Serialize};

use crate::ledger::{Ledger, RetryPolicy, TxRef};
use crate::store::{CertificateRecord, RecordStore};

/// The terminal classification of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Locally consistent and the on-chain root matches the stored root.
    Valid,
    /// The record exists and is locally consistent, but no confirmed
    /// on-chain root exists for its batch yet.
    NotAnchored,
    /// The local proof fails, or the on-chain root disagrees with the
    /// stored root.
    Invalid,
    /// No record matches the presented credential or artifact.
    NotFound,
    /// The ledger could not be reached within the retry budget. Distinct
    /// from every negative verdict; the caller should retry.
    Unavailable,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Valid => "Valid",
            Self::NotAnchored => "NotAnchored",
            Self::Invalid => "Invalid",
            Self::NotFound => "NotFound",
            Self::Unavailable => "Unavailable",
        };
        f.write_str(s)
    }
}

/// The phases of one verification request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationPhase {
    /// Request accepted.
    Received,
    /// Artifact hash recomputed from the presented content.
    Recomputed,
    /// Stored record resolved and local proof evaluated.
    LocalChecked,
    /// On-chain root queried.
    ChainChecked,
    /// Verdict produced.
    Decided,
}

impl std::fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "Received",
            Self::Recomputed => "Recomputed",
            Self::LocalChecked => "LocalChecked",
            Self::ChainChecked => "ChainChecked",
            Self::Decided => "Decided",
        };
        f.write_str(s)
    }
}

/// The verdict plus supporting evidence.
///
/// The evidence fields are advisory/diagnostic only — they explain the
/// verdict to a human but are never themselves part of the trust decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The trust verdict.
    pub verdict: Verdict,
    /// The recomputed artifact hash of the presented content.
    pub artifact_hash: ArtifactHash,
    /// The matched record's credential id, if a record was found.
    pub credential_id: Option<CredentialId>,
    /// The batch the record points at.
    pub batch_id: Option<BatchId>,
    /// The root stored alongside the record.
    pub stored_root: Option<ArtifactHash>,
    /// The root found on-chain, when the chain was consulted.
    pub chain_root: Option<ArtifactHash>,
    /// The anchoring transaction reference on the record.
    pub anchor_tx_ref: Option<TxRef>,
    /// Whether the stored proof reproduced the stored root locally.
    pub local_proof_valid: Option<bool>,
    /// Whether the on-chain root equalled the stored root.
    pub roots_match: Option<bool>,
}

impl VerificationReport {
    fn undecided(artifact_hash: ArtifactHash) -> Self {
        Self {
            verdict: Verdict::NotFound,
            artifact_hash,
            credential_id: None,
            batch_id: None,
            stored_root: None,
            chain_root: None,
            anchor_tx_ref: None,
            local_proof_valid: None,
            roots_match: None,
        }
    }

    fn decide(mut self, verdict: Verdict) -> Self {
        self.verdict = verdict;
        tracing::debug!(
            phase = %VerificationPhase::Decided,
            verdict = %verdict,
            artifact_hash = %self.artifact_hash,
            "verification decided"
        );
        self
    }
}

/// Orchestrates verification over the record store and the ledger.
///
/// Requests are independent and read-only; one engine may serve any number
/// of them concurrently.
pub struct VerificationEngine<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    retry: RetryPolicy,
}

impl<S: RecordStore, L: Ledger> VerificationEngine<S, L> {
    /// Create an engine with the default retry schedule.
    pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
        Self {
            store,
            ledger,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the ledger retry schedule.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Verify a presented credential by its semantic fields.
    ///
    /// Recomputes the canonical artifact hash and resolves the record by
    /// that hash.
    pub fn verify_fields(
        &self,
        fields: &CredentialFields,
    ) -> Result<VerificationReport, CanonicalizationError> {
        let artifact = canonicalize(fields)?;
        Ok(self.decide(artifact.artifact_hash, None))
    }

    /// Verify a presented credential against a known credential id.
    ///
    /// Resolves the record by id; the recomputed hash of the presented
    /// fields is then checked against the record's stored proof, so any
    /// content alteration surfaces as `Invalid`.
    pub fn verify_presented(
        &self,
        credential_id: &CredentialId,
        fields: &CredentialFields,
    ) -> Result<VerificationReport, CanonicalizationError> {
        let artifact = canonicalize(fields)?;
        Ok(self.decide(artifact.artifact_hash, Some(credential_id)))
    }

    /// Verify an uploaded artifact by direct content hash.
    ///
    /// No canonical form applies to an opaque byte stream; the record is
    /// resolved by the content hash the file was registered under.
    pub fn verify_file(&self, bytes: &[u8]) -> VerificationReport {
        self.decide(content_digest(bytes), None)
    }

    /// Run the phase machine for a recomputed hash.
    fn decide(
        &self,
        artifact_hash: ArtifactHash,
        credential_id: Option<&CredentialId>,
    ) -> VerificationReport {
        tracing::debug!(
            phase = %VerificationPhase::Recomputed,
            artifact_hash = %artifact_hash,
            "artifact hash recomputed"
        );
        let mut report = VerificationReport::undecided(artifact_hash);

        // Recomputed → LocalChecked
        let record = match self.resolve_record(artifact_hash, credential_id) {
            Some(record) => record,
            None => return report.decide(Verdict::NotFound),
        };
        report.credential_id = Some(record.credential_id);
        report.batch_id = record.batch_id;
        report.stored_root = record.merkle_root;
        report.anchor_tx_ref = record.anchor_tx_ref.clone();

        let (root, proof, batch_id) = match (
            record.merkle_root,
            record.inclusion_proof.as_ref(),
            record.batch_id,
        ) {
            (Some(root), Some(proof), Some(batch_id)) => (root, proof, batch_id),
            // Never submitted for anchoring: nothing to prove against.
            _ => return report.decide(Verdict::NotAnchored),
        };

        let local_ok = verify_inclusion(&artifact_hash, proof, &root);
        report.local_proof_valid = Some(local_ok);
        tracing::debug!(
            phase = %VerificationPhase::LocalChecked,
            credential_id = %record.credential_id,
            local_ok,
            "local proof evaluated"
        );
        if !local_ok {
            // A locally inconsistent proof can never become valid; the
            // chain is not consulted.
            return report.decide(Verdict::Invalid);
        }

        // LocalChecked → ChainChecked
        let chain_root = match self
            .retry
            .run(self.ledger.chain_id(), || self.ledger.anchored_root(&batch_id))
        {
            Ok(chain_root) => chain_root,
            Err(e) => {
                tracing::error!(
                    batch_id = %batch_id,
                    chain_id = self.ledger.chain_id(),
                    error = %e,
                    "ledger unavailable after retries"
                );
                return report.decide(Verdict::Unavailable);
            }
        };
        report.chain_root = chain_root;
        tracing::debug!(
            phase = %VerificationPhase::ChainChecked,
            batch_id = %batch_id,
            present = chain_root.is_some(),
            "anchored root queried"
        );

        match chain_root {
            None => report.decide(Verdict::NotAnchored),
            Some(chain_root) if chain_root == root => {
                report.roots_match = Some(true);
                report.decide(Verdict::Valid)
            }
            Some(_) => {
                report.roots_match = Some(false);
                report.decide(Verdict::Invalid)
            }
        }
    }

    fn resolve_record(
        &self,
        artifact_hash: ArtifactHash,
        credential_id: Option<&CredentialId>,
    ) -> Option<CertificateRecord> {
        match credential_id {
            Some(id) => self.store.record_by_id(id),
            None => self.store.record_by_hash(&artifact_hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchAnchorer;
    use crate::ledger::MockLedger;
    use crate::store::InMemoryRecordStore;

    fn fields(n: u32) -> CredentialFields {
        CredentialFields {
            certificate_id: Some(format!("CERT-{n:04}")),
            learner: Some(certseal_credential::EntityRef::Id(format!("learner-{n}"))),
            grade: Some("A".to_string()),
            ..CredentialFields::default()
        }
    }

    struct Harness {
        store: Arc<InMemoryRecordStore>,
        ledger: Arc<MockLedger>,
        anchorer: BatchAnchorer<InMemoryRecordStore, MockLedger>,
        engine: VerificationEngine<InMemoryRecordStore, MockLedger>,
        members: Vec<(CredentialId, CredentialFields)>,
    }

    fn harness(n: u32) -> Harness {
        let store = Arc::new(InMemoryRecordStore::new());
        let ledger = Arc::new(MockLedger::new("mock-eth"));
        let anchorer = BatchAnchorer::new(store.clone(), ledger.clone());
        let engine = VerificationEngine::new(store.clone(), ledger.clone())
            .with_retry_policy(RetryPolicy::none());
        let members: Vec<_> = (0..n).map(|i| (CredentialId::new(), fields(i))).collect();
        Harness {
            store,
            ledger,
            anchorer,
            engine,
            members,
        }
    }

    // -----------------------------------------------------------------------
    // Verdicts
    // -----------------------------------------------------------------------

    #[test]
    fn anchored_credential_is_valid() {
        let h = harness(4);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.anchorer.submit(&batch.batch_id).unwrap();

        let report = h.engine.verify_fields(&h.members[2].1).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
        assert_eq!(report.batch_id, Some(batch.batch_id));
        assert_eq!(report.stored_root, Some(batch.root));
        assert_eq!(report.chain_root, Some(batch.root));
        assert_eq!(report.local_proof_valid, Some(true));
        assert_eq!(report.roots_match, Some(true));
        assert!(report.anchor_tx_ref.is_some());
    }

    #[test]
    fn assembled_but_unanchored_batch_is_not_anchored() {
        // Scenario: valid local proof, no root on-chain.
        let h = harness(3);
        h.anchorer.assemble(&h.members).unwrap();

        let report = h.engine.verify_fields(&h.members[0].1).unwrap();
        assert_eq!(report.verdict, Verdict::NotAnchored);
        assert_eq!(report.local_proof_valid, Some(true));
        assert!(report.chain_root.is_none());
    }

    #[test]
    fn chain_root_mismatch_is_invalid() {
        // Scenario: record altered or pointing at the wrong batch.
        let h = harness(3);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.ledger
            .seed_anchored(batch.batch_id, content_digest(b"some other root"));

        let report = h.engine.verify_fields(&h.members[1].1).unwrap();
        assert_eq!(report.verdict, Verdict::Invalid);
        assert_eq!(report.local_proof_valid, Some(true));
        assert_eq!(report.roots_match, Some(false));
    }

    #[test]
    fn unknown_credential_is_not_found() {
        let h = harness(2);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.anchorer.submit(&batch.batch_id).unwrap();

        let report = h.engine.verify_fields(&fields(99)).unwrap();
        assert_eq!(report.verdict, Verdict::NotFound);
        assert!(report.credential_id.is_none());
    }

    #[test]
    fn ledger_outage_is_unavailable_not_not_anchored() {
        let h = harness(2);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.anchorer.submit(&batch.batch_id).unwrap();
        h.ledger.set_offline(true);

        let report = h.engine.verify_fields(&h.members[0].1).unwrap();
        assert_eq!(report.verdict, Verdict::Unavailable);
        // Local evidence survives even when the chain is down.
        assert_eq!(report.local_proof_valid, Some(true));
    }

    #[test]
    fn record_without_proof_is_not_anchored() {
        let h = harness(0);
        let id = CredentialId::new();
        let artifact = canonicalize(&fields(7)).unwrap();
        h.store
            .put_record(CertificateRecord::unanchored(id, artifact.artifact_hash))
            .unwrap();

        let report = h.engine.verify_fields(&fields(7)).unwrap();
        assert_eq!(report.verdict, Verdict::NotAnchored);
        assert_eq!(report.credential_id, Some(id));
        assert!(report.local_proof_valid.is_none());
    }

    // -----------------------------------------------------------------------
    // Short-circuit: local mismatch never touches the chain
    // -----------------------------------------------------------------------

    #[test]
    fn altered_content_is_invalid_without_chain_query() {
        let h = harness(3);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.anchorer.submit(&batch.batch_id).unwrap();
        let queries_before = h.ledger.query_count();

        // Present altered fields under the original credential id.
        let (id, original) = &h.members[1];
        let mut altered = original.clone();
        altered.grade = Some("A+".to_string());

        let report = h.engine.verify_presented(id, &altered).unwrap();
        assert_eq!(report.verdict, Verdict::Invalid);
        assert_eq!(report.local_proof_valid, Some(false));
        assert_eq!(h.ledger.query_count(), queries_before);
    }

    #[test]
    fn presented_original_content_by_id_is_valid() {
        let h = harness(3);
        let batch = h.anchorer.assemble(&h.members).unwrap();
        h.anchorer.submit(&batch.batch_id).unwrap();

        let (id, original) = &h.members[0];
        let report = h.engine.verify_presented(id, original).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
    }

    // -----------------------------------------------------------------------
    // File-upload path
    // -----------------------------------------------------------------------

    #[test]
    fn file_verification_uses_content_hash() {
        let h = harness(0);
        let document = b"%PDF-1.7 rendered certificate bytes";
        let id = CredentialId::new();
        h.store
            .put_record(CertificateRecord::unanchored(id, content_digest(document)))
            .unwrap();

        let report = h.engine.verify_file(document);
        assert_eq!(report.verdict, Verdict::NotAnchored);
        assert_eq!(report.credential_id, Some(id));

        let report = h.engine.verify_file(b"different bytes");
        assert_eq!(report.verdict, Verdict::NotFound);
    }

    #[test]
    fn file_and_field_paths_are_distinct() {
        // A record registered under a payload hash is not found by hashing
        // the canonical string as file content unless the bytes match.
        let h = harness(1);
        h.anchorer.assemble(&h.members).unwrap();
        let artifact = canonicalize(&h.members[0].1).unwrap();

        // The canonical string's bytes hash to the same value, so the
        // content path finds it; arbitrary other bytes do not.
        let report = h.engine.verify_file(artifact.canonical_string.as_bytes());
        assert_eq!(report.verdict, Verdict::NotAnchored);
        let report = h.engine.verify_file(b"unrelated upload");
        assert_eq!(report.verdict, Verdict::NotFound);
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    #[test]
    fn verdict_and_phase_display() {
        assert_eq!(Verdict::NotAnchored.to_string(), "NotAnchored");
        assert_eq!(Verdict::Unavailable.to_string(), "Unavailable");
        assert_eq!(VerificationPhase::ChainChecked.to_string(), "ChainChecked");
    }
}
