//! # Record Store Collaborator
//!
//! Read/write access to issued-credential records and batch metadata. The
//! trait abstracts over persistence technology; the in-memory
//! implementation here backs tests and single-process deployments.
//!
//! Verification reads are lock-free and freely concurrent. Writes happen
//! on the issuance/anchoring path only.

use certseal_core::{ArtifactHash, BatchId, CredentialId};
use certseal_crypto::InclusionProof;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::{Batch, BatchState};
use crate::ledger::TxRef;

/// Errors from record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record already exists for this credential.
    #[error("record already exists for {0}")]
    DuplicateRecord(CredentialId),

    /// No batch with the given id.
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),
}

/// The stored record of one issued credential.
///
/// The proof fields are populated at batch-assembly time and never mutated
/// afterwards; they are regenerable from the batch's leaf set and are not
/// authoritative — the anchored root is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// The credential this record belongs to.
    pub credential_id: CredentialId,
    /// Artifact hash of the credential's canonical content.
    pub artifact_hash: ArtifactHash,
    /// The batch this credential was anchored in, once assembled.
    pub batch_id: Option<BatchId>,
    /// The batch's Merkle root, once assembled.
    pub merkle_root: Option<ArtifactHash>,
    /// This credential's sibling path, once assembled.
    pub inclusion_proof: Option<InclusionProof>,
    /// The anchoring transaction, once confirmed.
    pub anchor_tx_ref: Option<TxRef>,
}

impl CertificateRecord {
    /// A record for a credential that has not been batched yet.
    pub fn unanchored(credential_id: CredentialId, artifact_hash: ArtifactHash) -> Self {
        Self {
            credential_id,
            artifact_hash,
            batch_id: None,
            merkle_root: None,
            inclusion_proof: None,
            anchor_tx_ref: None,
        }
    }
}

/// Storage collaborator for credential records and batches.
pub trait RecordStore: Send + Sync {
    /// Fetch a record by credential id.
    fn record_by_id(&self, id: &CredentialId) -> Option<CertificateRecord>;

    /// Fetch a record by artifact hash.
    fn record_by_hash(&self, hash: &ArtifactHash) -> Option<CertificateRecord>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRecord`] if a record already exists
    /// for the credential id.
    fn put_record(&self, record: CertificateRecord) -> Result<(), StoreError>;

    /// Insert or replace batch metadata.
    fn put_batch(&self, batch: Batch) -> Result<(), StoreError>;

    /// Fetch batch metadata.
    fn batch(&self, batch_id: &BatchId) -> Option<Batch>;

    /// Record a confirmed anchoring: set the transaction reference on the
    /// batch and on every record in it, and move the batch to
    /// [`BatchState::Anchored`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownBatch`] if the batch does not exist.
    fn mark_anchored(&self, batch_id: &BatchId, tx_ref: &TxRef) -> Result<(), StoreError>;

    /// Update a batch's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownBatch`] if the batch does not exist.
    fn set_batch_state(&self, batch_id: &BatchId, state: BatchState) -> Result<(), StoreError>;
}

/// Concurrent in-memory record store.
///
/// Keeps a secondary hash index so verification can resolve records by
/// artifact hash without scanning.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<CredentialId, CertificateRecord>,
    by_hash: DashMap<ArtifactHash, CredentialId>,
    batches: DashMap<BatchId, Batch>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn record_by_id(&self, id: &CredentialId) -> Option<CertificateRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    fn record_by_hash(&self, hash: &ArtifactHash) -> Option<CertificateRecord> {
        let id = *self.by_hash.get(hash)?.value();
        self.record_by_id(&id)
    }

    fn put_record(&self, record: CertificateRecord) -> Result<(), StoreError> {
        if self.records.contains_key(&record.credential_id) {
            return Err(StoreError::DuplicateRecord(record.credential_id));
        }
        self.by_hash
            .insert(record.artifact_hash, record.credential_id);
        self.records.insert(record.credential_id, record);
        Ok(())
    }

    fn put_batch(&self, batch: Batch) -> Result<(), StoreError> {
        self.batches.insert(batch.batch_id, batch);
        Ok(())
    }

    fn batch(&self, batch_id: &BatchId) -> Option<Batch> {
        self.batches.get(batch_id).map(|entry| entry.value().clone())
    }

    fn mark_anchored(&self, batch_id: &BatchId, tx_ref: &TxRef) -> Result<(), StoreError> {
        let mut batch = self
            .batches
            .get_mut(batch_id)
            .ok_or(StoreError::UnknownBatch(*batch_id))?;
        batch.anchor_tx_ref = Some(tx_ref.clone());
        batch.state = BatchState::Anchored;
        drop(batch);

        for mut entry in self.records.iter_mut() {
            if entry.value().batch_id.as_ref() == Some(batch_id) {
                entry.value_mut().anchor_tx_ref = Some(tx_ref.clone());
            }
        }
        Ok(())
    }

    fn set_batch_state(&self, batch_id: &BatchId, state: BatchState) -> Result<(), StoreError> {
        let mut batch = self
            .batches
            .get_mut(batch_id)
            .ok_or(StoreError::UnknownBatch(*batch_id))?;
        batch.state = state;
        Ok(())
    }
}
