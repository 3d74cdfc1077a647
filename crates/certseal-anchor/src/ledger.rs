//! # Ledger Collaborator
//!
//! The external ledger that anchors Merkle roots. CertSeal functions
//! without it — credentials hash and prove locally — but a root that never
//! reaches the ledger can only ever verify as "not anchored".
//!
//! ## Architecture
//!
//! The [`Ledger`] trait defines the interface for chain adapters. The
//! trait is **sealed** — only implementations within this crate are
//! permitted. This prevents external code from supplying unaudited ledger
//! adapters that could fabricate anchoring confirmations.
//!
//! ## Security Invariant
//!
//! Implementations must ensure that `anchor_root()` only returns `Ok` when
//! the root has been durably recorded on the target chain. Returning `Ok`
//! for an unanchored root would let the verification engine report trust
//! that does not exist. The pairwise hash the engine uses
//! (`keccak256(a ‖ b)`) must match the chain-side verifier byte for byte.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use certseal_core::{ArtifactHash, BatchId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The chain could not be reached (transient transport failure).
    #[error("chain unreachable: {chain_id}: {reason}")]
    Unreachable {
        /// The chain identifier.
        chain_id: String,
        /// Underlying transport error.
        reason: String,
    },

    /// The request timed out. The submitted transaction may still confirm
    /// later, so callers must not treat this as a definitive failure.
    #[error("ledger request timed out on chain {chain_id}")]
    Timeout {
        /// The chain identifier.
        chain_id: String,
    },

    /// The ledger rejected the submission.
    #[error("ledger rejected submission: {0}")]
    Rejected(String),

    /// The anchor transaction executed and failed.
    #[error("anchor transaction failed on chain {chain_id}: {reason}")]
    TransactionFailed {
        /// The chain identifier.
        chain_id: String,
        /// Failure reason.
        reason: String,
    },
}

impl LedgerError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}

/// Reference to the ledger transaction that anchored a root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub String);

impl TxRef {
    /// Access the inner reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for ledger anchor/query adapters.
///
/// Sealed — only implementations within this crate are permitted.
pub trait Ledger: private::Sealed + Send + Sync {
    /// Durably record a batch's Merkle root on the ledger.
    ///
    /// The batch id keys the on-chain root registry so verifiers can
    /// retrieve the root for a specific batch later. May block for a
    /// network round-trip plus confirmation latency; adapters enforce
    /// their own request timeouts and surface expiry as
    /// [`LedgerError::Timeout`].
    fn anchor_root(&self, batch_id: &BatchId, root: &ArtifactHash) -> Result<TxRef, LedgerError>;

    /// Fetch the anchored root for a batch, if one exists on-chain.
    fn anchored_root(&self, batch_id: &BatchId) -> Result<Option<ArtifactHash>, LedgerError>;

    /// The chain identifier for this adapter.
    fn chain_id(&self) -> &str;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::MockLedger {}
    #[cfg(feature = "evm-ledger")]
    impl Sealed for crate::evm::EvmLedger {}
}

/// Retry schedule for ledger queries.
///
/// Only transient failures (unreachable, timeout) are retried; definitive
/// rejections surface immediately. Exhaustion returns the last transient
/// error to the caller, which the verification engine reports as a
/// distinct unavailability outcome.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep before the first retry.
    pub initial_backoff: Duration,
    /// Backoff multiplier applied after each retry.
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; useful in tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            backoff_multiplier: 1,
        }
    }

    /// Run an operation under this schedule.
    pub fn run<T>(
        &self,
        chain_id: &str,
        mut op: impl FnMut() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut attempt = 1u32;
        let mut backoff = self.initial_backoff;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        chain_id,
                        attempt,
                        error = %e,
                        "transient ledger failure, backing off"
                    );
                    std::thread::sleep(backoff);
                    backoff = backoff.saturating_mul(self.backoff_multiplier);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// In-memory ledger for development and testing.
///
/// Simulates durable anchoring with deterministic transaction references
/// derived from the root. Supports failure injection (`set_offline`) so
/// callers can exercise the unavailability path, and counts queries so
/// tests can assert the local short-circuit never touches the chain.
///
/// Provides NO actual finality guarantees.
#[derive(Debug, Default)]
pub struct MockLedger {
    chain_id: String,
    anchored: DashMap<BatchId, ArtifactHash>,
    next_block: AtomicU64,
    offline: AtomicBool,
    queries: AtomicU64,
}

impl MockLedger {
    /// Create a new mock ledger.
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            anchored: DashMap::new(),
            next_block: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            queries: AtomicU64::new(0),
        }
    }

    /// Toggle failure injection: while offline, every call returns
    /// [`LedgerError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `anchored_root` queries served or refused.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Record a root directly, bypassing `anchor_root`.
    ///
    /// Lets tests model a chain whose state disagrees with the record
    /// store (altered records, wrong batch pointers).
    pub fn seed_anchored(&self, batch_id: BatchId, root: ArtifactHash) {
        self.anchored.insert(batch_id, root);
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Unreachable {
                chain_id: self.chain_id.clone(),
                reason: "mock ledger offline".to_string(),
            });
        }
        Ok(())
    }
}

impl Ledger for MockLedger {
    fn anchor_root(&self, batch_id: &BatchId, root: &ArtifactHash) -> Result<TxRef, LedgerError> {
        self.check_online()?;
        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        self.anchored.insert(*batch_id, *root);
        let prefix = root.to_hex();
        let prefix = prefix.get(..16).unwrap_or("unknown");
        Ok(TxRef(format!("mock-tx-{prefix}-{block}")))
    }

    fn anchored_root(&self, batch_id: &BatchId) -> Result<Option<ArtifactHash>, LedgerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.anchored.get(batch_id).map(|entry| *entry.value()))
    }

    fn chain_id(&self) -> &str {
        &self.chain_id
    }
}
