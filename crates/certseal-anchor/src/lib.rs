//! # certseal-anchor — Batch Anchoring and Verification
//!
//! Orchestrates the two workflows built on top of the pure hashing and
//! Merkle layers:
//!
//! - **Anchoring** — assemble a batch of credentials into a Merkle tree,
//!   persist per-credential inclusion proofs, and commit the root to an
//!   external ledger exactly once per batch.
//! - **Verification** — recompute a presented credential's artifact hash,
//!   check its stored proof locally, and combine that with the on-chain
//!   root into a trust verdict.
//!
//! ## Collaborators
//!
//! The record store and the ledger are injected behind traits so the
//! verification state machine's pure transitions can be tested without any
//! network dependency, and the single network-bound transition can be
//! mocked, retried, and timed out independently. The [`ledger::Ledger`]
//! trait is sealed; [`ledger::MockLedger`] ships in-crate for development
//! and tests, and a JSON-RPC EVM client is available behind the
//! `evm-ledger` feature.

pub mod batch;
pub mod ledger;
pub mod store;
pub mod verify;

#[cfg(feature = "evm-ledger")]
pub mod evm;

pub use batch::{Batch, BatchAnchorer, BatchError, BatchEvent, BatchState};
pub use ledger::{Ledger, LedgerError, MockLedger, RetryPolicy, TxRef};
pub use store::{CertificateRecord, InMemoryRecordStore, RecordStore, StoreError};
pub use verify::{Verdict, VerificationEngine, VerificationPhase, VerificationReport};

#[cfg(feature = "evm-ledger")]
pub use evm::{EvmLedger, EvmLedgerConfig};
