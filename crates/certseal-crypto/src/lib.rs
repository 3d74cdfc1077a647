//! # certseal-crypto — Merkle Batch Commitment
//!
//! Provides the commitment machinery that makes a batch of credential
//! hashes independently verifiable:
//!
//! - **Keccak-256 pairwise combination** over packed 32-byte values, the
//!   exact byte layout a Solidity `keccak256(abi.encodePacked(a, b))`
//!   verifier recomputes.
//! - **Merkle tree builder** producing an immutable layered tree and root.
//! - **Inclusion proof generation** from a built tree.
//! - **Stateless proof verification** as a free function over plain data,
//!   re-derivable inside a constrained on-chain environment.
//!
//! ## Crate Policy
//!
//! - Depends only on `certseal-core` internally.
//! - All functions here are pure and synchronous; callers may fan batches
//!   out across worker threads freely.
//! - No mocking of hash functions in tests — all tests use real keccak-256.

pub mod keccak;
pub mod merkle;

pub use keccak::{combine, keccak256, EMPTY_ROOT};
pub use merkle::{verify_inclusion, InclusionProof, MerkleError, MerkleTree, ProofStep, Side};
