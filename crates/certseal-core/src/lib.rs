//! # certseal-core — Foundational Types for CertSeal
//!
//! This crate is the bedrock of the CertSeal workspace. It defines the
//! type-system primitives that make credential hashing deterministic and
//! enforce correctness guarantees at compile time. Every other crate in the
//! workspace depends on `certseal-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `CredentialId`, `BatchId`,
//!    `LearnerId`, `InstituteId`, `CourseId` — all newtypes. No bare strings
//!    for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** ALL artifact-hash computation flows
//!    through `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for
//!    digests. The one exception is the opaque file-upload path, which is a
//!    content hash over raw bytes and is a distinct function on purpose.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, matching the canonical serialization of
//!    dates inside hashed payloads.
//!
//! 4. **`artifact_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that the credential hash path flows through
//!    canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certseal-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug` and `Clone`.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{artifact_digest, content_digest, ArtifactHash};
pub use error::{CanonicalizationError, HashParseError};
pub use identity::{BatchId, CourseId, CredentialId, InstituteId, LearnerId};
pub use temporal::Timestamp;
