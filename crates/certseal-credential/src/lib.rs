//! # certseal-credential — Credential Canonicalization
//!
//! Turns a credential's raw semantic fields into one deterministic string
//! and its artifact hash. Two semantically equal credentials — regardless
//! of field order, reference embedding, timezone rendering, or module list
//! duplication — always canonicalize to byte-identical strings.
//!
//! ## Normalization Rules
//!
//! - Reference fields (learner, institute, course) reduce to their stable
//!   string identifier; embedded metadata on the referenced entity never
//!   reaches the hash.
//! - Dates normalize to second-precision UTC ISO8601; absent or unparsable
//!   dates become explicit `null`.
//! - The awarded-module list is trimmed, deduplicated (case-sensitive
//!   exact match) and sorted ascending. All other arrays preserve order.
//! - Serialization is RFC 8785 JCS with explicit nulls.
//!
//! Normalization never rejects input: missing required business fields are
//! the caller's concern, not the canonicalizer's.

pub mod fields;
pub mod payload;

pub use fields::{CredentialFields, EntityRef};
pub use payload::{canonicalize, CanonicalArtifact, CanonicalPayload, PAYLOAD_SCHEMA_VERSION};
