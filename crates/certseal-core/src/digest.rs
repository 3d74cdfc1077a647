//! # Artifact Hashing — 32-Byte Content Identifiers
//!
//! Defines `ArtifactHash`, the SHA-256 digest that identifies a credential's
//! canonical content, and the two functions that produce one:
//!
//! - [`artifact_digest()`] — from `CanonicalBytes` (the credential-field
//!   path; the signature makes it a compile error to hash raw bytes here).
//! - [`content_digest()`] — from raw bytes (the opaque file-upload path,
//!   where no canonical form applies).
//!
//! The two paths are deliberately separate functions and are never
//! cross-checked against each other.
//!
//! `ArtifactHash` doubles as the 32-byte node value inside Merkle layers,
//! so it exposes the raw bytes for packed pairwise hashing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::HashParseError;

/// A 32-byte SHA-256 digest, rendered as 64 lowercase hex chars.
///
/// Used both as the artifact hash of a credential and as the node value at
/// every level of a Merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactHash([u8; 32]);

impl ArtifactHash {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw 32 bytes (the packed on-chain representation).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as 64 lowercase hex chars.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse from a 64-char hex string (case-insensitive input,
    /// lowercase canonical output).
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(HashParseError::Length(s.len()));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| HashParseError::InvalidHex { offset: i })?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| HashParseError::InvalidHex { offset: i })?;
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for ArtifactHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Hashes serialize as hex strings so stored records and proofs stay
// readable and portable across languages.
impl Serialize for ArtifactHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ArtifactHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the artifact hash of a credential's canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`. This compile-time
/// constraint prevents any credential-field code path from hashing a
/// non-canonical rendering.
pub fn artifact_digest(data: &CanonicalBytes) -> ArtifactHash {
    sha256(data.as_bytes())
}

/// Compute the direct content hash of an uploaded artifact.
///
/// This is the only digest path that bypasses canonicalization: uploaded
/// files are opaque byte streams with no canonical form. Records created
/// from file uploads are keyed by this hash, never by a payload hash.
pub fn content_digest(data: &[u8]) -> ArtifactHash {
    sha256(data)
}

fn sha256(data: &[u8]) -> ArtifactHash {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ArtifactHash(bytes)
}
