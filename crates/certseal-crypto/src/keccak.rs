//! # Keccak-256 Pairwise Combination
//!
//! The node-pairing primitive for batch commitments. Two 32-byte values are
//! concatenated into a packed 64-byte preimage and hashed with keccak-256:
//!
//! ```text
//! combine(a, b) = keccak256(a ‖ b)
//! ```
//!
//! ## Security Invariant
//!
//! This byte layout is the one true wire-format contract of the whole
//! commitment scheme: an on-chain verifier recomputes exactly
//! `keccak256(abi.encodePacked(left, right))`, so any deviation here —
//! length prefixes, domain tags, hex-string hashing — would produce roots
//! no contract could ever reproduce.

use certseal_core::ArtifactHash;
use sha3::{Digest, Keccak256};

/// The defined root of an empty tree: keccak-256 of the empty byte string.
pub const EMPTY_ROOT: ArtifactHash = ArtifactHash::from_bytes([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03,
    0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85,
    0xa4, 0x70,
]);

/// Compute keccak-256 of raw bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let hash = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Combine two 32-byte node values into their parent.
///
/// Packed encoding: the 64-byte preimage is the left value's bytes
/// immediately followed by the right value's bytes. Pairing is strictly
/// positional — callers decide which operand is left.
pub fn combine(left: &ArtifactHash, right: &ArtifactHash) -> ArtifactHash {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(left.as_bytes());
    input[32..].copy_from_slice(right.as_bytes());
    ArtifactHash::from_bytes(keccak256(&input))
}
