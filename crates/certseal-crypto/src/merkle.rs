//! # Merkle Tree — Build, Prove, Verify
//!
//! A positional binary Merkle tree over a batch of artifact hashes.
//!
//! ## Algorithm
//!
//! - Layer 0 is the leaf sequence in submission order.
//! - Layer n+1 pairs layer n positionally: index 2i with 2i+1, combined
//!   via `keccak256(left ‖ right)`.
//! - An unpaired trailing node is promoted to the next layer unchanged —
//!   never hashed with itself.
//! - The root is the single node of the top layer; an empty batch has the
//!   defined [`EMPTY_ROOT`] sentinel as its root.
//!
//! ## Duplicate Leaves
//!
//! Duplicate leaves are rejected at build time with an explicit conflict
//! error. Collapsing them silently would shift every subsequent leaf's
//! index and invalidate previously issued sibling paths.
//!
//! ## Verification Portability
//!
//! [`verify_inclusion`] is a free function over the leaf, the sibling path,
//! and the claimed root. It holds no tree state and can be re-derived
//! inside a smart contract from the same three inputs.

use std::collections::HashSet;

use certseal_core::ArtifactHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keccak::{combine, EMPTY_ROOT};

/// Errors from Merkle tree construction and proof generation.
#[derive(Error, Debug)]
pub enum MerkleError {
    /// The leaf set contained the same hash twice.
    #[error("duplicate leaf at index {index}: {hash}")]
    DuplicateLeaf {
        /// Index of the second occurrence in the submitted sequence.
        index: usize,
        /// The duplicated hash.
        hash: ArtifactHash,
    },

    /// The requested leaf is not part of the tree's leaf layer.
    #[error("leaf not found in tree: {hash}")]
    LeafNotFound {
        /// The hash that was requested.
        hash: ArtifactHash,
    },
}

/// Which side of the accumulator a proof sibling occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The sibling is the left operand: `combine(sibling, acc)`.
    Left,
    /// The sibling is the right operand: `combine(acc, sibling)`.
    Right,
}

/// One level of an inclusion proof: a sibling hash and its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// The sibling node's hash.
    pub sibling: ArtifactHash,
    /// Which side the sibling occupies relative to the accumulator.
    pub side: Side,
}

/// An ordered sibling path from a leaf toward the root.
///
/// Levels where the node had no sibling (odd trailing node promoted
/// unchanged) contribute no step, so a proof may have fewer steps than the
/// tree has levels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InclusionProof(Vec<ProofStep>);

impl InclusionProof {
    /// Wrap an ordered list of proof steps.
    pub fn new(steps: Vec<ProofStep>) -> Self {
        Self(steps)
    }

    /// The ordered steps, leaf level first.
    pub fn steps(&self) -> &[ProofStep] {
        &self.0
    }

    /// Number of steps in the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the trivial proof of a single-leaf or empty tree.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An immutable layered Merkle tree.
///
/// Returned from [`MerkleTree::build`] and threaded explicitly into proof
/// generation — there is no process-wide registry of trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    layers: Vec<Vec<ArtifactHash>>,
    root: ArtifactHash,
}

impl MerkleTree {
    /// Build a tree over a batch of leaves.
    ///
    /// An empty batch yields a one-element root layer holding
    /// [`EMPTY_ROOT`]. A single leaf is its own root.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::DuplicateLeaf`] if the same hash appears
    /// twice; duplicates must be resolved at admission time, not collapsed.
    pub fn build(leaves: &[ArtifactHash]) -> Result<Self, MerkleError> {
        let mut seen = HashSet::with_capacity(leaves.len());
        for (index, leaf) in leaves.iter().enumerate() {
            if !seen.insert(*leaf) {
                return Err(MerkleError::DuplicateLeaf { index, hash: *leaf });
            }
        }

        if leaves.is_empty() {
            return Ok(Self {
                layers: vec![vec![EMPTY_ROOT]],
                root: EMPTY_ROOT,
            });
        }

        let mut layers: Vec<Vec<ArtifactHash>> = vec![leaves.to_vec()];
        while layers[layers.len() - 1].len() > 1 {
            let current = &layers[layers.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                if pair.len() == 2 {
                    next.push(combine(&pair[0], &pair[1]));
                } else {
                    // Odd trailing node: promoted unchanged.
                    next.push(pair[0]);
                }
            }
            layers.push(next);
        }

        let root = layers[layers.len() - 1][0];
        Ok(Self { layers, root })
    }

    /// The root hash summarizing the batch.
    pub fn root(&self) -> &ArtifactHash {
        &self.root
    }

    /// All layers, leaf layer first.
    pub fn layers(&self) -> &[Vec<ArtifactHash>] {
        &self.layers
    }

    /// The leaf layer.
    pub fn leaves(&self) -> &[ArtifactHash] {
        &self.layers[0]
    }

    /// Number of levels including the leaf layer.
    pub fn height(&self) -> usize {
        self.layers.len()
    }

    /// Generate the inclusion proof for a leaf.
    ///
    /// At each layer the sibling index is `index ^ 1`; if it lies within
    /// the layer a step is recorded with the sibling's side, and the index
    /// halves for the parent layer — mirroring the pairing rule exactly.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::LeafNotFound`] when the hash is absent from
    /// the leaf layer.
    pub fn prove_inclusion(&self, leaf: &ArtifactHash) -> Result<InclusionProof, MerkleError> {
        let mut index = self.layers[0]
            .iter()
            .position(|h| h == leaf)
            .ok_or(MerkleError::LeafNotFound { hash: *leaf })?;

        let mut steps = Vec::new();
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling_index = index ^ 1;
            if sibling_index < layer.len() {
                let side = if sibling_index < index {
                    Side::Left
                } else {
                    Side::Right
                };
                steps.push(ProofStep {
                    sibling: layer[sibling_index],
                    side,
                });
            }
            index /= 2;
        }

        Ok(InclusionProof::new(steps))
    }
}

/// Verify an inclusion proof against a claimed root.
///
/// Folds the path left-to-right: the accumulator starts at `leaf`, and
/// each step combines the sibling on its recorded side. Valid iff the
/// final accumulator equals `claimed_root` byte-for-byte. Stateless — the
/// only hidden input is the pairing function itself.
pub fn verify_inclusion(
    leaf: &ArtifactHash,
    proof: &InclusionProof,
    claimed_root: &ArtifactHash,
) -> bool {
    let mut acc = *leaf;
    for step in proof.steps() {
        acc = match step.side {
            Side::Left => combine(&step.sibling, &acc),
            Side::Right => combine(&acc, &step.sibling),
        };
    }
    acc == *claimed_root
}
