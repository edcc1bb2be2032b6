//! Inclusion proof generation and verification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_core::error::ProofError;
use atlas_crypto::field::{serde_fr, serde_fr_vec, Fr};
use atlas_crypto::FieldHasher;

use crate::leaf::MerkleLeaf;
use crate::tree::MerkleTree;

/// An inclusion proof binding one boundary to a snapshot root.
///
/// `path_indices[l] == 1` means the node on the path is a right child at
/// level `l`; verification always hashes left before right. The sibling
/// count equals the snapshot depth; proofs of any other shape are never
/// produced and never accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    #[serde(with = "serde_fr")]
    pub root: Fr,
    #[serde(with = "serde_fr")]
    pub leaf: Fr,
    #[serde(with = "serde_fr_vec")]
    pub siblings: Vec<Fr>,
    pub path_indices: Vec<u8>,
    pub boundary_id: String,
    pub boundary_type: BoundaryType,
}

impl InclusionProof {
    /// The leaf index encoded by the path bits.
    pub fn leaf_index(&self) -> u64 {
        self.path_indices
            .iter()
            .enumerate()
            .fold(0u64, |acc, (level, bit)| acc | (u64::from(*bit) << level))
    }
}

/// Generates and verifies inclusion proofs against a committed tree.
pub struct ProofService {
    hasher: Arc<FieldHasher>,
}

impl ProofService {
    pub fn new(hasher: Arc<FieldHasher>) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &FieldHasher {
        &self.hasher
    }

    /// Locate a boundary in the deterministic leaf order and assemble
    /// its proof. The leaf table must be the committed order of `tree`.
    pub fn generate(
        &self,
        leaves: &[MerkleLeaf],
        tree: &MerkleTree,
        boundary_id: &str,
        boundary_type: BoundaryType,
    ) -> Result<InclusionProof, ProofError> {
        let index = leaves
            .binary_search_by(|leaf| {
                (leaf.boundary_type, leaf.boundary_id.as_str()).cmp(&(boundary_type, boundary_id))
            })
            .map_err(|_| ProofError::BoundaryNotInTree {
                boundary_id: boundary_id.to_string(),
                boundary_type: boundary_type.to_string(),
            })?;
        let leaf = &leaves[index];
        let (siblings, path_indices) = tree.path(index);
        if siblings.len() != usize::from(tree.depth()) {
            return Err(ProofError::DepthMismatch {
                expected: tree.depth(),
                actual: siblings.len(),
            });
        }
        Ok(InclusionProof {
            root: tree.root(),
            leaf: leaf.leaf_hash,
            siblings,
            path_indices,
            boundary_id: leaf.boundary_id.clone(),
            boundary_type: leaf.boundary_type,
        })
    }

    /// Pure verification: recompute the root from the leaf and sibling
    /// path and compare. Never errors: a malformed proof is simply
    /// invalid. Agrees bit-for-bit with the in-circuit verifier.
    pub fn verify(
        &self,
        proof: &InclusionProof,
        expected_root: Fr,
        expected_depth: u8,
        boundary_id: &str,
        boundary_type: BoundaryType,
    ) -> bool {
        let depth = usize::from(expected_depth);
        if proof.siblings.len() != depth || proof.path_indices.len() != depth {
            return false;
        }
        if proof.path_indices.iter().any(|bit| *bit > 1) {
            return false;
        }
        if proof.boundary_id != boundary_id || proof.boundary_type != boundary_type {
            return false;
        }
        if proof.root != expected_root {
            return false;
        }
        let mut current = proof.leaf;
        for (sibling, bit) in proof.siblings.iter().zip(&proof.path_indices) {
            current = if *bit == 1 {
                self.hasher.hash_pair(*sibling, current)
            } else {
                self.hasher.hash_pair(current, *sibling)
            };
        }
        current == expected_root
    }
}
