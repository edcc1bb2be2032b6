//! Fixed-depth Merkle tree construction.
//!
//! The conceptual tree has exactly 2^D leaves, the occupied prefix
//! followed by padding leaves. Stored state is the occupied prefix of
//! every layer plus one precomputed all-padding hash per level; a node
//! past the occupied prefix of its layer *is* that level's padding hash.
//! The two views produce the same nodes, the same root, and the same
//! proofs, but this one holds a 2^22 snapshot in O(N·D) memory.

use atlas_core::config::TreeDepth;
use atlas_core::error::MerkleError;
use atlas_crypto::{FieldHasher, Fr};

/// A committed tree: layer 0 is the leaves, layer `depth` is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleTree {
    depth: u8,
    /// Occupied prefix of each layer, `layers[0]` the leaf hashes.
    layers: Vec<Vec<Fr>>,
    /// `pad[l]` is the root of an all-padding subtree of height `l`.
    pad: Vec<Fr>,
}

impl MerkleTree {
    /// Build the tree over leaf hashes already in deterministic order.
    ///
    /// # Errors
    ///
    /// `MerkleError::CapacityExceeded` when more than 2^D leaves are
    /// supplied. There is no odd-layer special case: padding makes every
    /// layer even by construction.
    pub fn build(
        hasher: &FieldHasher,
        leaf_hashes: &[Fr],
        depth: TreeDepth,
    ) -> Result<Self, MerkleError> {
        let d = usize::from(depth.as_u8());
        if leaf_hashes.len() > depth.capacity() {
            return Err(MerkleError::CapacityExceeded {
                leaves: leaf_hashes.len(),
                depth: depth.as_u8(),
            });
        }

        let mut pad = Vec::with_capacity(d + 1);
        pad.push(hasher.pad_leaf());
        for level in 0..d {
            let p = pad[level];
            pad.push(hasher.hash_pair(p, p));
        }

        let mut layers = Vec::with_capacity(d + 1);
        layers.push(leaf_hashes.to_vec());
        for level in 0..d {
            let current = &layers[level];
            let next_len = current.len().div_ceil(2);
            let mut next = Vec::with_capacity(next_len);
            for i in 0..next_len {
                let left = current[2 * i];
                let right = current.get(2 * i + 1).copied().unwrap_or(pad[level]);
                next.push(hasher.hash_pair(left, right));
            }
            layers.push(next);
        }

        tracing::debug!(
            depth = depth.as_u8(),
            leaves = leaf_hashes.len(),
            "built merkle tree"
        );
        Ok(Self {
            depth: depth.as_u8(),
            layers,
            pad,
        })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// The committed root. For an empty snapshot this is the D-level
    /// fold of the padding leaf.
    pub fn root(&self) -> Fr {
        let top = usize::from(self.depth);
        self.layers[top].first().copied().unwrap_or(self.pad[top])
    }

    /// Node at (level, index) in the conceptual dense tree.
    pub fn node(&self, level: usize, index: usize) -> Fr {
        self.layers[level]
            .get(index)
            .copied()
            .unwrap_or(self.pad[level])
    }

    /// Occupied prefixes of every layer, leaves first.
    pub fn layers(&self) -> &[Vec<Fr>] {
        &self.layers
    }

    /// Sibling path for a leaf: D sibling hashes and D path bits, where
    /// bit = 1 means the node on the path is a right child (its sibling
    /// is on the left).
    pub fn path(&self, leaf_index: usize) -> (Vec<Fr>, Vec<u8>) {
        let d = usize::from(self.depth);
        let mut siblings = Vec::with_capacity(d);
        let mut bits = Vec::with_capacity(d);
        let mut index = leaf_index;
        for level in 0..d {
            siblings.push(self.node(level, index ^ 1));
            bits.push((index & 1) as u8);
            index >>= 1;
        }
        (siblings, bits)
    }
}
