//! Leaf hashing and the deterministic leaf order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_crypto::field::{serde_fr, Fr};
use atlas_crypto::FieldHasher;
use atlas_geo::normalize::NormalizedBoundary;

/// One committed leaf: the hash plus the identifying attributes that
/// let consumers find and display it without re-deriving anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleLeaf {
    #[serde(with = "serde_fr")]
    pub leaf_hash: Fr,
    pub boundary_id: String,
    pub boundary_type: BoundaryType,
    pub boundary_name: String,
    pub index: u32,
}

/// The tree's total order: layer canonical name ascending, then id
/// ascending. Ids are unique within a (jurisdiction, layer) group, so
/// admitted sets have no ties.
pub fn boundary_sort_cmp(a: &NormalizedBoundary, b: &NormalizedBoundary) -> Ordering {
    (a.boundary_type(), a.id()).cmp(&(b.boundary_type(), b.id()))
}

/// The leaf hash: `hash_n([tag(type), H(id), H(geometry), authority])`.
///
/// The layer tag is position 0 and nonzero, which separates every real
/// leaf from the padding leaf and makes a cross-layer collision as hard
/// as breaking the permutation itself.
pub fn hash_boundary_leaf(hasher: &FieldHasher, boundary: &NormalizedBoundary) -> Fr {
    hasher.hash_n(&[
        Fr::from(boundary.boundary_type().tag()),
        hasher.hash_string(boundary.id()),
        hasher.hash_geometry(boundary.geometry()),
        Fr::from(u64::from(boundary.authority().as_u8())),
    ])
}
