//! # atlas-merkle — The Commitment Engine
//!
//! Builds the deterministic, fixed-depth Merkle tree a snapshot commits
//! to, and produces the proofs and circuit witnesses that bind a single
//! boundary to a published root.
//!
//! ## Determinism
//!
//! Admitted boundaries are sorted by `(layer canonical name, id)` before
//! hashing; input order never reaches the tree. The leaf hash commits
//! the layer tag, the id, the canonical geometry, and the publishing
//! authority, so neither a cross-layer duplicate nor a cross-authority
//! republication can forge an existing leaf.
//!
//! ## Fixed depth
//!
//! One snapshot declares one depth D ∈ {14, 20, 22} and every proof
//! carries exactly D siblings, so the external circuit's constraint system
//! is shape-invariant. The conceptual leaf array is padded to 2^D with
//! the all-zero-preimage padding leaf; the realization is sparse
//! (per-level padding hashes plus the occupied prefix), bit-identical to
//! the dense construction at O(N·D) memory instead of O(2^D).

pub mod leaf;
pub mod proof;
pub mod tree;
pub mod witness;

pub use leaf::{boundary_sort_cmp, hash_boundary_leaf, MerkleLeaf};
pub use proof::{InclusionProof, ProofService};
pub use tree::MerkleTree;
pub use witness::{CircuitWitness, WitnessRequest};
