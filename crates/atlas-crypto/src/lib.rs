//! # atlas-crypto — Poseidon2 Field Hashing
//!
//! The hash primitives every committed value flows through. One
//! permutation (Poseidon2 over the BN254 scalar field, width 3, the
//! Horizen Labs reference parameter set), one sponge convention, and
//! domain separation for every input class, so no two distinct inputs
//! can share a preimage shape:
//!
//! - `hash_n` for arities 1/2/4, each under its own capacity constant;
//! - `hash_pair` (non-commutative) for tree nodes;
//! - `hash_string` over length-prefixed 31-byte big-endian limbs;
//! - `hash_geometry` over fixed-point microdegree ring streams.
//!
//! The external proof circuit re-implements exactly this arithmetic; any
//! deviation here silently invalidates every published root, which is
//! why the parameter set is pinned behind a single recognized label and
//! construction fails on anything else.
//!
//! Field elements entering from outside (hex strings in proofs and
//! witnesses) are range-checked and rejected when out of field, never
//! reduced.

pub mod field;
pub mod hasher;

pub use field::{fr_from_hex, fr_to_hex, Fr};
pub use hasher::FieldHasher;
