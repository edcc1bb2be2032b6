//! # atlas-core — Foundational Types for Shadow Atlas
//!
//! This crate is the bedrock of the Shadow Atlas workspace. It defines the
//! primitives every other crate builds on; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL content-digest computation flows
//!    through `CanonicalBytes::new()`, which produces RFC 8785 (JCS) bytes
//!    with keys sorted recursively at every nesting level. No raw
//!    `serde_json::to_vec()` for digests anywhere in the workspace.
//!
//! 2. **Closed boundary taxonomy.** `BoundaryType` is a six-variant enum
//!    with canonical kebab-case names; its lexicographic name order is the
//!    tree ordering, and its numeric tag is the leaf-hash domain tag.
//!    `AuthorityLevel` is a validated 1..=5 newtype.
//!
//! 3. **UTC-only timestamps.** `Timestamp` enforces UTC with `Z` suffix and
//!    seconds precision, matching the canonical serialization rules.
//!
//! 4. **Typed errors per failure class.** Input, validation, integrity,
//!    environmental, and fatal configuration errors are distinct enums;
//!    callers cannot confuse a retryable store outage with a trust failure.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `atlas-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod boundary;
pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod temporal;

pub use boundary::{AuthorityLevel, BoundaryType};
pub use canonical::CanonicalBytes;
pub use config::{AtlasConfig, ExpectedCount, TessellationConfig, TreeDepth, POSEIDON_VARIANT};
pub use digest::{blob_digest, content_digest, Cid, ContentDigest, DigestAlgorithm};
pub use error::{
    CanonicalizationError, ConfigError, FieldError, IntegrityError, LookupError, MerkleError,
    NormalizeError, ProofError, StoreError,
};
pub use temporal::Timestamp;
