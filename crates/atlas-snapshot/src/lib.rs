//! # atlas-snapshot — Immutable Snapshots and Their Store
//!
//! A snapshot is the atomic unit of publication: the committed leaf
//! table, the Merkle root, and provenance metadata, serialized to
//! canonical bytes whose SHA-256 digest is the snapshot's address.
//!
//! ## Lifecycle
//!
//! `SnapshotBuilder` owns the boundaries of an in-flight build:
//! intake (duplicate and integrity gates) → tessellation gate per
//! (jurisdiction, layer) group → deterministic sort → leaf hashing →
//! tree construction → assembly. Quarantined groups and rejected
//! records travel in the snapshot's metadata rather than aborting the
//! build; only integrity errors block publication.
//!
//! `SnapshotStore::publish` writes the blob, fetches it back and
//! re-verifies it, and only then swaps the pointer; a reader of
//! `pointers/current` sees either the old snapshot or the new one,
//! never anything in between.
//!
//! ## First law of the store
//!
//! `put` then `get` round-trips to bit-identical bytes, and
//! deserialize-then-reserialize is also bit-identical.

pub mod builder;
pub mod snapshot;
pub mod store;

pub use builder::{BuildError, SnapshotBuild, SnapshotBuilder};
pub use snapshot::{QuarantineReport, Snapshot, SnapshotMetadata, SNAPSHOT_FORMAT_VERSION};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, RetryPolicy, SnapshotStore};
