//! # atlas-lookup — Point-to-District Resolution
//!
//! Given a coordinate, find the enclosing boundary in the current
//! snapshot and hand back a proof bundle: the district, the inclusion
//! proof against the published root, and the provenance needed to audit
//! where that answer came from.
//!
//! Reads are concurrent and never block a publish: the coordinator
//! holds the published atlas behind an atomically swapped `Arc`, and a
//! reader that started before a swap finishes against the snapshot it
//! started with.

pub mod coordinator;
pub mod index;

pub use coordinator::{
    Coordinates, DistrictSummary, LookupBundle, LookupCoordinator, LookupRequest, Provenance,
    PublishedAtlas,
};
pub use index::SpatialIndex;
