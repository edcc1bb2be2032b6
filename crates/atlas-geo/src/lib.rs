//! # atlas-geo — Canonical Geometry and the Boundary Normalizer
//!
//! Everything upstream of hashing that touches coordinates lives here.
//! The scraper hands over GeoJSON-shaped records; this crate turns them
//! into [`NormalizedBoundary`] values whose geometry is canonical:
//! WGS84, ring winding per RFC 7946, consecutive duplicates removed,
//! coordinates rounded to a fixed number of decimals. That rounded form
//! is exactly what the leaf hash sees, so two runs over the same source
//! produce bit-identical commitments.
//!
//! Spatial predicates (containment, intersection, area, centroid) are
//! delegated to the `geo` crate; polygons are otherwise opaque here.

pub mod geometry;
pub mod intake;
pub mod normalize;

pub use geometry::{CanonicalGeometry, FixedRing};
pub use intake::{raw_boundary_from_feature, AttributeSchema};
pub use normalize::{BoundaryNormalizer, NormalizedBoundary, RawBoundary};
