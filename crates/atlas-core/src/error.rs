//! # Error Hierarchy
//!
//! One enum per failure class, mirroring how failures propagate:
//!
//! - **Input errors** (`NormalizeError`, `FieldError`, parts of
//!   `LookupError`) — caller-fixable, surfaced directly.
//! - **Validation issues** are *not* errors: they are collected into
//!   per-snapshot reports (see `atlas-validate`) and quarantine data
//!   while the build proceeds.
//! - **Integrity errors** (`IntegrityError`) — trust failures; the
//!   operation aborts and nothing is committed.
//! - **Environmental errors** (`StoreError::Unavailable`,
//!   `DeadlineExceeded`) — retryable with backoff.
//! - **Fatal configuration errors** (`ConfigError`) — programmer or
//!   deployment error, refused at startup.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical bytes; field elements
    /// are hex strings and counts are integers.
    #[error("float values are not permitted in canonical bytes: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Fatal configuration error, refused at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The Poseidon parameter set label is not the one recognized value.
    #[error("unknown poseidon variant {0:?}; this build recognizes exactly one parameter set")]
    UnknownPoseidonVariant(String),

    /// Merkle depth outside the supported authority tiers.
    #[error("unsupported merkle depth {0}; supported depths are 14, 20, 22")]
    UnsupportedDepth(u8),

    /// Geometry precision incompatible with the fixed-point leaf encoding.
    #[error("geometry precision of {0} decimals exceeds the microdegree fixed-point encoding")]
    UnsupportedPrecision(u8),

    /// Authority level outside 1..=5.
    #[error("authority level {0} outside 1..=5")]
    AuthorityOutOfRange(u8),
}

/// A value that is not a valid BN254 scalar on an external input path.
#[derive(Error, Debug)]
pub enum FieldError {
    /// The encoded value is >= the field modulus. Rejected, never reduced.
    #[error("field element out of range: {0}")]
    OutOfRange(String),

    /// Not a 0x-prefixed 64-nibble hex string.
    #[error("malformed field element encoding: {0}")]
    Malformed(String),
}

/// Typed rejection from the boundary normalizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// Source declares a spatial reference this pipeline cannot re-project.
    #[error("unknown projection {0:?}")]
    UnknownProjection(String),

    /// Ring collapsed below 4 points, or no usable rings remain.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Coordinate outside WGS84 bounds or non-finite.
    #[error("coordinate out of range: ({lon}, {lat})")]
    CoordinateOutOfRange { lon: f64, lat: f64 },

    /// Geometry is not a Polygon or MultiPolygon.
    #[error("wrong geometry type: {0}")]
    WrongGeometryType(String),

    /// A boundary with this id already exists in the (jurisdiction, layer) group.
    #[error("duplicate boundary id {0:?}")]
    DuplicateId(String),

    /// A source attribute required for the layer id format is absent.
    #[error("missing required attribute {0:?}")]
    MissingRequiredAttribute(String),
}

/// Trust failure. Operations that hit one abort and commit nothing.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// Fetched bytes do not hash to the requested address.
    #[error("content hash mismatch: expected {expected}, computed {actual}")]
    ContentHashMismatch { expected: String, actual: String },

    /// Snapshot boundary count disagrees with its leaf table.
    #[error("boundary count mismatch: declared {declared}, leaves {leaves}")]
    BoundaryCountMismatch { declared: u32, leaves: usize },

    /// Snapshot bytes that do not parse into the canonical schema.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Merkle construction failure.
#[derive(Error, Debug)]
pub enum MerkleError {
    /// More leaves than a depth-D tree can hold.
    #[error("{leaves} leaves exceed capacity of depth-{depth} tree")]
    CapacityExceeded { leaves: usize, depth: u8 },
}

/// Proof-path failure.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The requested boundary is not a leaf of the snapshot's tree.
    #[error("boundary {boundary_id:?} ({boundary_type}) not in tree")]
    BoundaryNotInTree {
        boundary_id: String,
        boundary_type: String,
    },

    /// Sibling path length does not equal the snapshot depth. A proof
    /// with the wrong path length is never emitted and never accepted.
    #[error("depth mismatch: expected {expected} siblings, got {actual}")]
    DepthMismatch { expected: u8, actual: usize },

    /// An external witness input was not a valid field element.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Blob-store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store unreachable or timed out; retryable.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    /// Caller-supplied deadline expired before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Fetched or stored content failed verification.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Snapshot could not be canonically serialized for storage.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Publish refused because the integrity report carries errors.
    #[error("refusing to publish: {0} integrity error(s)")]
    PublishRefused(usize),
}

/// Lookup failure returned to the HTTP layer.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Non-finite or out-of-range coordinates.
    #[error("invalid coordinate ({lat}, {lon}): {reason}")]
    InvalidCoordinate { lat: f64, lon: f64, reason: String },

    /// No boundary of any layer contains the point.
    #[error("not in any district")]
    NotInAnyDistrict,

    /// Caller deadline expired mid-scan; no partial results.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Proof assembly failed for a located boundary.
    #[error(transparent)]
    Proof(#[from] ProofError),
}
