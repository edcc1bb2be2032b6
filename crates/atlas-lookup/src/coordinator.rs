//! The lookup coordinator.
//!
//! Holds the currently published atlas (snapshot + committed boundaries
//! + spatial index) behind an atomically swapped `Arc` and answers
//! point queries with proof bundles. Tie-breaks are deterministic: the
//! finest-grained layer wins when the caller named none, and within a
//! layer the smallest polygon wins (a point on a shared edge belongs to
//! both neighbors until the area rule picks one).

use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::Serialize;

use atlas_core::boundary::BoundaryType;
use atlas_core::digest::Cid;
use atlas_core::error::{IntegrityError, LookupError};
use atlas_core::Timestamp;
use atlas_crypto::field::fr_to_hex;
use atlas_crypto::FieldHasher;
use atlas_geo::normalize::NormalizedBoundary;
use atlas_merkle::{InclusionProof, ProofService};
use atlas_snapshot::Snapshot;

use crate::index::SpatialIndex;

/// One published snapshot with everything lookups need.
pub struct PublishedAtlas {
    snapshot: Snapshot,
    cid: Cid,
    boundaries: Vec<NormalizedBoundary>,
    index: SpatialIndex,
}

impl PublishedAtlas {
    /// Bundle a snapshot with its committed boundaries. The boundary
    /// table must be the snapshot's leaf order exactly.
    pub fn new(
        snapshot: Snapshot,
        cid: Cid,
        boundaries: Vec<NormalizedBoundary>,
    ) -> Result<Self, IntegrityError> {
        if boundaries.len() != snapshot.leaves().len() {
            return Err(IntegrityError::BoundaryCountMismatch {
                declared: snapshot.boundary_count(),
                leaves: boundaries.len(),
            });
        }
        for (leaf, boundary) in snapshot.leaves().iter().zip(&boundaries) {
            if leaf.boundary_id != boundary.id()
                || leaf.boundary_type != boundary.boundary_type()
            {
                return Err(IntegrityError::MalformedSnapshot(format!(
                    "boundary table out of step with leaf table at {:?}",
                    leaf.boundary_id
                )));
            }
        }
        let index = SpatialIndex::build(&boundaries);
        Ok(Self {
            snapshot,
            cid,
            boundaries,
            index,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }
}

/// A lookup query.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest {
    pub lat: f64,
    pub lon: f64,
    /// Restrict to one layer; `None` prefers the finest match.
    pub layer: Option<BoundaryType>,
    /// Absolute deadline; an expired deadline returns no partial results.
    pub deadline: Option<Instant>,
}

/// The located district, display-ready.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    pub id: String,
    pub name: String,
    pub boundary_type: BoundaryType,
    pub authority: u8,
    pub jurisdiction: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Where the answer came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub snapshot_id: String,
    pub blob_cid: Cid,
    pub merkle_root: String,
    pub retrieved_at: Timestamp,
}

/// The full answer to a lookup: district, proof, provenance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupBundle {
    pub district: DistrictSummary,
    pub coordinates: Coordinates,
    pub merkle_proof: InclusionProof,
    pub provenance: Provenance,
}

/// Serves lookups against the current atlas.
pub struct LookupCoordinator {
    proofs: ProofService,
    current: RwLock<Option<Arc<PublishedAtlas>>>,
}

impl LookupCoordinator {
    pub fn new(hasher: Arc<FieldHasher>) -> Self {
        Self {
            proofs: ProofService::new(hasher),
            current: RwLock::new(None),
        }
    }

    /// Swap in a newly published atlas. Readers holding the previous
    /// `Arc` finish against it; new readers see this one.
    pub fn install(&self, atlas: PublishedAtlas) {
        tracing::info!(
            snapshot_id = atlas.snapshot.snapshot_id(),
            cid = %atlas.cid,
            boundaries = atlas.boundaries.len(),
            "installing published atlas"
        );
        *self.current.write().expect("atlas lock") = Some(Arc::new(atlas));
    }

    /// The currently installed atlas, if any.
    pub fn current(&self) -> Option<Arc<PublishedAtlas>> {
        self.current.read().expect("atlas lock").clone()
    }

    /// Resolve a coordinate to a district with proof and provenance.
    pub fn locate(&self, request: LookupRequest) -> Result<LookupBundle, LookupError> {
        let LookupRequest { lat, lon, .. } = request;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(LookupError::InvalidCoordinate {
                lat,
                lon,
                reason: "coordinates must be finite".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(LookupError::InvalidCoordinate {
                lat,
                lon,
                reason: "outside WGS84 bounds".to_string(),
            });
        }
        let Some(atlas) = self.current() else {
            return Err(LookupError::NotInAnyDistrict);
        };

        let mut matches: Vec<usize> = Vec::new();
        for position in atlas.index.candidates(lon, lat) {
            if let Some(deadline) = request.deadline {
                if Instant::now() >= deadline {
                    return Err(LookupError::DeadlineExceeded);
                }
            }
            let boundary = &atlas.boundaries[position];
            if let Some(layer) = request.layer {
                if boundary.boundary_type() != layer {
                    continue;
                }
            }
            if boundary.geometry().covers_point(lon, lat) {
                matches.push(position);
            }
        }
        let Some(chosen) = self.choose(&atlas, matches) else {
            return Err(LookupError::NotInAnyDistrict);
        };

        let boundary = &atlas.boundaries[chosen];
        let proof = self.proofs.generate(
            atlas.snapshot.leaves(),
            atlas.snapshot.tree(),
            boundary.id(),
            boundary.boundary_type(),
        )?;
        tracing::debug!(
            boundary_id = boundary.id(),
            layer = %boundary.boundary_type(),
            lat,
            lon,
            "resolved district"
        );
        Ok(LookupBundle {
            district: DistrictSummary {
                id: boundary.id().to_string(),
                name: boundary.name().to_string(),
                boundary_type: boundary.boundary_type(),
                authority: boundary.authority().as_u8(),
                jurisdiction: boundary.jurisdiction().to_string(),
            },
            coordinates: Coordinates { lat, lon },
            merkle_proof: proof,
            provenance: Provenance {
                snapshot_id: atlas.snapshot.snapshot_id().to_string(),
                blob_cid: atlas.cid.clone(),
                merkle_root: fr_to_hex(&atlas.snapshot.merkle_root()),
                retrieved_at: Timestamp::now(),
            },
        })
    }

    /// Deterministic choice among containing boundaries: finest layer
    /// first, then smallest area, then id.
    fn choose(&self, atlas: &PublishedAtlas, mut matches: Vec<usize>) -> Option<usize> {
        matches.sort_by(|&a, &b| {
            let ba = &atlas.boundaries[a];
            let bb = &atlas.boundaries[b];
            bb.boundary_type()
                .granularity()
                .cmp(&ba.boundary_type().granularity())
                .then_with(|| {
                    ba.geometry()
                        .area_m2()
                        .partial_cmp(&bb.geometry().area_m2())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| ba.id().cmp(bb.id()))
        });
        matches.first().copied()
    }
}
