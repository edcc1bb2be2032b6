//! The snapshot build lifecycle.
//!
//! A builder owns its boundaries until commit: single-threaded by
//! construction, nothing shared. Intake rejections and quarantined
//! groups accumulate in the quarantine report; the build keeps going.
//! The caller supplies `generated_at`, so two builds over the same
//! input produce byte-identical snapshots.

use std::collections::BTreeMap;

use thiserror::Error;

use atlas_core::boundary::BoundaryType;
use atlas_core::config::AtlasConfig;
use atlas_core::digest::Cid;
use atlas_core::error::{CanonicalizationError, ConfigError, MerkleError, NormalizeError};
use atlas_core::Timestamp;
use atlas_crypto::field::{fr_to_hex, Fr};
use atlas_crypto::FieldHasher;
use atlas_geo::geometry::CanonicalGeometry;
use atlas_geo::normalize::NormalizedBoundary;
use atlas_merkle::{boundary_sort_cmp, hash_boundary_leaf, MerkleLeaf, MerkleTree};
use atlas_validate::{IntegrityReport, IntegrityVerifier, TessellationValidator, TessellationVerdict};

use crate::snapshot::{
    QuarantineReport, QuarantinedGroup, RejectedBoundary, Snapshot, SnapshotMetadata,
};

/// Fatal build failure. Data-quality findings never land here; they
/// quarantine and the build proceeds.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

/// The outcome of a build: the snapshot, the committed boundaries in
/// leaf order (the lookup layer indexes these), and the integrity
/// report publication is gated on.
pub struct SnapshotBuild {
    pub snapshot: Snapshot,
    pub boundaries: Vec<NormalizedBoundary>,
    pub integrity: IntegrityReport,
}

/// Accumulates normalized boundaries into a committed snapshot.
pub struct SnapshotBuilder {
    config: AtlasConfig,
    hasher: std::sync::Arc<FieldHasher>,
    generated_at: Timestamp,
    tiger_version: String,
    previous_cid: Option<Cid>,
    source_hashes: BTreeMap<String, String>,
    jurisdictions: BTreeMap<String, CanonicalGeometry>,
    groups: BTreeMap<(String, BoundaryType), Vec<NormalizedBoundary>>,
    quarantine: QuarantineReport,
    warnings: Vec<String>,
}

impl SnapshotBuilder {
    /// Start a build. Validates the configuration; an unrecognized
    /// Poseidon variant or depth is refused here, at startup.
    pub fn new(
        config: AtlasConfig,
        hasher: std::sync::Arc<FieldHasher>,
        generated_at: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            hasher,
            generated_at,
            tiger_version: String::new(),
            previous_cid: None,
            source_hashes: BTreeMap::new(),
            jurisdictions: BTreeMap::new(),
            groups: BTreeMap::new(),
            quarantine: QuarantineReport::default(),
            warnings: Vec::new(),
        })
    }

    /// Label the upstream source release this build was cut from.
    pub fn set_tiger_version(&mut self, version: impl Into<String>) {
        self.tiger_version = version.into();
    }

    /// Chain this snapshot onto its predecessor.
    pub fn set_previous_cid(&mut self, cid: Cid) {
        self.previous_cid = Some(cid);
    }

    /// Record the content hash of a raw source export.
    pub fn record_source_hash(&mut self, layer: BoundaryType, hex: impl Into<String>) {
        self.source_hashes.insert(layer.as_str().to_string(), hex.into());
    }

    /// Register a jurisdiction polygon for tessellation measurement.
    pub fn register_jurisdiction(&mut self, id: impl Into<String>, geometry: CanonicalGeometry) {
        self.jurisdictions.insert(id.into(), geometry);
    }

    /// Take in one normalized boundary.
    ///
    /// A duplicate id within its (jurisdiction, layer) group is an input
    /// error and is also recorded in the quarantine report. An intake
    /// integrity failure (a record that decayed since normalization)
    /// quarantines the record without failing the call.
    pub fn ingest(&mut self, boundary: NormalizedBoundary) -> Result<(), NormalizeError> {
        let key = (
            boundary.jurisdiction().to_string(),
            boundary.boundary_type(),
        );
        let group = self.groups.entry(key).or_default();
        if group.iter().any(|b| b.id() == boundary.id()) {
            let id = boundary.id().to_string();
            self.quarantine.rejected.push(RejectedBoundary {
                boundary_id: Some(id.clone()),
                reason: format!("duplicate id {id:?} in group"),
            });
            return Err(NormalizeError::DuplicateId(id));
        }

        let mut intake = IntegrityReport::default();
        IntegrityVerifier::new(self.config.expected_counts.clone())
            .check_boundary(&boundary, &mut intake);
        if !intake.is_valid() {
            tracing::warn!(
                boundary_id = boundary.id(),
                errors = ?intake.errors,
                "quarantining boundary at intake"
            );
            self.quarantine.rejected.push(RejectedBoundary {
                boundary_id: Some(boundary.id().to_string()),
                reason: intake.errors.join("; "),
            });
            return Ok(());
        }
        self.warnings.extend(intake.warnings);
        group.push(boundary);
        Ok(())
    }

    /// Record a rejection that happened upstream in the normalizer, so
    /// the snapshot's quarantine report reflects the whole run.
    pub fn record_rejection(&mut self, boundary_id: Option<String>, error: &NormalizeError) {
        self.quarantine.rejected.push(RejectedBoundary {
            boundary_id,
            reason: error.to_string(),
        });
    }

    /// Run the gates, order the survivors, and commit the tree.
    pub fn build(mut self) -> Result<SnapshotBuild, BuildError> {
        let validator = TessellationValidator::new(
            self.config.tessellation.clone(),
            self.config.consolidated_jurisdictions.clone(),
            self.config.at_large_cities.clone(),
        );
        let verifier = IntegrityVerifier::new(self.config.expected_counts.clone());

        let mut admitted: Vec<NormalizedBoundary> = Vec::new();
        for ((jurisdiction_id, layer), boundaries) in std::mem::take(&mut self.groups) {
            let refs: Vec<&NormalizedBoundary> = boundaries.iter().collect();
            let verdict = validator.validate_group(
                &jurisdiction_id,
                layer,
                self.jurisdictions.get(&jurisdiction_id),
                &refs,
            );
            match verdict {
                TessellationVerdict::Valid => admitted.extend(boundaries),
                TessellationVerdict::Warn(issues) => {
                    for issue in &issues {
                        self.warnings
                            .push(format!("{jurisdiction_id}/{layer}: {issue:?}"));
                    }
                    admitted.extend(boundaries);
                }
                TessellationVerdict::Fail(issues) => {
                    tracing::warn!(
                        jurisdiction = %jurisdiction_id,
                        layer = %layer,
                        boundaries = boundaries.len(),
                        "quarantining group after tessellation failure"
                    );
                    self.quarantine.groups.push(QuarantinedGroup {
                        jurisdiction: jurisdiction_id,
                        layer,
                        issues,
                    });
                }
            }
        }

        admitted.sort_by(boundary_sort_cmp);

        let mut integrity = IntegrityReport::default();
        for entry in &self.config.expected_counts {
            let actual = admitted
                .iter()
                .filter(|b| b.boundary_type() == entry.layer)
                .count();
            verifier.check_layer_count(&entry.country, entry.layer, actual, &mut integrity);
        }

        let leaves: Vec<MerkleLeaf> = admitted
            .iter()
            .enumerate()
            .map(|(i, b)| MerkleLeaf {
                leaf_hash: hash_boundary_leaf(&self.hasher, b),
                boundary_id: b.id().to_string(),
                boundary_type: b.boundary_type(),
                boundary_name: b.name().to_string(),
                index: i as u32,
            })
            .collect();
        let hashes: Vec<Fr> = leaves.iter().map(|l| l.leaf_hash).collect();
        let tree = MerkleTree::build(&self.hasher, &hashes, self.config.depth)?;

        let snapshot_id = format!(
            "snap-{}-d{}",
            &fr_to_hex(&tree.root())[2..18],
            self.config.depth.as_u8()
        );
        let metadata = SnapshotMetadata {
            snapshot_id,
            generated_at: self.generated_at,
            tiger_version: self.tiger_version,
            source_hashes: self.source_hashes,
            previous_cid: self.previous_cid,
            quarantine: self.quarantine,
            warnings: self.warnings,
        };
        let snapshot = Snapshot::from_parts(self.config.depth, leaves, tree, metadata);
        integrity.merge(snapshot.verify_integrity(&self.hasher));

        tracing::info!(
            snapshot_id = snapshot.snapshot_id(),
            boundaries = snapshot.boundary_count(),
            quarantined_groups = snapshot.metadata().quarantine.groups.len(),
            rejected = snapshot.metadata().quarantine.rejected.len(),
            root = %fr_to_hex(&snapshot.merkle_root()),
            "snapshot built"
        );
        Ok(SnapshotBuild {
            snapshot,
            boundaries: admitted,
            integrity,
        })
    }
}
