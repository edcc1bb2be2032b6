//! The snapshot model and its canonical byte form.
//!
//! The canonical schema carries `version`, `depth`, `root`,
//! `boundaryCount`, `layerCounts`, `leaves` and `metadata`; byte
//! production is JCS, so keys are sorted recursively at every level and
//! the same snapshot always yields the same bytes, the same digest, and
//! the same address. The tree itself is derived state: it is rebuilt
//! from the leaf table on deserialization and checked against the
//! declared root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_core::config::TreeDepth;
use atlas_core::digest::{content_digest, Cid};
use atlas_core::error::{CanonicalizationError, IntegrityError};
use atlas_core::{CanonicalBytes, Timestamp};
use atlas_crypto::field::{fr_to_hex, serde_fr, Fr};
use atlas_crypto::FieldHasher;
use atlas_merkle::{MerkleLeaf, MerkleTree};
use atlas_validate::{IntegrityReport, ValidationIssue};

/// Canonical schema version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A (jurisdiction, layer) group refused admission, with its findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantinedGroup {
    pub jurisdiction: String,
    pub layer: BoundaryType,
    pub issues: Vec<ValidationIssue>,
}

/// A single record rejected at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedBoundary {
    pub boundary_id: Option<String>,
    pub reason: String,
}

/// Everything that was kept out of the committed tree, and why.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineReport {
    pub groups: Vec<QuarantinedGroup>,
    pub rejected: Vec<RejectedBoundary>,
}

impl QuarantineReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.rejected.is_empty()
    }
}

/// Snapshot provenance. `previous_cid` forms the append-only chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub snapshot_id: String,
    pub generated_at: Timestamp,
    /// Upstream source release label (opaque).
    pub tiger_version: String,
    /// Per-layer content hashes of the raw source exports.
    pub source_hashes: BTreeMap<String, String>,
    pub previous_cid: Option<Cid>,
    pub quarantine: QuarantineReport,
    pub warnings: Vec<String>,
}

/// The canonical serialized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SnapshotBody {
    version: u32,
    depth: TreeDepth,
    #[serde(with = "serde_fr")]
    root: Fr,
    boundary_count: u32,
    layer_counts: BTreeMap<String, u32>,
    leaves: Vec<MerkleLeaf>,
    metadata: SnapshotMetadata,
}

/// An immutable committed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    body: SnapshotBody,
    tree: MerkleTree,
}

impl Snapshot {
    /// Assemble a snapshot from already-validated parts. Only the
    /// builder calls this; the leaf table must be in committed order
    /// and `tree` must be built over exactly these leaves.
    pub(crate) fn from_parts(
        depth: TreeDepth,
        leaves: Vec<MerkleLeaf>,
        tree: MerkleTree,
        metadata: SnapshotMetadata,
    ) -> Self {
        let mut layer_counts: BTreeMap<String, u32> = BTreeMap::new();
        for leaf in &leaves {
            *layer_counts
                .entry(leaf.boundary_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        let body = SnapshotBody {
            version: SNAPSHOT_FORMAT_VERSION,
            depth,
            root: tree.root(),
            boundary_count: leaves.len() as u32,
            layer_counts,
            leaves,
            metadata,
        };
        Self { body, tree }
    }

    /// Canonical bytes of the snapshot. Hashing these bytes yields the
    /// snapshot's blob address.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&self.body)
    }

    /// The snapshot's content address.
    pub fn cid(&self) -> Result<Cid, CanonicalizationError> {
        Ok(Cid::from_digest(&content_digest(&self.canonical_bytes()?)))
    }

    /// Parse canonical bytes, rebuild the tree, and verify the declared
    /// root. Anything that does not parse, re-hash, and re-root exactly
    /// is refused.
    pub fn from_canonical_bytes(bytes: &[u8], hasher: &FieldHasher) -> Result<Self, IntegrityError> {
        let body: SnapshotBody = serde_json::from_slice(bytes)
            .map_err(|e| IntegrityError::MalformedSnapshot(e.to_string()))?;
        if body.version != SNAPSHOT_FORMAT_VERSION {
            return Err(IntegrityError::MalformedSnapshot(format!(
                "unsupported snapshot version {}",
                body.version
            )));
        }
        if body.boundary_count as usize != body.leaves.len() {
            return Err(IntegrityError::BoundaryCountMismatch {
                declared: body.boundary_count,
                leaves: body.leaves.len(),
            });
        }
        let hashes: Vec<Fr> = body.leaves.iter().map(|l| l.leaf_hash).collect();
        let tree = MerkleTree::build(hasher, &hashes, body.depth)
            .map_err(|e| IntegrityError::MalformedSnapshot(e.to_string()))?;
        if tree.root() != body.root {
            return Err(IntegrityError::MalformedSnapshot(format!(
                "declared root {} does not match recomputed {}",
                fr_to_hex(&body.root),
                fr_to_hex(&tree.root())
            )));
        }
        Ok(Self { body, tree })
    }

    pub fn snapshot_id(&self) -> &str {
        &self.body.metadata.snapshot_id
    }

    pub fn merkle_root(&self) -> Fr {
        self.body.root
    }

    pub fn depth(&self) -> TreeDepth {
        self.body.depth
    }

    pub fn boundary_count(&self) -> u32 {
        self.body.boundary_count
    }

    pub fn layer_counts(&self) -> &BTreeMap<String, u32> {
        &self.body.layer_counts
    }

    /// The leaf table in committed order.
    pub fn leaves(&self) -> &[MerkleLeaf] {
        &self.body.leaves
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.body.metadata
    }

    /// Snapshot sanity checks: count agreement, leaf order and index
    /// contiguity, root recomputation, previous-CID shape.
    pub fn verify_integrity(&self, hasher: &FieldHasher) -> IntegrityReport {
        let mut report = IntegrityReport::default();

        if self.body.boundary_count as usize != self.body.leaves.len() {
            report.error(format!(
                "boundary count {} disagrees with {} leaves",
                self.body.boundary_count,
                self.body.leaves.len()
            ));
        }
        let declared_total: u64 = self.body.layer_counts.values().map(|&c| u64::from(c)).sum();
        if declared_total != self.body.leaves.len() as u64 {
            report.error(format!(
                "layer counts sum to {declared_total}, expected {}",
                self.body.leaves.len()
            ));
        }
        for (i, pair) in self.body.leaves.windows(2).enumerate() {
            let key = |l: &MerkleLeaf| (l.boundary_type, l.boundary_id.clone());
            if key(&pair[0]) >= key(&pair[1]) {
                report.error(format!("leaves out of committed order at index {i}"));
            }
        }
        for (i, leaf) in self.body.leaves.iter().enumerate() {
            if leaf.index as usize != i {
                report.error(format!(
                    "leaf {} carries index {}, expected {}",
                    leaf.boundary_id, leaf.index, i
                ));
                break;
            }
        }
        let hashes: Vec<Fr> = self.body.leaves.iter().map(|l| l.leaf_hash).collect();
        match MerkleTree::build(hasher, &hashes, self.body.depth) {
            Ok(tree) if tree.root() == self.body.root => {}
            Ok(tree) => report.error(format!(
                "root mismatch: declared {}, recomputed {}",
                fr_to_hex(&self.body.root),
                fr_to_hex(&tree.root())
            )),
            Err(e) => report.error(e.to_string()),
        }
        if let Some(previous) = &self.body.metadata.previous_cid {
            if Cid::parse(previous.as_str()).is_err() {
                report.error(format!("malformed previous cid {previous}"));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::config::POSEIDON_VARIANT;
    use atlas_crypto::FieldHasher;

    fn hasher() -> FieldHasher {
        FieldHasher::new(POSEIDON_VARIANT).unwrap()
    }

    fn metadata() -> SnapshotMetadata {
        SnapshotMetadata {
            snapshot_id: "snap-test".to_string(),
            generated_at: Timestamp::from_rfc3339("2026-01-15T00:00:00Z").unwrap(),
            tiger_version: "TIGER2025".to_string(),
            source_hashes: BTreeMap::new(),
            previous_cid: None,
            quarantine: QuarantineReport::default(),
            warnings: Vec::new(),
        }
    }

    fn leaf(h: &FieldHasher, id: &str, index: u32) -> MerkleLeaf {
        MerkleLeaf {
            leaf_hash: h.hash_string(id),
            boundary_id: id.to_string(),
            boundary_type: BoundaryType::County,
            boundary_name: format!("County {id}"),
            index,
        }
    }

    fn snapshot(h: &FieldHasher, ids: &[&str]) -> Snapshot {
        let leaves: Vec<MerkleLeaf> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| leaf(h, id, i as u32))
            .collect();
        let hashes: Vec<Fr> = leaves.iter().map(|l| l.leaf_hash).collect();
        let tree = MerkleTree::build(h, &hashes, TreeDepth::Municipal).unwrap();
        Snapshot::from_parts(TreeDepth::Municipal, leaves, tree, metadata())
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b", "c"]);
        assert_eq!(
            s.canonical_bytes().unwrap().as_bytes(),
            s.canonical_bytes().unwrap().as_bytes()
        );
        assert_eq!(s.cid().unwrap(), s.cid().unwrap());
    }

    #[test]
    fn serialize_deserialize_serialize_is_identity() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b", "c", "d", "e"]);
        let bytes = s.canonical_bytes().unwrap();
        let reparsed = Snapshot::from_canonical_bytes(bytes.as_bytes(), &h).unwrap();
        let bytes2 = reparsed.canonical_bytes().unwrap();
        assert_eq!(bytes.as_bytes(), bytes2.as_bytes());
        assert_eq!(reparsed, s);
    }

    #[test]
    fn empty_snapshot_roundtrips() {
        let h = hasher();
        let s = snapshot(&h, &[]);
        assert_eq!(s.boundary_count(), 0);
        let bytes = s.canonical_bytes().unwrap();
        let reparsed = Snapshot::from_canonical_bytes(bytes.as_bytes(), &h).unwrap();
        assert_eq!(reparsed.merkle_root(), s.merkle_root());
    }

    #[test]
    fn count_mismatch_refused() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b"]);
        let json = String::from_utf8(s.canonical_bytes().unwrap().as_bytes().to_vec()).unwrap();
        let tampered = json.replace("\"boundaryCount\":2", "\"boundaryCount\":3");
        assert!(matches!(
            Snapshot::from_canonical_bytes(tampered.as_bytes(), &h),
            Err(IntegrityError::BoundaryCountMismatch { declared: 3, leaves: 2 })
        ));
    }

    #[test]
    fn tampered_root_refused() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b"]);
        let json = String::from_utf8(s.canonical_bytes().unwrap().as_bytes().to_vec()).unwrap();
        let root_hex = fr_to_hex(&s.merkle_root());
        let mut flipped = root_hex.clone();
        let last = flipped.pop().unwrap();
        flipped.push(if last == '0' { '1' } else { '0' });
        let tampered = json.replace(&root_hex, &flipped);
        assert!(Snapshot::from_canonical_bytes(tampered.as_bytes(), &h).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let h = hasher();
        assert!(matches!(
            Snapshot::from_canonical_bytes(b"not json", &h),
            Err(IntegrityError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::from_canonical_bytes(b"{\"version\":1}", &h),
            Err(IntegrityError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn integrity_check_passes_for_well_formed() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b", "c"]);
        let report = s.verify_integrity(&h);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn layer_counts_match_leaf_table() {
        let h = hasher();
        let s = snapshot(&h, &["a", "b", "c"]);
        assert_eq!(s.layer_counts().get("county"), Some(&3));
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::tests_support::snapshot_for_ids;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// Two independent builds over the same id set are byte-identical,
        /// and serialize → deserialize → serialize is the identity.
        #[test]
        fn canonical_bytes_deterministic_and_roundtrip(
            ids in prop::collection::btree_set("[a-z0-9-]{1,12}", 0..12)
        ) {
            let ids: Vec<String> = ids.into_iter().collect();
            let (h, a) = snapshot_for_ids(&ids);
            let (_, b) = snapshot_for_ids(&ids);
            let bytes_a = a.canonical_bytes().unwrap();
            let bytes_b = b.canonical_bytes().unwrap();
            prop_assert_eq!(bytes_a.as_bytes(), bytes_b.as_bytes());

            let reparsed = super::Snapshot::from_canonical_bytes(bytes_a.as_bytes(), &h).unwrap();
            let reparsed_bytes = reparsed.canonical_bytes().unwrap();
            prop_assert_eq!(
                reparsed_bytes.as_bytes(),
                bytes_a.as_bytes()
            );
        }
    }
}
