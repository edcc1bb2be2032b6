//! The per-snapshot spatial index.
//!
//! An R-tree over boundary bounding boxes narrows a point query to a
//! handful of candidates; precise containment runs afterwards against
//! the real rings. The index is immutable; it is rebuilt for each
//! published snapshot and swapped in with it.

use rstar::{RTree, RTreeObject, AABB};

use atlas_geo::normalize::NormalizedBoundary;

#[derive(Debug, Clone)]
struct IndexEntry {
    envelope: AABB<[f64; 2]>,
    /// Position in the committed boundary order.
    position: usize,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only R-tree over the committed boundaries of one snapshot.
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
}

impl SpatialIndex {
    /// Bulk-load the index from boundaries in committed order.
    pub fn build(boundaries: &[NormalizedBoundary]) -> Self {
        let entries: Vec<IndexEntry> = boundaries
            .iter()
            .enumerate()
            .filter_map(|(position, boundary)| {
                boundary.geometry().bounding_box().map(|rect| IndexEntry {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    position,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Committed positions of all boundaries whose bbox contains the
    /// point, in ascending position order so scans are deterministic.
    pub fn candidates(&self, lon: f64, lat: f64) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .map(|entry| entry.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
