//! Canonical polygon geometry.
//!
//! A [`CanonicalGeometry`] is the only geometry type the rest of the
//! workspace sees. Its constructor is the canonicalization gate: raw ring
//! coordinate arrays go in, and what comes out is WGS84, closed, deduped,
//! rounded, and wound per RFC 7946 (exterior counter-clockwise, holes
//! clockwise). The fixed-point ring view is the committed form; the
//! leaf hash consumes it, so its derivation must never change.

use geo::orient::{Direction, Orient};
use geo::{
    BoundingRect, Centroid, ChamberlainDuquetteArea, Coord, Intersects, LineString, MultiPolygon,
    Point, Polygon, Rect,
};

use atlas_core::error::NormalizeError;

/// One closed ring in signed 32-bit microdegrees, `(lon, lat)` pairs,
/// closing point included.
pub type FixedRing = Vec<(i32, i32)>;

/// Microdegrees per degree: the fixed-point scale of the committed form.
const MICRODEGREES: f64 = 1_000_000.0;

/// Canonicalized WGS84 polygon set.
///
/// Immutable once constructed. Ring order is the order of the source
/// record: polygons in input order, each polygon's exterior ring first,
/// then its holes in input order. Hashing is sensitive to that order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGeometry {
    shape: MultiPolygon<f64>,
}

impl CanonicalGeometry {
    /// Canonicalize raw ring arrays: `polygons[i][j]` is ring `j` of
    /// polygon `i` (`j == 0` is the exterior), each ring a closed list
    /// of `(lon, lat)` pairs.
    ///
    /// # Errors
    ///
    /// - [`NormalizeError::CoordinateOutOfRange`] for non-finite values
    ///   or values outside [-180,180]×[-90,90].
    /// - [`NormalizeError::DegenerateGeometry`] for an unclosed ring, a
    ///   ring with fewer than 4 points after dedup, or an empty input.
    pub fn from_raw_polygons(
        polygons: &[Vec<Vec<(f64, f64)>>],
        precision_decimals: u8,
    ) -> Result<Self, NormalizeError> {
        if polygons.is_empty() || polygons.iter().any(|rings| rings.is_empty()) {
            return Err(NormalizeError::DegenerateGeometry(
                "polygon with no rings".to_string(),
            ));
        }
        let scale = 10f64.powi(i32::from(precision_decimals));

        let mut out = Vec::with_capacity(polygons.len());
        for rings in polygons {
            let mut canonical_rings = Vec::with_capacity(rings.len());
            for ring in rings {
                canonical_rings.push(canonicalize_ring(ring, scale)?);
            }
            let mut iter = canonical_rings.into_iter();
            let Some(exterior) = iter.next() else {
                return Err(NormalizeError::DegenerateGeometry(
                    "polygon with no rings".to_string(),
                ));
            };
            let polygon = Polygon::new(exterior, iter.collect());
            // Direction::Default is the RFC 7946 convention.
            out.push(polygon.orient(Direction::Default));
        }
        Ok(Self {
            shape: MultiPolygon(out),
        })
    }

    /// The underlying polygon set, for spatial predicates.
    pub fn multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Rings in canonical order as signed 32-bit microdegree pairs.
    /// This is the exact sequence the geometry hash absorbs.
    pub fn fixed_point_rings(&self) -> Vec<FixedRing> {
        let to_fixed = |c: &Coord<f64>| {
            (
                (c.x * MICRODEGREES).round() as i32,
                (c.y * MICRODEGREES).round() as i32,
            )
        };
        let mut rings = Vec::new();
        for polygon in self.shape.0.iter() {
            rings.push(polygon.exterior().0.iter().map(to_fixed).collect());
            for hole in polygon.interiors() {
                rings.push(hole.0.iter().map(to_fixed).collect());
            }
        }
        rings
    }

    /// True when the point lies in the interior or on the boundary.
    /// Boundary-inclusive so that a point on a shared edge matches both
    /// neighbors and the caller can apply its tie-break.
    pub fn covers_point(&self, lon: f64, lat: f64) -> bool {
        self.shape.intersects(&Point::new(lon, lat))
    }

    /// Spheroid area in square meters (Chamberlain–Duquette).
    pub fn area_m2(&self) -> f64 {
        self.shape.chamberlain_duquette_unsigned_area()
    }

    pub fn centroid(&self) -> Option<Point<f64>> {
        self.shape.centroid()
    }

    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }

    /// Total vertex count across all rings, closing points included.
    pub fn point_count(&self) -> usize {
        self.shape
            .0
            .iter()
            .map(|p| {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            })
            .sum()
    }
}

/// Validate, round, dedup, and re-close one ring.
fn canonicalize_ring(ring: &[(f64, f64)], scale: f64) -> Result<LineString<f64>, NormalizeError> {
    for &(lon, lat) in ring {
        if !lon.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lon)
            || !(-90.0..=90.0).contains(&lat)
        {
            return Err(NormalizeError::CoordinateOutOfRange { lon, lat });
        }
    }
    if ring.len() < 4 {
        return Err(NormalizeError::DegenerateGeometry(format!(
            "ring with {} points",
            ring.len()
        )));
    }
    if ring.first() != ring.last() {
        return Err(NormalizeError::DegenerateGeometry(
            "ring not closed".to_string(),
        ));
    }

    // Work on the open form so the closing duplicate does not survive
    // dedup as a phantom point.
    let round = |v: f64| (v * scale).round() / scale;
    let mut open: Vec<Coord<f64>> = Vec::with_capacity(ring.len() - 1);
    for &(lon, lat) in &ring[..ring.len() - 1] {
        let c = Coord {
            x: round(lon),
            y: round(lat),
        };
        if open.last() != Some(&c) {
            open.push(c);
        }
    }
    // Rounding can fold the last point onto the first.
    while open.len() > 1 && open.first() == open.last() {
        open.pop();
    }
    if open.len() < 3 {
        return Err(NormalizeError::DegenerateGeometry(
            "ring collapsed below 4 points after dedup".to_string(),
        ));
    }
    let mut closed = open;
    let first = closed[0];
    closed.push(first);
    Ok(LineString(closed))
}
