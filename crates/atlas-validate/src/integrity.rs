//! The integrity verifier.
//!
//! Runs on three paths: normalization intake, snapshot commit, and
//! fetch-after-store. Findings accumulate into an [`IntegrityReport`];
//! errors block a commit, warnings travel with the snapshot.

use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_core::config::ExpectedCount;
use atlas_geo::normalize::NormalizedBoundary;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Largest tolerated L-infinity bbox disagreement between two sources
/// describing the same boundary, in meters.
const CROSS_SOURCE_BBOX_LIMIT_M: f64 = 1_000.0;

/// Accumulated integrity findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: IntegrityReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Gatekeeper for geometry invariants, count expectations, and
/// cross-source agreement.
pub struct IntegrityVerifier {
    expected_counts: Vec<ExpectedCount>,
}

impl IntegrityVerifier {
    pub fn new(expected_counts: Vec<ExpectedCount>) -> Self {
        Self { expected_counts }
    }

    /// Re-check the geometry and attribute invariants of one normalized
    /// boundary. The normalizer enforces these at construction; this
    /// runs again at commit and after fetch, where the record may have
    /// crossed a serialization boundary.
    pub fn check_boundary(&self, boundary: &NormalizedBoundary, report: &mut IntegrityReport) {
        if boundary.id().is_empty() {
            report.error("boundary with empty id");
        }
        if boundary.name().is_empty() {
            report.warning(format!("boundary {} has empty name", boundary.id()));
        }
        let rings = boundary.geometry().fixed_point_rings();
        if rings.is_empty() {
            report.error(format!("boundary {} has no rings", boundary.id()));
        }
        for (i, ring) in rings.iter().enumerate() {
            if ring.len() < 4 {
                report.error(format!(
                    "boundary {} ring {} has {} points",
                    boundary.id(),
                    i,
                    ring.len()
                ));
            } else if ring.first() != ring.last() {
                report.error(format!(
                    "boundary {} ring {} is not closed",
                    boundary.id(),
                    i
                ));
            }
            for &(lon, lat) in ring {
                if !(-180_000_000..=180_000_000).contains(&lon)
                    || !(-90_000_000..=90_000_000).contains(&lat)
                {
                    report.error(format!(
                        "boundary {} has out-of-range vertex ({lon}, {lat}) microdegrees",
                        boundary.id()
                    ));
                }
            }
        }
        if boundary.geometry().area_m2() <= 0.0 {
            report.error(format!("boundary {} has zero area", boundary.id()));
        }
    }

    /// Compare an observed layer count with the expected-count table.
    pub fn check_layer_count(
        &self,
        country: &str,
        layer: BoundaryType,
        actual: usize,
        report: &mut IntegrityReport,
    ) {
        let Some(entry) = self
            .expected_counts
            .iter()
            .find(|e| e.country == country && e.layer == layer)
        else {
            return;
        };
        let deviation = (actual as i64 - i64::from(entry.expected)).unsigned_abs();
        if deviation > u64::from(entry.tolerance) {
            report.error(format!(
                "layer {layer} in {country}: {actual} boundaries, expected {} (±{})",
                entry.expected, entry.tolerance
            ));
        }
    }

    /// Compare two independently sourced records of the same (id, layer).
    /// Name drift warns; a bounding-box displacement beyond a kilometer
    /// means the sources describe different geography, which fails.
    pub fn check_cross_source(
        &self,
        first: &NormalizedBoundary,
        second: &NormalizedBoundary,
        report: &mut IntegrityReport,
    ) {
        if first.name() != second.name() {
            report.warning(format!(
                "boundary {}: source names differ ({:?} vs {:?})",
                first.id(),
                first.name(),
                second.name()
            ));
        }
        let (Some(bbox_a), Some(bbox_b)) = (
            first.geometry().bounding_box(),
            second.geometry().bounding_box(),
        ) else {
            report.error(format!("boundary {}: missing bounding box", first.id()));
            return;
        };
        let mid_lat = ((bbox_a.min().y + bbox_a.max().y) / 2.0).to_radians();
        let lon_scale = METERS_PER_DEGREE * mid_lat.cos().abs().max(0.01);
        let displacement_m = [
            (bbox_a.min().x - bbox_b.min().x).abs() * lon_scale,
            (bbox_a.max().x - bbox_b.max().x).abs() * lon_scale,
            (bbox_a.min().y - bbox_b.min().y).abs() * METERS_PER_DEGREE,
            (bbox_a.max().y - bbox_b.max().y).abs() * METERS_PER_DEGREE,
        ]
        .into_iter()
        .fold(0.0f64, f64::max);
        if displacement_m > CROSS_SOURCE_BBOX_LIMIT_M {
            report.error(format!(
                "boundary {}: source bounding boxes disagree by {:.0} m",
                first.id(),
                displacement_m
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::boundary::AuthorityLevel;
    use atlas_geo::geometry::CanonicalGeometry;

    fn square(lon: f64, lat: f64, size: f64) -> CanonicalGeometry {
        CanonicalGeometry::from_raw_polygons(
            &[vec![vec![
                (lon, lat),
                (lon + size, lat),
                (lon + size, lat + size),
                (lon, lat + size),
                (lon, lat),
            ]]],
            6,
        )
        .unwrap()
    }

    fn boundary(id: &str, name: &str, g: CanonicalGeometry) -> NormalizedBoundary {
        NormalizedBoundary::new(
            id.to_string(),
            name.to_string(),
            g,
            BoundaryType::County,
            AuthorityLevel::COUNTY,
            "US-State-WI".to_string(),
            None,
        )
    }

    #[test]
    fn clean_boundary_passes() {
        let v = IntegrityVerifier::new(vec![]);
        let mut report = IntegrityReport::default();
        v.check_boundary(&boundary("US-County-55025", "Dane", square(-89.8, 42.8, 0.8)), &mut report);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn layer_count_within_tolerance() {
        let v = IntegrityVerifier::new(vec![ExpectedCount {
            country: "US".to_string(),
            layer: BoundaryType::CongressionalDistrict,
            expected: 435,
            tolerance: 2,
        }]);
        let mut report = IntegrityReport::default();
        v.check_layer_count("US", BoundaryType::CongressionalDistrict, 434, &mut report);
        assert!(report.is_valid());
        v.check_layer_count("US", BoundaryType::CongressionalDistrict, 8, &mut report);
        assert!(!report.is_valid());
    }

    #[test]
    fn unconfigured_layer_count_is_ignored() {
        let v = IntegrityVerifier::new(vec![]);
        let mut report = IntegrityReport::default();
        v.check_layer_count("US", BoundaryType::Ward, 3, &mut report);
        assert!(report.is_valid());
    }

    #[test]
    fn cross_source_name_drift_warns() {
        let v = IntegrityVerifier::new(vec![]);
        let mut report = IntegrityReport::default();
        let a = boundary("US-County-55025", "Dane County", square(-89.8, 42.8, 0.8));
        let b = boundary("US-County-55025", "DANE CO.", square(-89.8, 42.8, 0.8));
        v.check_cross_source(&a, &b, &mut report);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn cross_source_bbox_displacement_fails() {
        let v = IntegrityVerifier::new(vec![]);
        let mut report = IntegrityReport::default();
        let a = boundary("US-County-55025", "Dane", square(-89.8, 42.8, 0.8));
        // Shifted ~0.05° of latitude: about 5.5 km.
        let b = boundary("US-County-55025", "Dane", square(-89.8, 42.85, 0.8));
        v.check_cross_source(&a, &b, &mut report);
        assert!(!report.is_valid());
    }

    #[test]
    fn cross_source_small_jitter_passes() {
        let v = IntegrityVerifier::new(vec![]);
        let mut report = IntegrityReport::default();
        let a = boundary("US-County-55025", "Dane", square(-89.8, 42.8, 0.8));
        // One ten-thousandth of a degree: ~11 m.
        let b = boundary("US-County-55025", "Dane", square(-89.8001, 42.8, 0.8));
        v.check_cross_source(&a, &b, &mut report);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }
}
