//! Tessellation validation.
//!
//! For each (jurisdiction, layer) group the admitted boundary set must
//! partition the jurisdiction polygon: containment, bounded pairwise
//! overlap, bounded coverage gap. All areas are measured in square
//! meters on the spheroid so the absolute overlap ceiling means what it
//! says at any latitude.
//!
//! Measured fractions are reported in basis points and areas in whole
//! square meters: reports are embedded in snapshot metadata, and the
//! canonical byte pipeline rejects floats.

use std::collections::BTreeSet;

use geo::{BooleanOps, ChamberlainDuquetteArea, Intersects, MultiPolygon};
use serde::{Deserialize, Serialize};

use atlas_core::boundary::BoundaryType;
use atlas_core::config::TessellationConfig;
use atlas_geo::geometry::CanonicalGeometry;
use atlas_geo::normalize::NormalizedBoundary;

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ValidationIssue {
    /// Boundary centroid or area lies outside its jurisdiction.
    ContainmentFailure {
        boundary_id: String,
        /// Fraction of the boundary's area inside the jurisdiction,
        /// in basis points.
        contained_bp: u32,
        centroid_inside: bool,
    },
    /// Two boundaries of one layer overlap beyond the rounding ceilings.
    ExclusivityFailure {
        boundary_a: String,
        boundary_b: String,
        overlap_m2: u64,
    },
    /// The layer union leaves too large a gap in the jurisdiction.
    ExhaustivityFailure {
        jurisdiction: String,
        /// Fraction of the jurisdiction covered, in basis points.
        coverage_bp: u32,
    },
    /// A municipal-council or ward layer with exactly one feature in a
    /// jurisdiction that is not registered as at-large.
    SingleFeatureMunicipal {
        jurisdiction: String,
        layer: BoundaryType,
    },
    /// Two sources disagree about the same (id, layer).
    CrossSourceDiscrepancy {
        boundary_id: String,
        layer: BoundaryType,
        detail: String,
    },
}

/// Outcome for one (jurisdiction, layer) group.
#[derive(Debug, Clone, PartialEq)]
pub enum TessellationVerdict {
    /// Clean partition; admit.
    Valid,
    /// Admit, carrying sub-threshold findings into snapshot metadata.
    Warn(Vec<ValidationIssue>),
    /// Quarantine the whole group.
    Fail(Vec<ValidationIssue>),
}

impl TessellationVerdict {
    /// Whether the group may enter the tree.
    pub fn is_admissible(&self) -> bool {
        !matches!(self, TessellationVerdict::Fail(_))
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            TessellationVerdict::Valid => &[],
            TessellationVerdict::Warn(issues) | TessellationVerdict::Fail(issues) => issues,
        }
    }
}

/// Validates that a boundary set tessellates its jurisdiction.
pub struct TessellationValidator {
    config: TessellationConfig,
    consolidated_jurisdictions: BTreeSet<String>,
    at_large_cities: BTreeSet<String>,
}

impl TessellationValidator {
    pub fn new(
        config: TessellationConfig,
        consolidated_jurisdictions: BTreeSet<String>,
        at_large_cities: BTreeSet<String>,
    ) -> Self {
        Self {
            config,
            consolidated_jurisdictions,
            at_large_cities,
        }
    }

    /// Run the three tessellation tests on one (jurisdiction, layer) group.
    ///
    /// Without a jurisdiction polygon the area-based tests cannot be
    /// measured; exclusivity and the single-feature rule still apply.
    pub fn validate_group(
        &self,
        jurisdiction_id: &str,
        layer: BoundaryType,
        jurisdiction: Option<&CanonicalGeometry>,
        boundaries: &[&NormalizedBoundary],
    ) -> TessellationVerdict {
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        if boundaries.is_empty() {
            return TessellationVerdict::Fail(vec![ValidationIssue::ExhaustivityFailure {
                jurisdiction: jurisdiction_id.to_string(),
                coverage_bp: 0,
            }]);
        }

        // A single-feature municipal layer is the classic wrong-layer
        // signature (the city's outline scraped in place of its council
        // districts) unless the city genuinely elects at large.
        if boundaries.len() == 1
            && matches!(layer, BoundaryType::MunicipalCouncil | BoundaryType::Ward)
            && !self.at_large_cities.contains(jurisdiction_id)
        {
            return TessellationVerdict::Fail(vec![ValidationIssue::SingleFeatureMunicipal {
                jurisdiction: jurisdiction_id.to_string(),
                layer,
            }]);
        }

        if let Some(jurisdiction) = jurisdiction {
            if !self.consolidated_jurisdictions.contains(jurisdiction_id) {
                self.check_containment(jurisdiction, boundaries, &mut failures);
            }
        }
        self.check_exclusivity(boundaries, &mut failures, &mut warnings);
        if let Some(jurisdiction) = jurisdiction {
            self.check_exhaustivity(jurisdiction_id, jurisdiction, boundaries, &mut failures);
        }

        if !failures.is_empty() {
            TessellationVerdict::Fail(failures)
        } else if !warnings.is_empty() {
            TessellationVerdict::Warn(warnings)
        } else {
            TessellationVerdict::Valid
        }
    }

    fn check_containment(
        &self,
        jurisdiction: &CanonicalGeometry,
        boundaries: &[&NormalizedBoundary],
        failures: &mut Vec<ValidationIssue>,
    ) {
        for boundary in boundaries {
            let geometry = boundary.geometry();
            let centroid_inside = geometry
                .centroid()
                .map(|c| jurisdiction.covers_point(c.x(), c.y()))
                .unwrap_or(false);
            let area = geometry.area_m2();
            let contained = if area > 0.0 {
                intersection_m2(geometry, jurisdiction) / area
            } else {
                0.0
            };
            if !centroid_inside || contained < self.config.containment_min {
                failures.push(ValidationIssue::ContainmentFailure {
                    boundary_id: boundary.id().to_string(),
                    contained_bp: to_basis_points(contained),
                    centroid_inside,
                });
            }
        }
    }

    fn check_exclusivity(
        &self,
        boundaries: &[&NormalizedBoundary],
        failures: &mut Vec<ValidationIssue>,
        warnings: &mut Vec<ValidationIssue>,
    ) {
        for i in 0..boundaries.len() {
            for j in (i + 1)..boundaries.len() {
                let (a, b) = (boundaries[i], boundaries[j]);
                let (Some(bbox_a), Some(bbox_b)) =
                    (a.geometry().bounding_box(), b.geometry().bounding_box())
                else {
                    continue;
                };
                if !bbox_a.intersects(&bbox_b) {
                    continue;
                }
                let overlap = intersection_m2(a.geometry(), b.geometry());
                if overlap <= 0.0 {
                    continue;
                }
                let smaller = a.geometry().area_m2().min(b.geometry().area_m2());
                let issue = ValidationIssue::ExclusivityFailure {
                    boundary_a: a.id().to_string(),
                    boundary_b: b.id().to_string(),
                    overlap_m2: overlap.round() as u64,
                };
                if overlap > self.config.overlap_abs_m2
                    && overlap > self.config.overlap_rel * smaller
                {
                    failures.push(issue);
                } else {
                    // Sub-threshold overlap: floating-point edge rounding,
                    // accepted but recorded.
                    tracing::warn!(
                        boundary_a = a.id(),
                        boundary_b = b.id(),
                        overlap_m2 = overlap,
                        "accepting sub-threshold boundary overlap"
                    );
                    warnings.push(issue);
                }
            }
        }
    }

    fn check_exhaustivity(
        &self,
        jurisdiction_id: &str,
        jurisdiction: &CanonicalGeometry,
        boundaries: &[&NormalizedBoundary],
        failures: &mut Vec<ValidationIssue>,
    ) {
        let jurisdiction_area = jurisdiction.area_m2();
        if jurisdiction_area <= 0.0 {
            failures.push(ValidationIssue::ExhaustivityFailure {
                jurisdiction: jurisdiction_id.to_string(),
                coverage_bp: 0,
            });
            return;
        }
        let mut union: Option<MultiPolygon<f64>> = None;
        for boundary in boundaries {
            let mp = boundary.geometry().multi_polygon();
            union = Some(match union {
                None => mp.clone(),
                Some(acc) => acc.union(mp),
            });
        }
        let covered = union
            .map(|u| {
                u.intersection(jurisdiction.multi_polygon())
                    .chamberlain_duquette_unsigned_area()
            })
            .unwrap_or(0.0);
        let coverage = covered / jurisdiction_area;
        if coverage < self.config.coverage_min {
            failures.push(ValidationIssue::ExhaustivityFailure {
                jurisdiction: jurisdiction_id.to_string(),
                coverage_bp: to_basis_points(coverage),
            });
        }
    }
}

fn intersection_m2(a: &CanonicalGeometry, b: &CanonicalGeometry) -> f64 {
    a.multi_polygon()
        .intersection(b.multi_polygon())
        .chamberlain_duquette_unsigned_area()
}

fn to_basis_points(fraction: f64) -> u32 {
    (fraction.clamp(0.0, 1.0) * 10_000.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::boundary::AuthorityLevel;
    use atlas_core::config::TessellationConfig;

    fn geometry(polys: &[Vec<Vec<(f64, f64)>>]) -> CanonicalGeometry {
        CanonicalGeometry::from_raw_polygons(polys, 6).unwrap()
    }

    fn square(lon: f64, lat: f64, w: f64, h: f64) -> CanonicalGeometry {
        geometry(&[vec![vec![
            (lon, lat),
            (lon + w, lat),
            (lon + w, lat + h),
            (lon, lat + h),
            (lon, lat),
        ]]])
    }

    fn boundary(id: &str, layer: BoundaryType, g: CanonicalGeometry) -> NormalizedBoundary {
        NormalizedBoundary::new(
            id.to_string(),
            id.to_string(),
            g,
            layer,
            AuthorityLevel::MUNICIPAL,
            "US-City-Test".to_string(),
            None,
        )
    }

    fn validator() -> TessellationValidator {
        TessellationValidator::new(
            TessellationConfig::default(),
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    #[test]
    fn perfect_grid_is_valid() {
        // A 2x2 grid exactly tiling a 2°x2° jurisdiction.
        let jurisdiction = square(0.0, 40.0, 2.0, 2.0);
        let cells = [
            boundary("c-1", BoundaryType::County, square(0.0, 40.0, 1.0, 1.0)),
            boundary("c-2", BoundaryType::County, square(1.0, 40.0, 1.0, 1.0)),
            boundary("c-3", BoundaryType::County, square(0.0, 41.0, 1.0, 1.0)),
            boundary("c-4", BoundaryType::County, square(1.0, 41.0, 1.0, 1.0)),
        ];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert_eq!(verdict, TessellationVerdict::Valid);
    }

    #[test]
    fn gross_overlap_fails_exclusivity() {
        let jurisdiction = square(0.0, 40.0, 2.0, 1.0);
        let cells = [
            boundary("c-1", BoundaryType::County, square(0.0, 40.0, 1.5, 1.0)),
            boundary("c-2", BoundaryType::County, square(0.5, 40.0, 1.5, 1.0)),
        ];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(matches!(&verdict, TessellationVerdict::Fail(issues) if issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::ExclusivityFailure { .. }))));
    }

    #[test]
    fn sliver_overlap_warns_but_admits() {
        // Second cell overhangs the first by one microdegree of
        // longitude: a ~9 cm sliver down a 1° edge, far under the
        // relative ceiling for degree-scale polygons.
        let jurisdiction = square(0.0, 40.0, 2.0, 1.0);
        let cells = [
            boundary("c-1", BoundaryType::County, square(0.0, 40.0, 1.0, 1.0)),
            boundary(
                "c-2",
                BoundaryType::County,
                square(0.999_999, 40.0, 1.000_001, 1.0),
            ),
        ];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        match verdict {
            TessellationVerdict::Warn(issues) => {
                assert!(issues
                    .iter()
                    .all(|i| matches!(i, ValidationIssue::ExclusivityFailure { .. })));
            }
            other => panic!("expected Warn, got {other:?}"),
        }
    }

    #[test]
    fn coverage_gap_fails_exhaustivity() {
        // Half the jurisdiction left uncovered.
        let jurisdiction = square(0.0, 40.0, 2.0, 1.0);
        let cells = [boundary(
            "c-1",
            BoundaryType::County,
            square(0.0, 40.0, 1.0, 1.0),
        )];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(matches!(&verdict, TessellationVerdict::Fail(issues) if issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::ExhaustivityFailure { coverage_bp, .. } if *coverage_bp < 9_900))));
    }

    #[test]
    fn stray_boundary_fails_containment() {
        let jurisdiction = square(0.0, 40.0, 2.0, 2.0);
        let cells = [
            boundary("c-1", BoundaryType::County, square(0.0, 40.0, 2.0, 2.0)),
            // Entirely outside the jurisdiction.
            boundary("c-far", BoundaryType::County, square(30.0, 10.0, 1.0, 1.0)),
        ];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(matches!(&verdict, TessellationVerdict::Fail(issues) if issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::ContainmentFailure { centroid_inside: false, .. }))));
    }

    #[test]
    fn consolidated_jurisdiction_skips_containment() {
        let jurisdiction = square(0.0, 40.0, 2.0, 2.0);
        // Covers the jurisdiction but hangs far over its edge.
        let cells = [boundary(
            "c-1",
            BoundaryType::County,
            square(0.0, 40.0, 4.0, 2.0),
        )];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let consolidated: BTreeSet<String> = ["US-State-XX".to_string()].into();
        let v = TessellationValidator::new(
            TessellationConfig::default(),
            consolidated,
            BTreeSet::new(),
        );
        let verdict = v.validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(verdict.is_admissible());
    }

    #[test]
    fn single_feature_municipal_fails_unless_at_large() {
        let jurisdiction = square(0.0, 40.0, 1.0, 1.0);
        let cells = [boundary(
            "m-1",
            BoundaryType::MunicipalCouncil,
            square(0.0, 40.0, 1.0, 1.0),
        )];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();

        let verdict = validator().validate_group(
            "US-City-Test",
            BoundaryType::MunicipalCouncil,
            Some(&jurisdiction),
            &refs,
        );
        assert!(matches!(&verdict, TessellationVerdict::Fail(issues) if issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::SingleFeatureMunicipal { .. }))));

        let at_large: BTreeSet<String> = ["US-City-Test".to_string()].into();
        let v =
            TessellationValidator::new(TessellationConfig::default(), BTreeSet::new(), at_large);
        let verdict = v.validate_group(
            "US-City-Test",
            BoundaryType::MunicipalCouncil,
            Some(&jurisdiction),
            &refs,
        );
        assert!(verdict.is_admissible());
    }

    #[test]
    fn single_feature_county_layer_is_fine() {
        let jurisdiction = square(0.0, 40.0, 1.0, 1.0);
        let cells = [boundary(
            "c-1",
            BoundaryType::County,
            square(0.0, 40.0, 1.0, 1.0),
        )];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(verdict.is_admissible());
    }

    #[test]
    fn admitted_set_covers_jurisdiction_by_independent_measurement() {
        // Re-measure coverage with a direct union computation, not the
        // validator's own arithmetic.
        let jurisdiction = square(0.0, 40.0, 2.0, 2.0);
        let cells = [
            boundary("c-1", BoundaryType::County, square(0.0, 40.0, 1.0, 2.0)),
            boundary("c-2", BoundaryType::County, square(1.0, 40.0, 1.0, 2.0)),
        ];
        let refs: Vec<&NormalizedBoundary> = cells.iter().collect();
        let verdict =
            validator().validate_group("US-State-XX", BoundaryType::County, Some(&jurisdiction), &refs);
        assert!(verdict.is_admissible());

        let union = cells[0]
            .geometry()
            .multi_polygon()
            .union(cells[1].geometry().multi_polygon());
        let covered = union
            .intersection(jurisdiction.multi_polygon())
            .chamberlain_duquette_unsigned_area();
        assert!(covered / jurisdiction.area_m2() >= 0.99);
    }

    #[test]
    fn issues_serialize_without_floats() {
        let issue = ValidationIssue::ContainmentFailure {
            boundary_id: "c-1".to_string(),
            contained_bp: 9_312,
            centroid_inside: true,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "containment-failure");
        assert_eq!(json["containedBp"], 9_312);
    }
}
