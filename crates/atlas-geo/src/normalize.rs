//! The boundary normalizer.
//!
//! Takes the heterogeneous GeoJSON-shaped records an upstream scraper
//! produces and emits [`NormalizedBoundary`] values, or a typed
//! rejection. Everything downstream of this crate sees only the
//! normalized form.
//!
//! Id formats per layer (stable across runs; ids cross the snapshot
//! boundary and external consumers key on them):
//!
//! | layer | format |
//! |---|---|
//! | congressional-district   | `US-Congress-<STATE>-<GEOID>` |
//! | state-legislative-upper  | `US-SLDU-<STATE>-<GEOID>` |
//! | state-legislative-lower  | `US-SLDL-<STATE>-<GEOID>` |
//! | county                   | `US-County-<GEOID>` |
//! | municipal-council        | `<jurisdiction>-Council-<district id>` |
//! | ward                     | `<jurisdiction>-Ward-<district id>` |

use geojson::Geometry;
use unicode_normalization::UnicodeNormalization;

use atlas_core::boundary::{AuthorityLevel, BoundaryType};
use atlas_core::error::NormalizeError;

use crate::geometry::CanonicalGeometry;

/// Spherical-mercator radius, meters.
const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// A scraper record, as handed over by the discovery pipeline.
///
/// `crs` is the source-declared spatial reference, if any; GeoJSON is
/// WGS84 by default but municipal portals routinely export web-mercator
/// with a legacy `crs` member.
#[derive(Debug, Clone)]
pub struct RawBoundary {
    /// External district identifier (GEOID or portal district id).
    pub source_id: Option<String>,
    /// Display name as published.
    pub name: Option<String>,
    /// Two-letter state code, where the layer id format needs one.
    pub state: Option<String>,
    /// The geometry member of the source feature.
    pub geometry: Geometry,
    pub boundary_type: BoundaryType,
    pub authority: AuthorityLevel,
    /// Parent container id (city, county, or state).
    pub jurisdiction: String,
    /// Source-declared CRS, if any.
    pub crs: Option<String>,
    /// Declared district count for the layer, when the portal exposes it.
    pub expected_district_count: Option<u32>,
}

/// The canonical boundary record. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct NormalizedBoundary {
    id: String,
    name: String,
    geometry: CanonicalGeometry,
    boundary_type: BoundaryType,
    authority: AuthorityLevel,
    jurisdiction: String,
    expected_district_count: Option<u32>,
}

impl NormalizedBoundary {
    pub fn new(
        id: String,
        name: String,
        geometry: CanonicalGeometry,
        boundary_type: BoundaryType,
        authority: AuthorityLevel,
        jurisdiction: String,
        expected_district_count: Option<u32>,
    ) -> Self {
        Self {
            id,
            name,
            geometry,
            boundary_type,
            authority,
            jurisdiction,
            expected_district_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &CanonicalGeometry {
        &self.geometry
    }

    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    pub fn authority(&self) -> AuthorityLevel {
        self.authority
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    pub fn expected_district_count(&self) -> Option<u32> {
        self.expected_district_count
    }
}

/// Canonicalizes scraper records into [`NormalizedBoundary`] values.
#[derive(Debug, Clone)]
pub struct BoundaryNormalizer {
    precision_decimals: u8,
}

impl BoundaryNormalizer {
    pub fn new(precision_decimals: u8) -> Self {
        Self { precision_decimals }
    }

    /// Run the full canonicalization pipeline on one record.
    pub fn normalize(&self, raw: RawBoundary) -> Result<NormalizedBoundary, NormalizeError> {
        let mut polygons = extract_polygons(&raw.geometry)?;
        reproject(&mut polygons, raw.crs.as_deref())?;
        let geometry = CanonicalGeometry::from_raw_polygons(&polygons, self.precision_decimals)?;

        let name = canonical_name(raw.name.as_deref().ok_or_else(|| {
            NormalizeError::MissingRequiredAttribute("name".to_string())
        })?);
        if name.is_empty() {
            return Err(NormalizeError::MissingRequiredAttribute("name".to_string()));
        }
        let id = assemble_id(&raw)?;

        tracing::debug!(
            boundary_id = %id,
            layer = %raw.boundary_type,
            points = geometry.point_count(),
            "normalized boundary"
        );
        Ok(NormalizedBoundary {
            id,
            name,
            geometry,
            boundary_type: raw.boundary_type,
            authority: raw.authority,
            jurisdiction: raw.jurisdiction,
            expected_district_count: raw.expected_district_count,
        })
    }
}

/// Pull raw ring arrays out of a GeoJSON geometry.
fn extract_polygons(geometry: &Geometry) -> Result<Vec<Vec<Vec<(f64, f64)>>>, NormalizeError> {
    use geojson::Value;

    let positions_to_ring = |ring: &Vec<Vec<f64>>| -> Result<Vec<(f64, f64)>, NormalizeError> {
        ring.iter()
            .map(|pos| {
                if pos.len() < 2 {
                    Err(NormalizeError::DegenerateGeometry(
                        "position with fewer than 2 ordinates".to_string(),
                    ))
                } else {
                    Ok((pos[0], pos[1]))
                }
            })
            .collect()
    };

    match &geometry.value {
        Value::Polygon(rings) => Ok(vec![rings
            .iter()
            .map(positions_to_ring)
            .collect::<Result<_, _>>()?]),
        Value::MultiPolygon(polys) => polys
            .iter()
            .map(|rings| rings.iter().map(positions_to_ring).collect())
            .collect(),
        other => Err(NormalizeError::WrongGeometryType(
            geometry_type_name(other).to_string(),
        )),
    }
}

fn geometry_type_name(value: &geojson::Value) -> &'static str {
    use geojson::Value;
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Re-project into WGS84 where the declared CRS is recognized.
fn reproject(
    polygons: &mut [Vec<Vec<(f64, f64)>>],
    crs: Option<&str>,
) -> Result<(), NormalizeError> {
    let Some(crs) = crs else { return Ok(()) };
    match crs {
        "EPSG:4326" | "CRS84" | "urn:ogc:def:crs:OGC:1.3:CRS84" | "urn:ogc:def:crs:EPSG::4326" => {
            Ok(())
        }
        "EPSG:3857" | "urn:ogc:def:crs:EPSG::3857" => {
            for rings in polygons.iter_mut() {
                for ring in rings.iter_mut() {
                    for point in ring.iter_mut() {
                        *point = mercator_to_wgs84(point.0, point.1);
                    }
                }
            }
            Ok(())
        }
        other => Err(NormalizeError::UnknownProjection(other.to_string())),
    }
}

/// Closed-form inverse spherical web-mercator.
fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_RADIUS).to_degrees();
    let lat = ((y / MERCATOR_RADIUS).sinh().atan()).to_degrees();
    (lon, lat)
}

/// NFC-normalize, strip control characters, collapse internal whitespace.
fn canonical_name(raw: &str) -> String {
    let nfc: String = raw.nfc().collect();
    let stripped: String = nfc.chars().filter(|c| !c.is_control()).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assemble the layer-appropriate stable id.
fn assemble_id(raw: &RawBoundary) -> Result<String, NormalizeError> {
    let source_id = raw
        .source_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NormalizeError::MissingRequiredAttribute("source_id".to_string()))?;
    let state = || {
        raw.state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_uppercase)
            .ok_or_else(|| NormalizeError::MissingRequiredAttribute("state".to_string()))
    };
    Ok(match raw.boundary_type {
        BoundaryType::CongressionalDistrict => format!("US-Congress-{}-{}", state()?, source_id),
        BoundaryType::StateLegislativeUpper => format!("US-SLDU-{}-{}", state()?, source_id),
        BoundaryType::StateLegislativeLower => format!("US-SLDL-{}-{}", state()?, source_id),
        BoundaryType::County => format!("US-County-{}", source_id),
        BoundaryType::MunicipalCouncil => format!("{}-Council-{}", raw.jurisdiction, source_id),
        BoundaryType::Ward => format!("{}-Ward-{}", raw.jurisdiction, source_id),
    })
}
