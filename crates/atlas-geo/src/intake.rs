//! Schema-validated GeoJSON feature intake.
//!
//! The scraper side of the pipeline hands over `geojson::Feature`
//! values whose properties differ per portal: census exports carry
//! `GEOID`/`NAMELSAD`, ArcGIS portals carry `DISTRICT`/`NAME`, and so
//! on. An [`AttributeSchema`] names which property keys to read, and
//! extraction is total: every absent or mistyped property becomes a
//! typed [`NormalizeError`] at this boundary, so nothing downstream
//! ever touches untyped JSON.

use geojson::Feature;

use atlas_core::boundary::{AuthorityLevel, BoundaryType};
use atlas_core::error::NormalizeError;

use crate::normalize::RawBoundary;

/// Property keys to read from a portal's features, plus the fixed
/// attributes every record from that source shares. Carries data only;
/// one extraction function serves every portal.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// Property holding the external district identifier.
    pub id_key: String,
    /// Property holding the display name.
    pub name_key: String,
    /// Property holding the two-letter state code, when the layer's id
    /// format needs one and the source provides it per feature.
    pub state_key: Option<String>,
    /// State code applied to every feature when the source is statewide.
    pub fixed_state: Option<String>,
    /// Layer this source publishes.
    pub boundary_type: BoundaryType,
    /// Authority of the publishing body.
    pub authority: AuthorityLevel,
    /// Parent container id for every feature of this source.
    pub jurisdiction: String,
    /// Declared district count for the layer, when the portal states one.
    pub expected_district_count: Option<u32>,
}

impl AttributeSchema {
    /// Census-shaped congressional district exports:
    /// `GEOID` + `NAMELSAD`, state fixed per file.
    pub fn census_congressional(state: impl Into<String>, jurisdiction: impl Into<String>) -> Self {
        Self {
            id_key: "GEOID".to_string(),
            name_key: "NAMELSAD".to_string(),
            state_key: None,
            fixed_state: Some(state.into()),
            boundary_type: BoundaryType::CongressionalDistrict,
            authority: AuthorityLevel::FEDERAL,
            jurisdiction: jurisdiction.into(),
            expected_district_count: None,
        }
    }

    /// Municipal council exports, which mostly use `DISTRICT` + `NAME`.
    pub fn municipal_council(jurisdiction: impl Into<String>) -> Self {
        Self {
            id_key: "DISTRICT".to_string(),
            name_key: "NAME".to_string(),
            state_key: None,
            fixed_state: None,
            boundary_type: BoundaryType::MunicipalCouncil,
            authority: AuthorityLevel::MUNICIPAL,
            jurisdiction: jurisdiction.into(),
            expected_district_count: None,
        }
    }
}

/// Extract a [`RawBoundary`] from one feature under a schema.
///
/// # Errors
///
/// - [`NormalizeError::MissingRequiredAttribute`] when the feature has
///   no geometry or a named property is absent or not a scalar.
/// - Geometry-shape problems surface later, in the normalizer.
pub fn raw_boundary_from_feature(
    feature: &Feature,
    schema: &AttributeSchema,
) -> Result<RawBoundary, NormalizeError> {
    let geometry = feature
        .geometry
        .clone()
        .ok_or_else(|| NormalizeError::MissingRequiredAttribute("geometry".to_string()))?;

    let source_id = property_string(feature, &schema.id_key)?;
    let name = property_string(feature, &schema.name_key)?;
    let state = match (&schema.state_key, &schema.fixed_state) {
        (Some(key), _) => Some(property_string(feature, key)?),
        (None, Some(fixed)) => Some(fixed.clone()),
        (None, None) => None,
    };

    Ok(RawBoundary {
        source_id: Some(source_id),
        name: Some(name),
        state,
        geometry,
        boundary_type: schema.boundary_type,
        authority: schema.authority,
        jurisdiction: schema.jurisdiction.clone(),
        crs: declared_crs(feature),
        expected_district_count: schema.expected_district_count,
    })
}

/// Read one property as a string, accepting the numeric ids some
/// portals emit but nothing structured.
fn property_string(feature: &Feature, key: &str) -> Result<String, NormalizeError> {
    let value = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(key))
        .ok_or_else(|| NormalizeError::MissingRequiredAttribute(key.to_string()))?;
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(NormalizeError::MissingRequiredAttribute(key.to_string())),
    }
}

/// The legacy `crs` foreign member, if the feature carries one:
/// `{"crs": {"properties": {"name": "EPSG:3857"}}}`.
fn declared_crs(feature: &Feature) -> Option<String> {
    feature
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Geometry, Value};

    fn feature(properties: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![vec![
                vec![-89.6, 42.9],
                vec![-89.2, 42.9],
                vec![-89.2, 43.2],
                vec![-89.6, 43.2],
                vec![-89.6, 42.9],
            ]]))),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn census_feature_extracts() {
        let schema = AttributeSchema::census_congressional("WI", "US-State-WI");
        let f = feature(serde_json::json!({
            "GEOID": "5502",
            "NAMELSAD": "Congressional District 2",
            "ALAND": 4_279_517_119u64
        }));
        let raw = raw_boundary_from_feature(&f, &schema).unwrap();
        assert_eq!(raw.source_id.as_deref(), Some("5502"));
        assert_eq!(raw.name.as_deref(), Some("Congressional District 2"));
        assert_eq!(raw.state.as_deref(), Some("WI"));
        assert_eq!(raw.boundary_type, BoundaryType::CongressionalDistrict);
    }

    #[test]
    fn numeric_district_ids_are_accepted() {
        let schema = AttributeSchema::municipal_council("US-City-Madison-WI");
        let f = feature(serde_json::json!({"DISTRICT": 7, "NAME": "District 7"}));
        let raw = raw_boundary_from_feature(&f, &schema).unwrap();
        assert_eq!(raw.source_id.as_deref(), Some("7"));
    }

    #[test]
    fn missing_property_is_typed() {
        let schema = AttributeSchema::municipal_council("US-City-Madison-WI");
        let f = feature(serde_json::json!({"NAME": "District 7"}));
        assert!(matches!(
            raw_boundary_from_feature(&f, &schema),
            Err(NormalizeError::MissingRequiredAttribute(key)) if key == "DISTRICT"
        ));
    }

    #[test]
    fn structured_property_is_rejected() {
        let schema = AttributeSchema::municipal_council("US-City-Madison-WI");
        let f = feature(serde_json::json!({"DISTRICT": {"no": "scalars"}, "NAME": "x"}));
        assert!(raw_boundary_from_feature(&f, &schema).is_err());
    }

    #[test]
    fn missing_geometry_is_typed() {
        let schema = AttributeSchema::municipal_council("US-City-Madison-WI");
        let mut f = feature(serde_json::json!({"DISTRICT": "1", "NAME": "x"}));
        f.geometry = None;
        assert!(matches!(
            raw_boundary_from_feature(&f, &schema),
            Err(NormalizeError::MissingRequiredAttribute(key)) if key == "geometry"
        ));
    }

    #[test]
    fn legacy_crs_member_is_read() {
        let schema = AttributeSchema::municipal_council("US-City-Madison-WI");
        let mut f = feature(serde_json::json!({"DISTRICT": "1", "NAME": "x"}));
        let mut members = serde_json::Map::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({"type": "name", "properties": {"name": "EPSG:3857"}}),
        );
        f.foreign_members = Some(members);
        let raw = raw_boundary_from_feature(&f, &schema).unwrap();
        assert_eq!(raw.crs.as_deref(), Some("EPSG:3857"));
    }
}
