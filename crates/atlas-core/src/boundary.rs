//! # Boundary Taxonomy
//!
//! The closed set of electoral-district layer types and the authority
//! scale of the bodies that publish them. Both are committed into every
//! Merkle leaf: the type tag domain-separates layers so identical
//! geometry in two layers cannot share a leaf hash, and the authority
//! level distinguishes the same geometry published by different bodies.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The kind of electoral-district layer a boundary belongs to.
///
/// The set is closed. Canonical names are the kebab-case strings below;
/// they appear on the wire, in snapshot layer counts, and define the
/// lexicographic layer ordering of the committed tree. The numeric tag
/// feeds the leaf hash and is stable forever; renumbering it would
/// silently invalidate every published root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    CongressionalDistrict,
    StateLegislativeUpper,
    StateLegislativeLower,
    County,
    MunicipalCouncil,
    Ward,
}

impl BoundaryType {
    /// All variants, in no particular order. Exists so validators can
    /// iterate the closed set without maintaining a parallel list.
    pub const ALL: [BoundaryType; 6] = [
        BoundaryType::CongressionalDistrict,
        BoundaryType::StateLegislativeUpper,
        BoundaryType::StateLegislativeLower,
        BoundaryType::County,
        BoundaryType::MunicipalCouncil,
        BoundaryType::Ward,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryType::CongressionalDistrict => "congressional-district",
            BoundaryType::StateLegislativeUpper => "state-legislative-upper",
            BoundaryType::StateLegislativeLower => "state-legislative-lower",
            BoundaryType::County => "county",
            BoundaryType::MunicipalCouncil => "municipal-council",
            BoundaryType::Ward => "ward",
        }
    }

    /// Parse a canonical name.
    pub fn from_str_strict(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Injective leaf-hash domain tag. Nonzero so the padding leaf
    /// (an all-zero preimage) can never collide with a real leaf.
    pub fn tag(&self) -> u64 {
        match self {
            BoundaryType::CongressionalDistrict => 1,
            BoundaryType::StateLegislativeUpper => 2,
            BoundaryType::StateLegislativeLower => 3,
            BoundaryType::County => 4,
            BoundaryType::MunicipalCouncil => 5,
            BoundaryType::Ward => 6,
        }
    }

    /// Granularity rank for lookup preference: higher is finer. When a
    /// point lands in several layers and the caller did not name one,
    /// the finest-grained match wins.
    pub fn granularity(&self) -> u8 {
        match self {
            BoundaryType::CongressionalDistrict => 1,
            BoundaryType::StateLegislativeUpper => 2,
            BoundaryType::StateLegislativeLower => 3,
            BoundaryType::County => 4,
            BoundaryType::MunicipalCouncil => 5,
            BoundaryType::Ward => 6,
        }
    }
}

impl std::fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Tree ordering is lexicographic over canonical names, not declaration
// order. A derived Ord would re-order the committed tree if a variant
// were ever added mid-list.
impl PartialOrd for BoundaryType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoundaryType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// Governmental authority scale, 1..=5 (federal high, municipal low).
///
/// Committed into the leaf hash so the same geometry published by two
/// authorities yields two distinct leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AuthorityLevel(u8);

impl AuthorityLevel {
    pub const FEDERAL: AuthorityLevel = AuthorityLevel(5);
    pub const STATE: AuthorityLevel = AuthorityLevel(4);
    pub const COUNTY: AuthorityLevel = AuthorityLevel(3);
    pub const MUNICIPAL: AuthorityLevel = AuthorityLevel(2);
    pub const SPECIAL_DISTRICT: AuthorityLevel = AuthorityLevel(1);

    /// Validated constructor; levels outside 1..=5 do not exist.
    pub fn new(level: u8) -> Result<Self, ConfigError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ConfigError::AuthorityOutOfRange(level))
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for AuthorityLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(deserializer)?;
        AuthorityLevel::new(level).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic_over_names() {
        let mut sorted = BoundaryType::ALL.to_vec();
        sorted.sort();
        let names: Vec<&str> = sorted.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "congressional-district",
                "county",
                "municipal-council",
                "state-legislative-lower",
                "state-legislative-upper",
                "ward",
            ]
        );
    }

    #[test]
    fn tags_are_injective_and_nonzero() {
        let mut tags: Vec<u64> = BoundaryType::ALL.iter().map(|t| t.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), BoundaryType::ALL.len());
        assert!(tags.iter().all(|&t| t != 0));
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&BoundaryType::StateLegislativeUpper).unwrap();
        assert_eq!(json, "\"state-legislative-upper\"");
        let back: BoundaryType = serde_json::from_str("\"municipal-council\"").unwrap();
        assert_eq!(back, BoundaryType::MunicipalCouncil);
    }

    #[test]
    fn unknown_name_rejected() {
        assert!(serde_json::from_str::<BoundaryType>("\"voting-precinct\"").is_err());
        assert!(BoundaryType::from_str_strict("precinct").is_none());
    }

    #[test]
    fn authority_level_bounds() {
        assert!(AuthorityLevel::new(0).is_err());
        assert!(AuthorityLevel::new(6).is_err());
        for level in 1..=5 {
            assert_eq!(AuthorityLevel::new(level).unwrap().as_u8(), level);
        }
    }

    #[test]
    fn authority_level_deserialize_validates() {
        assert!(serde_json::from_str::<AuthorityLevel>("3").is_ok());
        assert!(serde_json::from_str::<AuthorityLevel>("9").is_err());
    }
}
