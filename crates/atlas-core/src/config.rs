//! # Configuration
//!
//! Everything tunable is passed in at construction; there is no ambient
//! configuration. `AtlasConfig::validate()` runs at startup and fails
//! fatally on an unrecognized Poseidon variant, an unsupported depth, or
//! a precision the fixed-point geometry encoding cannot carry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryType;
use crate::error::ConfigError;

/// The single recognized Poseidon parameter-set label.
///
/// The committed roots are only meaningful under one permutation; a
/// config naming any other variant is a deployment error, not a choice.
pub const POSEIDON_VARIANT: &str = "bn254-width3-v1";

/// Fixed Merkle depth per authority tier. One snapshot declares one
/// depth; the external circuit's constraint system is shaped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeDepth {
    /// Municipal tier.
    Municipal,
    /// State tier.
    State,
    /// Federal tier.
    Federal,
}

impl TreeDepth {
    pub fn as_u8(&self) -> u8 {
        match self {
            TreeDepth::Municipal => 14,
            TreeDepth::State => 20,
            TreeDepth::Federal => 22,
        }
    }

    pub fn from_u8(depth: u8) -> Result<Self, ConfigError> {
        match depth {
            14 => Ok(TreeDepth::Municipal),
            20 => Ok(TreeDepth::State),
            22 => Ok(TreeDepth::Federal),
            other => Err(ConfigError::UnsupportedDepth(other)),
        }
    }

    /// Leaf capacity, 2^depth.
    pub fn capacity(&self) -> usize {
        1usize << self.as_u8()
    }
}

impl Serialize for TreeDepth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for TreeDepth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let depth = u8::deserialize(deserializer)?;
        TreeDepth::from_u8(depth).map_err(serde::de::Error::custom)
    }
}

/// Tessellation gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TessellationConfig {
    /// Minimum fraction of a boundary's area inside its jurisdiction.
    pub containment_min: f64,
    /// Absolute pairwise-overlap ceiling in square meters.
    pub overlap_abs_m2: f64,
    /// Relative pairwise-overlap ceiling as a fraction of the smaller polygon.
    pub overlap_rel: f64,
    /// Minimum fraction of the jurisdiction the layer union must cover.
    pub coverage_min: f64,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            containment_min: 0.98,
            overlap_abs_m2: 1000.0,
            overlap_rel: 0.001,
            coverage_min: 0.99,
        }
    }
}

/// Expected boundary count for a (country, layer) pair, with tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedCount {
    pub country: String,
    pub layer: BoundaryType,
    pub expected: u32,
    pub tolerance: u32,
}

/// Top-level configuration for a snapshot build and the services around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Merkle depth for this snapshot's authority tier.
    pub depth: TreeDepth,
    /// Tessellation gate thresholds.
    #[serde(default)]
    pub tessellation: TessellationConfig,
    /// Jurisdictions exempt from the containment test (consolidated
    /// city-counties whose districts legitimately straddle the parent).
    #[serde(default)]
    pub consolidated_jurisdictions: BTreeSet<String>,
    /// Jurisdictions whose municipal layers legitimately hold a single
    /// at-large feature.
    #[serde(default)]
    pub at_large_cities: BTreeSet<String>,
    /// Expected boundary counts keyed by (country, layer).
    #[serde(default)]
    pub expected_counts: Vec<ExpectedCount>,
    /// Decimal places boundaries are rounded to before hashing.
    #[serde(default = "default_precision")]
    pub geometry_precision_decimals: u8,
    /// Poseidon parameter-set label; must equal [`POSEIDON_VARIANT`].
    pub poseidon_variant: String,
}

fn default_precision() -> u8 {
    6
}

impl AtlasConfig {
    /// A config for the given tier with defaults everywhere else.
    pub fn for_depth(depth: TreeDepth) -> Self {
        Self {
            depth,
            tessellation: TessellationConfig::default(),
            consolidated_jurisdictions: BTreeSet::new(),
            at_large_cities: BTreeSet::new(),
            expected_counts: Vec::new(),
            geometry_precision_decimals: default_precision(),
            poseidon_variant: POSEIDON_VARIANT.to_string(),
        }
    }

    /// Startup validation. Every failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poseidon_variant != POSEIDON_VARIANT {
            return Err(ConfigError::UnknownPoseidonVariant(
                self.poseidon_variant.clone(),
            ));
        }
        // The leaf hash encodes coordinates as signed 32-bit microdegrees;
        // more than 6 decimals cannot survive that encoding.
        if self.geometry_precision_decimals == 0 || self.geometry_precision_decimals > 6 {
            return Err(ConfigError::UnsupportedPrecision(
                self.geometry_precision_decimals,
            ));
        }
        Ok(())
    }

    /// Expected count for a (country, layer) pair, if configured.
    pub fn expected_count(&self, country: &str, layer: BoundaryType) -> Option<&ExpectedCount> {
        self.expected_counts
            .iter()
            .find(|e| e.country == country && e.layer == layer)
    }
}
