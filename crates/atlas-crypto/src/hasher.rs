//! The field hasher.
//!
//! One sponge convention over the width-3 Poseidon2 permutation:
//! capacity lane 0 is initialized with a domain constant, lanes 1 and 2
//! absorb two elements per permutation by addition, and the digest is
//! lane 1 of the final state. The proof circuit implements the same
//! schedule; both sides are pinned to the `bn254-width3-v1` parameter
//! label.

use ark_ff::Zero;
use zkhash::poseidon2::poseidon2::Poseidon2;
use zkhash::poseidon2::poseidon2_instance_bn256::POSEIDON2_BN256_PARAMS;

use atlas_core::config::POSEIDON_VARIANT;
use atlas_core::error::ConfigError;
use atlas_geo::geometry::CanonicalGeometry;

use crate::field::{fr_from_limb, Fr};

/// Domain constants for the sponge capacity lane. The high bits select
/// the input class, the low bits the arity, so no two classes can share
/// an absorption transcript.
const CLASS_ARITY: u64 = 1 << 16;
const CLASS_STRING: u64 = 2 << 16;
const CLASS_GEOMETRY: u64 = 3 << 16;

/// Fixed-point coordinates are absorbed offset-binary so the sponge only
/// ever sees small non-negative integers.
const COORD_OFFSET: i64 = 1 << 31;

/// Domain-separated Poseidon2 hashing over the BN254 scalar field.
///
/// Cheap to construct (the parameter set is shared); construct eagerly
/// at startup and share by reference.
pub struct FieldHasher {
    permutation: Poseidon2<Fr>,
}

impl FieldHasher {
    /// Build a hasher for the named parameter set.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownPoseidonVariant` unless `variant` is exactly
    /// the one recognized label. Roots are only meaningful under one
    /// permutation; there is nothing sensible to fall back to.
    pub fn new(variant: &str) -> Result<Self, ConfigError> {
        if variant != POSEIDON_VARIANT {
            return Err(ConfigError::UnknownPoseidonVariant(variant.to_string()));
        }
        Ok(Self {
            permutation: Poseidon2::new(&POSEIDON2_BN256_PARAMS),
        })
    }

    /// Hash a fixed-arity input, domain-separated by arity.
    ///
    /// # Panics
    ///
    /// Panics when `xs.len()` is not 1, 2, or 4. The committed formats
    /// use exactly these arities, and any other length is a programming
    /// error at the call site.
    pub fn hash_n(&self, xs: &[Fr]) -> Fr {
        assert!(
            matches!(xs.len(), 1 | 2 | 4),
            "hash_n supports arities 1, 2, 4; got {}",
            xs.len()
        );
        self.sponge(Fr::from(CLASS_ARITY | xs.len() as u64), xs)
    }

    /// Non-commutative two-to-one compression for tree nodes.
    pub fn hash_pair(&self, left: Fr, right: Fr) -> Fr {
        self.hash_n(&[left, right])
    }

    /// The padding leaf: the arity-4 hash of an all-zero input. Real
    /// leaves carry a nonzero layer tag in position 0, so no committed
    /// boundary can collide with padding.
    pub fn pad_leaf(&self) -> Fr {
        self.hash_n(&[Fr::zero(); 4])
    }

    /// Hash a UTF-8 string.
    ///
    /// Bytes are chunked into 31-byte big-endian limbs (always in field)
    /// behind a byte-length prefix, so `""` and `"\0"` differ, as do any
    /// two strings where one is a zero-padded extension of the other.
    pub fn hash_string(&self, s: &str) -> Fr {
        let bytes = s.as_bytes();
        let mut elems = Vec::with_capacity(1 + bytes.len() / 31 + 1);
        elems.push(Fr::from(bytes.len() as u64));
        for chunk in bytes.chunks(31) {
            elems.push(fr_from_limb(chunk));
        }
        self.sponge(Fr::from(CLASS_STRING), &elems)
    }

    /// Hash canonical geometry.
    ///
    /// Absorbs the normalizer's fixed-point microdegree ring stream
    /// (ring count, then per ring its point count and `(lon, lat)`
    /// pairs), so the digest is insensitive to any textual source form but
    /// sensitive to coordinate order and ring order.
    pub fn hash_geometry(&self, geometry: &CanonicalGeometry) -> Fr {
        let rings = geometry.fixed_point_rings();
        let mut elems =
            Vec::with_capacity(1 + rings.iter().map(|r| 1 + 2 * r.len()).sum::<usize>());
        elems.push(Fr::from(rings.len() as u64));
        for ring in &rings {
            elems.push(Fr::from(ring.len() as u64));
            for &(lon, lat) in ring {
                elems.push(Fr::from((i64::from(lon) + COORD_OFFSET) as u64));
                elems.push(Fr::from((i64::from(lat) + COORD_OFFSET) as u64));
            }
        }
        self.sponge(Fr::from(CLASS_GEOMETRY), &elems)
    }

    /// Add-absorb sponge: two lanes per permutation, digest is lane 1.
    fn sponge(&self, domain: Fr, inputs: &[Fr]) -> Fr {
        let mut state = [domain, Fr::zero(), Fr::zero()];
        if inputs.is_empty() {
            let out = self.permutation.permutation(&state);
            return out[1];
        }
        for chunk in inputs.chunks(2) {
            state[1] += chunk[0];
            if let Some(second) = chunk.get(1) {
                state[2] += *second;
            }
            let out = self.permutation.permutation(&state);
            state = [out[0], out[1], out[2]];
        }
        state[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_geo::geometry::CanonicalGeometry;

    fn hasher() -> FieldHasher {
        FieldHasher::new(POSEIDON_VARIANT).unwrap()
    }

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

    #[test]
    fn unknown_variant_refused() {
        assert!(matches!(
            FieldHasher::new("bn254-width5-v0"),
            Err(ConfigError::UnknownPoseidonVariant(_))
        ));
    }

    #[test]
    fn hashing_is_deterministic() {
        let h = hasher();
        let a = Fr::from(17u64);
        let b = Fr::from(23u64);
        assert_eq!(h.hash_pair(a, b), h.hash_pair(a, b));
        assert_eq!(h.hash_string("Dane County"), h.hash_string("Dane County"));
    }

    #[test]
    fn pair_is_non_commutative() {
        let h = hasher();
        let a = Fr::from(17u64);
        let b = Fr::from(23u64);
        assert_ne!(h.hash_pair(a, b), h.hash_pair(b, a));
    }

    #[test]
    fn arities_are_domain_separated() {
        let h = hasher();
        let x = Fr::from(99u64);
        let z = Fr::zero();
        let h1 = h.hash_n(&[x]);
        let h2 = h.hash_n(&[x, z]);
        let h4 = h.hash_n(&[x, z, z, z]);
        assert_ne!(h1, h2);
        assert_ne!(h1, h4);
        assert_ne!(h2, h4);
    }

    #[test]
    #[should_panic(expected = "arities 1, 2, 4")]
    fn unsupported_arity_panics() {
        hasher().hash_n(&[Fr::zero(); 3]);
    }

    #[test]
    fn string_hash_separates_empty_and_nul() {
        let h = hasher();
        assert_ne!(h.hash_string(""), h.hash_string("\0"));
        assert_ne!(h.hash_string("a"), h.hash_string("a\0"));
        assert_ne!(h.hash_string("a"), h.hash_string("\0a"));
    }

    #[test]
    fn string_hash_handles_multi_limb_input() {
        let h = hasher();
        let long = "x".repeat(100);
        assert_ne!(h.hash_string(&long), h.hash_string(&long[..99]));
        assert_eq!(h.hash_string(&long), h.hash_string(&"x".repeat(100)));
    }

    #[test]
    fn string_and_arity_classes_do_not_collide() {
        let h = hasher();
        // A one-limb string absorbs [len, limb]; make the same pair via
        // hash_n and confirm the class constant separates them.
        let s = "A";
        let as_string = h.hash_string(s);
        let as_pair = h.hash_n(&[Fr::from(1u64), Fr::from(b'A' as u64)]);
        assert_ne!(as_string, as_pair);
    }

    #[test]
    fn geometry_hash_is_deterministic_and_location_sensitive() {
        let h = hasher();
        let a = square(-89.5, 43.0, 0.5);
        let b = square(-89.5, 43.0, 0.5);
        let c = square(-89.5, 43.1, 0.5);
        assert_eq!(h.hash_geometry(&a), h.hash_geometry(&b));
        assert_ne!(h.hash_geometry(&a), h.hash_geometry(&c));
    }

    #[test]
    fn geometry_hash_sensitive_to_ring_order() {
        let h = hasher();
        let two_parts_ab = CanonicalGeometry::from_raw_polygons(
            &[
                vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]],
                vec![vec![(2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (2.0, 1.0), (2.0, 0.0)]],
            ],
            6,
        )
        .unwrap();
        let two_parts_ba = CanonicalGeometry::from_raw_polygons(
            &[
                vec![vec![(2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (2.0, 1.0), (2.0, 0.0)]],
                vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]],
            ],
            6,
        )
        .unwrap();
        assert_ne!(
            h.hash_geometry(&two_parts_ab),
            h.hash_geometry(&two_parts_ba)
        );
    }

    #[test]
    fn geometry_hash_sensitive_to_coordinate_order() {
        let h = hasher();
        // Same vertex set, rotated start point: different stream.
        let rotated = CanonicalGeometry::from_raw_polygons(
            &[vec![vec![
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 1.0),
                (0.0, 0.0),
                (1.0, 0.0),
            ]]],
            6,
        )
        .unwrap();
        assert_ne!(
            h.hash_geometry(&square(0.0, 0.0, 1.0)),
            h.hash_geometry(&rotated)
        );
    }

    #[test]
    fn pad_leaf_is_stable() {
        let h = hasher();
        assert_eq!(h.pad_leaf(), h.hash_n(&[Fr::zero(); 4]));
    }
}
