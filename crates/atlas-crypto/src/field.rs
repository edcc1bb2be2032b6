//! Strict BN254 scalar codec.
//!
//! Wire form for a field element is a `0x`-prefixed, 64-nibble,
//! left-padded hex string. Parsing rejects anything that is not exactly
//! that shape, and rejects in-shape values that are >= the field
//! modulus: external input is never silently reduced into the field.

use ark_ff::{BigInt, BigInteger, PrimeField};
pub use zkhash::fields::bn256::FpBN256 as Fr;

use atlas_core::error::FieldError;

/// Parse a canonical hex encoding into a field element.
pub fn fr_from_hex(s: &str) -> Result<Fr, FieldError> {
    let Some(digits) = s.strip_prefix("0x") else {
        return Err(FieldError::Malformed(format!("missing 0x prefix: {s:?}")));
    };
    if digits.len() != 64 {
        return Err(FieldError::Malformed(format!(
            "expected 64 hex nibbles, got {}",
            digits.len()
        )));
    }
    let raw = hex::decode(digits).map_err(|e| FieldError::Malformed(e.to_string()))?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&raw);
    fr_from_be_bytes(&bytes).ok_or_else(|| FieldError::OutOfRange(s.to_string()))
}

/// Canonical hex encoding of a field element.
pub fn fr_to_hex(fe: &Fr) -> String {
    format!("0x{}", hex::encode(fe.into_bigint().to_bytes_be()))
}

/// Interpret 32 big-endian bytes as a field element, `None` when the
/// value is >= the modulus.
pub fn fr_from_be_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    let mut limbs = [0u64; 4];
    for (i, limb_bytes) in bytes.chunks(8).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(limb_bytes);
        limbs[3 - i] = u64::from_be_bytes(buf);
    }
    Fr::from_bigint(BigInt::new(limbs))
}

/// Interpret at most 31 big-endian bytes as a field element. 31 bytes is
/// 248 bits, always below the 254-bit modulus, so this cannot fail.
pub fn fr_from_limb(chunk: &[u8]) -> Fr {
    debug_assert!(chunk.len() <= 31);
    let mut bytes = [0u8; 32];
    bytes[32 - chunk.len()..].copy_from_slice(chunk);
    fr_from_be_bytes(&bytes).expect("31-byte value is always in field")
}

/// Serde adapter: one field element as canonical hex.
pub mod serde_fr {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{fr_from_hex, fr_to_hex, Fr};

    pub fn serialize<S: Serializer>(fe: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fr_to_hex(fe))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let s = String::deserialize(deserializer)?;
        fr_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: a vector of field elements as canonical hex strings.
pub mod serde_fr_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{fr_from_hex, fr_to_hex, Fr};

    pub fn serialize<S: Serializer>(fes: &[Fr], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(fes.iter().map(fr_to_hex))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fr>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| fr_from_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
