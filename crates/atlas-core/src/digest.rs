//! # Content Digests and CIDs
//!
//! A snapshot blob is addressed by the SHA-256 digest of its canonical
//! bytes. `ContentDigest` can only be computed from [`CanonicalBytes`],
//! so every address in the system is derived through the one
//! canonicalization pipeline. `Cid` is the printable, self-describing
//! form (`sha256:<64 hex>`) that crosses the blob-store boundary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::IntegrityError;

/// The hash algorithm that produced a content digest.
///
/// Blob addressing is SHA-256; the tag exists so stored addresses remain
/// self-describing if the store ever carries a second algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    pub algorithm: DigestAlgorithm,
    pub bytes: [u8; 32],
}

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

/// Compute the SHA-256 content digest of canonical bytes.
///
/// This is the only digest entry point: the argument type makes it a
/// compile error to hash bytes that did not come out of the
/// canonicalization pipeline.
pub fn content_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest {
        algorithm: DigestAlgorithm::Sha256,
        bytes,
    }
}

/// Compute the SHA-256 digest of raw blob bytes.
///
/// This is the blob-store addressing path: a store receives opaque bytes
/// and must satisfy `same bytes -> same address`. Snapshot bytes reach a
/// store only via [`CanonicalBytes`], so for snapshots this agrees with
/// [`content_digest`] by construction.
pub fn blob_digest(bytes: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest {
        algorithm: DigestAlgorithm::Sha256,
        bytes: out,
    }
}

/// A content identifier: the printable address of an immutable blob.
///
/// Wire form is `sha256:<64 lowercase hex chars>`. Parsing is strict:
/// wrong algorithm label, wrong length, uppercase, or non-hex input is
/// `MalformedSnapshot` territory, not something to normalize silently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(String);

impl Cid {
    /// Build a CID from a content digest.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self(format!("{}:{}", digest.algorithm.as_str(), digest.to_hex()))
    }

    /// Parse and validate a CID string.
    pub fn parse(s: &str) -> Result<Self, IntegrityError> {
        let Some(hex_part) = s.strip_prefix("sha256:") else {
            return Err(IntegrityError::MalformedSnapshot(format!(
                "cid missing algorithm prefix: {s}"
            )));
        };
        if hex_part.len() != 64
            || !hex_part
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(IntegrityError::MalformedSnapshot(format!(
                "cid digest must be 64 lowercase hex chars: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Cid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cid::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(value: &serde_json::Value) -> ContentDigest {
        content_digest(&CanonicalBytes::new(value).unwrap())
    }

    #[test]
    fn same_bytes_same_cid() {
        let a = digest_of(&serde_json::json!({"a": 1, "b": 2}));
        let b = digest_of(&serde_json::json!({"b": 2, "a": 1}));
        assert_eq!(Cid::from_digest(&a), Cid::from_digest(&b));
    }

    #[test]
    fn different_bytes_different_cid() {
        let a = digest_of(&serde_json::json!({"a": 1}));
        let b = digest_of(&serde_json::json!({"a": 2}));
        assert_ne!(Cid::from_digest(&a), Cid::from_digest(&b));
    }

    #[test]
    fn cid_roundtrip() {
        let cid = Cid::from_digest(&digest_of(&serde_json::json!({"x": 1})));
        let parsed = Cid::parse(cid.as_str()).unwrap();
        assert_eq!(cid, parsed);
    }

    #[test]
    fn cid_rejects_bad_shapes() {
        assert!(Cid::parse("deadbeef").is_err());
        assert!(Cid::parse("sha256:abc").is_err());
        assert!(Cid::parse(&format!("sha256:{}", "G".repeat(64))).is_err());
        assert!(Cid::parse(&format!("md5:{}", "a".repeat(64))).is_err());
        assert!(Cid::parse(&format!("sha256:{}", "A".repeat(64))).is_err());
    }

    #[test]
    fn cid_serde_as_string() {
        let cid = Cid::from_digest(&digest_of(&serde_json::json!([1, 2, 3])));
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{cid}\""));
        let back: Cid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);
    }
}
