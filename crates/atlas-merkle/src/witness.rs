//! Witness preparation for the external membership circuit.
//!
//! The circuit's public inputs are {merkle_root, nullifier,
//! authority_hash, epoch_id, campaign_id}; the private remainder is the
//! leaf, the sibling path, the leaf index, and the user secret. This
//! module assembles both halves from an inclusion proof plus
//! caller-supplied scalars, range-checking every external value.

use serde::{Deserialize, Serialize};

use atlas_core::error::ProofError;
use atlas_crypto::field::{fr_from_hex, serde_fr, serde_fr_vec, Fr};

use crate::proof::{InclusionProof, ProofService};

/// Caller-supplied witness inputs, canonical hex on the wire.
///
/// `action_id` scopes the nullifier: one secret acting twice on the same
/// action produces the same nullifier without revealing the secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WitnessRequest {
    pub user_secret: String,
    pub action_id: String,
    pub epoch_id: String,
    pub campaign_id: String,
    /// Authority identifier string, hashed into `authority_hash`.
    pub authority_id: String,
}

/// The assembled witness, shaped exactly as the circuit consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitWitness {
    #[serde(with = "serde_fr")]
    pub merkle_root: Fr,
    #[serde(with = "serde_fr")]
    pub nullifier: Fr,
    #[serde(with = "serde_fr")]
    pub authority_hash: Fr,
    #[serde(with = "serde_fr")]
    pub epoch_id: Fr,
    #[serde(with = "serde_fr")]
    pub campaign_id: Fr,
    #[serde(with = "serde_fr")]
    pub leaf: Fr,
    #[serde(with = "serde_fr_vec")]
    pub merkle_path: Vec<Fr>,
    pub path_indices: Vec<u8>,
    pub leaf_index: u64,
    #[serde(with = "serde_fr")]
    pub user_secret: Fr,
}

impl ProofService {
    /// Assemble a circuit witness from a verified inclusion proof.
    ///
    /// # Errors
    ///
    /// - `ProofError::DepthMismatch` when the proof's path length is not
    ///   the snapshot depth (a placeholder proof can never be upgraded
    ///   into a witness).
    /// - `ProofError::Field` when any caller-supplied scalar is
    ///   malformed or out of field.
    pub fn prepare_witness(
        &self,
        proof: &InclusionProof,
        expected_depth: u8,
        request: &WitnessRequest,
    ) -> Result<CircuitWitness, ProofError> {
        if proof.siblings.len() != usize::from(expected_depth)
            || proof.path_indices.len() != usize::from(expected_depth)
        {
            return Err(ProofError::DepthMismatch {
                expected: expected_depth,
                actual: proof.siblings.len(),
            });
        }
        let user_secret = fr_from_hex(&request.user_secret)?;
        let action_id = fr_from_hex(&request.action_id)?;
        let epoch_id = fr_from_hex(&request.epoch_id)?;
        let campaign_id = fr_from_hex(&request.campaign_id)?;

        let hasher = self.hasher();
        Ok(CircuitWitness {
            merkle_root: proof.root,
            nullifier: hasher.hash_n(&[user_secret, action_id]),
            authority_hash: hasher.hash_string(&request.authority_id),
            epoch_id,
            campaign_id,
            leaf: proof.leaf,
            merkle_path: proof.siblings.clone(),
            path_indices: proof.path_indices.clone(),
            leaf_index: proof.leaf_index(),
            user_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use atlas_core::boundary::{AuthorityLevel, BoundaryType};
    use atlas_core::config::{POSEIDON_VARIANT, TreeDepth};
    use atlas_crypto::field::fr_to_hex;
    use atlas_crypto::FieldHasher;
    use atlas_geo::geometry::CanonicalGeometry;
    use atlas_geo::normalize::NormalizedBoundary;

    use crate::leaf::{hash_boundary_leaf, MerkleLeaf};
    use crate::tree::MerkleTree;

    fn fixture() -> (ProofService, Vec<MerkleLeaf>, MerkleTree) {
        let hasher = Arc::new(FieldHasher::new(POSEIDON_VARIANT).unwrap());
        let geometry = CanonicalGeometry::from_raw_polygons(
            &[vec![vec![
                (-89.6, 42.9),
                (-89.2, 42.9),
                (-89.2, 43.2),
                (-89.6, 43.2),
                (-89.6, 42.9),
            ]]],
            6,
        )
        .unwrap();
        let boundary = NormalizedBoundary::new(
            "US-Congress-WI-5502".to_string(),
            "District 2".to_string(),
            geometry,
            BoundaryType::CongressionalDistrict,
            AuthorityLevel::FEDERAL,
            "US-State-WI".to_string(),
            None,
        );
        let leaves = vec![MerkleLeaf {
            leaf_hash: hash_boundary_leaf(&hasher, &boundary),
            boundary_id: boundary.id().to_string(),
            boundary_type: boundary.boundary_type(),
            boundary_name: boundary.name().to_string(),
            index: 0,
        }];
        let hashes: Vec<Fr> = leaves.iter().map(|l| l.leaf_hash).collect();
        let tree = MerkleTree::build(&hasher, &hashes, TreeDepth::Municipal).unwrap();
        (ProofService::new(hasher), leaves, tree)
    }

    fn request() -> WitnessRequest {
        WitnessRequest {
            user_secret: fr_to_hex(&Fr::from(1234u64)),
            action_id: fr_to_hex(&Fr::from(77u64)),
            epoch_id: fr_to_hex(&Fr::from(2026u64)),
            campaign_id: fr_to_hex(&Fr::from(9u64)),
            authority_id: "US-State-WI".to_string(),
        }
    }

    #[test]
    fn witness_carries_proof_and_derived_fields() {
        let (service, leaves, tree) = fixture();
        let proof = service
            .generate(
                &leaves,
                &tree,
                "US-Congress-WI-5502",
                BoundaryType::CongressionalDistrict,
            )
            .unwrap();
        let witness = service
            .prepare_witness(&proof, tree.depth(), &request())
            .unwrap();

        assert_eq!(witness.merkle_root, tree.root());
        assert_eq!(witness.leaf, proof.leaf);
        assert_eq!(witness.merkle_path.len(), usize::from(tree.depth()));
        assert_eq!(witness.leaf_index, 0);
        let hasher = service.hasher();
        assert_eq!(
            witness.nullifier,
            hasher.hash_n(&[Fr::from(1234u64), Fr::from(77u64)])
        );
        assert_eq!(witness.authority_hash, hasher.hash_string("US-State-WI"));
    }

    #[test]
    fn nullifier_changes_with_action_not_just_secret() {
        let (service, leaves, tree) = fixture();
        let proof = service
            .generate(
                &leaves,
                &tree,
                "US-Congress-WI-5502",
                BoundaryType::CongressionalDistrict,
            )
            .unwrap();
        let mut other_action = request();
        other_action.action_id = fr_to_hex(&Fr::from(78u64));
        let a = service.prepare_witness(&proof, tree.depth(), &request()).unwrap();
        let b = service
            .prepare_witness(&proof, tree.depth(), &other_action)
            .unwrap();
        assert_ne!(a.nullifier, b.nullifier);
        assert_eq!(a.user_secret, b.user_secret);
    }

    #[test]
    fn out_of_field_secret_rejected() {
        let (service, leaves, tree) = fixture();
        let proof = service
            .generate(
                &leaves,
                &tree,
                "US-Congress-WI-5502",
                BoundaryType::CongressionalDistrict,
            )
            .unwrap();
        let mut bad = request();
        bad.user_secret = format!("0x{}", "f".repeat(64));
        assert!(matches!(
            service.prepare_witness(&proof, tree.depth(), &bad),
            Err(ProofError::Field(_))
        ));
    }

    #[test]
    fn depth_mismatch_refused() {
        let (service, leaves, tree) = fixture();
        let mut proof = service
            .generate(
                &leaves,
                &tree,
                "US-Congress-WI-5502",
                BoundaryType::CongressionalDistrict,
            )
            .unwrap();
        proof.siblings.clear();
        proof.path_indices.clear();
        assert!(matches!(
            service.prepare_witness(&proof, tree.depth(), &request()),
            Err(ProofError::DepthMismatch { .. })
        ));
    }

    #[test]
    fn witness_serde_roundtrip() {
        let (service, leaves, tree) = fixture();
        let proof = service
            .generate(
                &leaves,
                &tree,
                "US-Congress-WI-5502",
                BoundaryType::CongressionalDistrict,
            )
            .unwrap();
        let witness = service
            .prepare_witness(&proof, tree.depth(), &request())
            .unwrap();
        let json = serde_json::to_string(&witness).unwrap();
        let back: CircuitWitness = serde_json::from_str(&json).unwrap();
        assert_eq!(back, witness);
    }
}
