//! Changeset digests.
//!
//! Changesets serialize deterministically (maps are ordered, lists keep
//! generation order), so the SHA-256 of their JSON form identifies a
//! changeset. Rollback replay compares digests to confirm that reversing
//! the same inputs produced the same plan.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, StateError};
use crate::state::InstanceState;

use super::types::BlueprintChanges;

/// Hasher for computing changeset digests.
#[derive(Debug, Default)]
pub struct ChangesetHasher;

impl ChangesetHasher {
    /// Creates a new changeset hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the digest of a changeset.
    ///
    /// # Errors
    ///
    /// Returns an error if the changeset cannot be serialized.
    pub fn hash_changes(&self, changes: &BlueprintChanges) -> Result<String> {
        Self::hash_json(changes)
    }

    /// Computes the digest of an instance state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn hash_instance(&self, state: &InstanceState) -> Result<String> {
        Self::hash_json(state)
    }

    fn hash_json<T: Serialize>(value: &T) -> Result<String> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StateError::serialization(format!("Failed to serialize for digest: {e}")))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes a short hash (first 12 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(12).collect()
    }

    /// Compares two digests to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        // Constant-time comparison
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
