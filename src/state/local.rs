//! Local file-based state storage backend.
//!
//! Instances are stored as `<dir>/instances/<instance_id>.json` and staged
//! changesets as `<dir>/changesets/<changeset_id>.json`.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::changes::BlueprintChanges;
use crate::error::{ChangesError, Result, StateError};

use super::store::StateStore;
use super::types::InstanceState;

/// Default state directory name.
pub const STATE_DIR: &str = ".bpchanges";

/// Subdirectory holding instance states.
const INSTANCES_DIR: &str = "instances";

/// Subdirectory holding staged changesets.
const CHANGESETS_DIR: &str = "changesets";

/// Local file-based state store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    /// Base directory for state files.
    base_dir: PathBuf,
}

impl LocalStateStore {
    /// Creates a new local state store under the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| ChangesError::internal(format!("Cannot determine current directory: {e}")))?
            .join(STATE_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a new local state store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the file path of an instance state.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID cannot be used as a file name.
    pub fn instance_path(&self, instance_id: &str) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(INSTANCES_DIR)
            .join(file_name(instance_id)?))
    }

    /// Returns the file path of a staged changeset.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID cannot be used as a file name.
    pub fn changes_path(&self, changeset_id: &str) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(CHANGESETS_DIR)
            .join(file_name(changeset_id)?))
    }

    async fn read_json<T: DeserializeOwned + Send>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            debug!("State file does not exist: {}", path.display());
            return Ok(None);
        }

        info!("Loading state from: {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| {
            ChangesError::State(StateError::Corrupted {
                message: format!("Failed to read {}: {e}", path.display()),
            })
        })?;

        let value = serde_json::from_str(&content).map_err(|e| {
            ChangesError::State(StateError::Corrupted {
                message: format!("Failed to parse {}: {e}", path.display()),
            })
        })?;

        Ok(Some(value))
    }

    async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                debug!("Creating state directory: {}", dir.display());
                fs::create_dir_all(dir).await.map_err(|e| {
                    StateError::storage(format!("Failed to create state directory: {e}"))
                })?;
            }
        }

        info!("Saving state to: {}", path.display());

        let content = serde_json::to_string_pretty(value)
            .map_err(|e| StateError::serialization(format!("Failed to serialize state: {e}")))?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StateError::storage(format!("Failed to create temp state file: {e}")))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StateError::storage(format!("Failed to write state file: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| StateError::storage(format!("Failed to sync state file: {e}")))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StateError::storage(format!("Failed to rename state file: {e}")))?;

        debug!("State saved successfully");
        Ok(())
    }
}

/// Maps an ID to a JSON file name, rejecting IDs that would escape the
/// state directory.
fn file_name(id: &str) -> Result<String> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.contains('\0');

    if valid {
        Ok(format!("{id}.json"))
    } else {
        Err(StateError::storage(format!("Invalid state identifier: '{id}'")).into())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load_instance(&self, instance_id: &str) -> Result<Option<InstanceState>> {
        let path = self.instance_path(instance_id)?;
        Self::read_json(&path).await
    }

    async fn save_instance(&self, state: &InstanceState) -> Result<()> {
        let path = self.instance_path(&state.instance_id)?;
        Self::write_json(&path, state).await
    }

    async fn load_changes(&self, changeset_id: &str) -> Result<Option<BlueprintChanges>> {
        let path = self.changes_path(changeset_id)?;
        Self::read_json(&path).await
    }

    async fn save_changes(&self, changes: &BlueprintChanges) -> Result<String> {
        let changeset_id = Uuid::new_v4().to_string();
        let path = self.changes_path(&changeset_id)?;
        Self::write_json(&path, changes).await?;
        info!("Stored changeset {changeset_id}");
        Ok(changeset_id)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::Changes;
    use crate::state::{ResourceState, ResourceStatus};
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load_instance() {
        let (store, _temp) = create_test_store();

        let mut state = InstanceState::new("inst-1");
        state.set_resource(ResourceState::new(
            "res-1",
            "ordersQueue",
            "aws/sqs/queue",
            ResourceStatus::Created,
        ));
        store.save_instance(&state).await.expect("Failed to save state");

        let loaded = store
            .load_instance("inst-1")
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded, state);
        assert!(loaded.resource_by_name("ordersQueue").is_some());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load_instance("missing").await.expect("Load should not fail");
        assert!(result.is_none());

        let changes = store.load_changes("missing").await.expect("Load should not fail");
        assert!(changes.is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_changes() {
        let (store, _temp) = create_test_store();

        let mut changes = BlueprintChanges::default();
        changes
            .new_resources
            .insert(String::from("ordersQueue"), Changes::default());
        changes.removed_links.push(String::from("a::b"));

        let id = store.save_changes(&changes).await.expect("Failed to save changes");
        assert!(store.changes_path(&id).expect("valid id").exists());

        let loaded = store
            .load_changes(&id)
            .await
            .expect("Failed to load changes")
            .expect("Changes should exist");
        assert_eq!(loaded, changes);
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let (store, temp) = create_test_store();
        let dir = temp.path().join(INSTANCES_DIR);
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("broken.json"), "{not json").expect("write file");

        let result = store.load_instance("broken").await;
        assert!(matches!(
            result,
            Err(ChangesError::State(StateError::Corrupted { .. }))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (store, _temp) = create_test_store();

        assert!(store.load_instance("../etc/passwd").await.is_err());
        assert!(store.load_instance("").await.is_err());
        assert!(store.instance_path("inst-1").is_ok());
    }

    #[test]
    fn test_backend_type() {
        let (store, _temp) = create_test_store();
        assert_eq!(store.backend_type(), "local");
    }
}
