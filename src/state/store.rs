//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;

use super::types::InstanceState;
use crate::changes::BlueprintChanges;
use crate::error::Result;

/// Trait for state storage backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the state of an instance.
    ///
    /// Returns `None` if no state exists for the instance.
    async fn load_instance(&self, instance_id: &str) -> Result<Option<InstanceState>>;

    /// Saves the state of an instance, keyed by its instance ID.
    async fn save_instance(&self, state: &InstanceState) -> Result<()>;

    /// Loads a previously staged changeset.
    ///
    /// Returns `None` if no changeset exists with the given ID.
    async fn load_changes(&self, changeset_id: &str) -> Result<Option<BlueprintChanges>>;

    /// Saves a staged changeset and returns its newly assigned ID.
    async fn save_changes(&self, changes: &BlueprintChanges) -> Result<String>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load_instance(&self, instance_id: &str) -> Result<Option<InstanceState>> {
        (**self).load_instance(instance_id).await
    }

    async fn save_instance(&self, state: &InstanceState) -> Result<()> {
        (**self).save_instance(state).await
    }

    async fn load_changes(&self, changeset_id: &str) -> Result<Option<BlueprintChanges>> {
        (**self).load_changes(changeset_id).await
    }

    async fn save_changes(&self, changes: &BlueprintChanges) -> Result<String> {
        (**self).save_changes(changes).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
