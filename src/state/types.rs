//! Instance state types.
//!
//! These types represent the persisted state of a deployed blueprint
//! instance: resources, links, child blueprints and exports, together with
//! the status state machine that rollback safety decisions are based on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::MappingNode;

/// The persisted state of one blueprint instance (or child blueprint).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Instance identifier.
    pub instance_id: String,
    /// Human-friendly instance name.
    #[serde(default)]
    pub instance_name: String,
    /// Overall instance status.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Resources keyed by resource ID.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
    /// Resource IDs keyed by resource name.
    #[serde(default)]
    pub resource_ids: BTreeMap<String, String>,
    /// Links keyed by link name (`resourceA::resourceB`).
    #[serde(default)]
    pub links: BTreeMap<String, LinkState>,
    /// Child blueprint instances keyed by child name.
    #[serde(default)]
    pub child_blueprints: BTreeMap<String, InstanceState>,
    /// Exports keyed by export name.
    #[serde(default)]
    pub exports: BTreeMap<String, ExportState>,
    /// Blueprint-level metadata.
    #[serde(default)]
    pub metadata: Option<MappingNode>,
    /// When the instance was last deployed.
    #[serde(default)]
    pub last_deployed: Option<DateTime<Utc>>,
}

/// State of a single resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource identifier.
    #[serde(default)]
    pub resource_id: String,
    /// Resource name within its blueprint.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Instance the resource belongs to.
    #[serde(default)]
    pub instance_id: String,
    /// High-level status.
    #[serde(default)]
    pub status: ResourceStatus,
    /// Detailed status.
    #[serde(default)]
    pub precise_status: PreciseResourceStatus,
    /// Last applied spec, including computed fields.
    #[serde(default)]
    pub spec_data: Option<MappingNode>,
    /// Last applied metadata.
    #[serde(default)]
    pub metadata: Option<MappingNode>,
    /// Paths of spec fields computed by the provider.
    #[serde(default)]
    pub computed_fields: Vec<String>,
    /// Reasons for the last failure, if any.
    #[serde(default)]
    pub failure_reasons: Vec<String>,
    /// When the resource was last deployed.
    #[serde(default)]
    pub last_deployed: Option<DateTime<Utc>>,
}

/// State of a single link between two resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    /// Link identifier.
    pub link_id: String,
    /// Link name (`resourceA::resourceB`).
    pub name: String,
    /// Instance the link belongs to.
    #[serde(default)]
    pub instance_id: String,
    /// High-level status.
    #[serde(default)]
    pub status: LinkStatus,
    /// Detailed status.
    #[serde(default)]
    pub precise_status: PreciseLinkStatus,
    /// Data held by the link.
    #[serde(default)]
    pub data: Option<MappingNode>,
    /// Reasons for the last failure, if any.
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

/// State of a single export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportState {
    /// Field path the export reads from.
    pub field: String,
    /// Exported value.
    #[serde(default)]
    pub value: Option<MappingNode>,
    /// Export type.
    #[serde(rename = "type", default)]
    pub export_type: String,
}

/// Overall status of a blueprint instance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Status is unknown.
    #[default]
    Unknown,
    /// Instance is being prepared for deployment.
    Preparing,
    /// Instance is being deployed for the first time.
    Deploying,
    /// Instance was deployed.
    Deployed,
    /// First deployment failed.
    DeployFailed,
    /// Instance is being updated.
    Updating,
    /// Instance was updated.
    Updated,
    /// Update failed.
    UpdateFailed,
    /// Instance is being destroyed.
    Destroying,
    /// Instance was destroyed.
    Destroyed,
    /// Destruction failed.
    DestroyFailed,
    /// A failed operation is being rolled back.
    RollingBack,
    /// Rollback failed.
    RollbackFailed,
    /// Rollback completed.
    RollbackComplete,
}

/// High-level status of a resource.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Status is unknown.
    #[default]
    Unknown,
    /// Resource is being created.
    Creating,
    /// Resource was created.
    Created,
    /// Creation failed.
    CreateFailed,
    /// Resource is being destroyed.
    Destroying,
    /// Resource was destroyed.
    Destroyed,
    /// Destruction failed.
    DestroyFailed,
    /// Resource is being updated.
    Updating,
    /// Resource was updated.
    Updated,
    /// Update failed.
    UpdateFailed,
    /// A failed operation is being rolled back.
    RollingBack,
    /// Rollback failed.
    RollbackFailed,
    /// Rollback completed.
    RollbackComplete,
}

/// Detailed status of a resource.
///
/// `ConfigComplete` and `UpdateConfigComplete` mean the provider accepted
/// the configuration and only stabilisation remains.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreciseResourceStatus {
    /// Status is unknown.
    #[default]
    Unknown,
    /// Resource is being created.
    Creating,
    /// Creation configuration applied, awaiting stabilisation.
    ConfigComplete,
    /// Resource was created and is stable.
    Created,
    /// Creation failed.
    CreateFailed,
    /// Creation is being rolled back.
    CreateRollingBack,
    /// Creation rollback failed.
    CreateRollbackFailed,
    /// Creation rollback completed.
    CreateRollbackComplete,
    /// Resource is being destroyed.
    Destroying,
    /// Resource was destroyed.
    Destroyed,
    /// Destruction failed.
    DestroyFailed,
    /// Destruction is being rolled back.
    DestroyRollingBack,
    /// Destruction rollback failed.
    DestroyRollbackFailed,
    /// Destruction rollback completed.
    DestroyRollbackComplete,
    /// Resource is being updated.
    Updating,
    /// Update configuration applied, awaiting stabilisation.
    UpdateConfigComplete,
    /// Resource was updated and is stable.
    Updated,
    /// Update failed.
    UpdateFailed,
    /// Update is being rolled back.
    UpdateRollingBack,
    /// Update rollback failed.
    UpdateRollbackFailed,
    /// Update rollback completed.
    UpdateRollbackComplete,
}

/// High-level status of a link.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStatus {
    /// Status is unknown.
    #[default]
    Unknown,
    /// Link is being created.
    Creating,
    /// Link was created.
    Created,
    /// Creation failed.
    CreateFailed,
    /// Link is being destroyed.
    Destroying,
    /// Link was destroyed.
    Destroyed,
    /// Destruction failed.
    DestroyFailed,
    /// Link is being updated.
    Updating,
    /// Link was updated.
    Updated,
    /// Update failed.
    UpdateFailed,
    /// A failed operation is being rolled back.
    RollingBack,
    /// Rollback failed.
    RollbackFailed,
    /// Rollback completed.
    RollbackComplete,
}

/// Detailed status of a link, tracking each stage of applying it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreciseLinkStatus {
    /// Status is unknown.
    #[default]
    Unknown,
    /// Resource A is being updated with link data.
    UpdatingResourceA,
    /// Resource A was updated.
    ResourceAUpdated,
    /// Updating resource A failed.
    ResourceAUpdateFailed,
    /// Resource B is being updated with link data.
    UpdatingResourceB,
    /// Resource B was updated.
    ResourceBUpdated,
    /// Updating resource B failed.
    ResourceBUpdateFailed,
    /// Intermediary resources are being updated.
    UpdatingIntermediaryResources,
    /// Intermediary resources were updated; the link is complete.
    IntermediaryResourcesUpdated,
    /// Updating intermediary resources failed.
    IntermediaryResourceUpdateFailed,
}

impl InstanceState {
    /// Creates a new empty instance state.
    #[must_use]
    pub fn new(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            ..Self::default()
        }
    }

    /// Gets a resource by name.
    ///
    /// Uses the name index when it has an entry and falls back to scanning
    /// `resources`, so states persisted without an index still resolve.
    #[must_use]
    pub fn resource_by_name(&self, name: &str) -> Option<&ResourceState> {
        self.resource_ids
            .get(name)
            .and_then(|id| self.resources.get(id))
            .or_else(|| self.resources.values().find(|r| r.name == name))
    }

    /// Adds or replaces a resource, keeping the name index in sync.
    pub fn set_resource(&mut self, resource: ResourceState) {
        self.resource_ids
            .insert(resource.name.clone(), resource.resource_id.clone());
        self.resources.insert(resource.resource_id.clone(), resource);
    }

    /// Adds or replaces a link.
    pub fn set_link(&mut self, link: LinkState) {
        self.links.insert(link.name.clone(), link);
    }

    /// Adds or replaces a child blueprint.
    pub fn set_child(&mut self, name: &str, child: Self) {
        self.child_blueprints.insert(name.to_string(), child);
    }

    /// Adds or replaces an export.
    pub fn set_export(&mut self, name: &str, export: ExportState) {
        self.exports.insert(name.to_string(), export);
    }

    /// Gets a link by name.
    #[must_use]
    pub fn link(&self, name: &str) -> Option<&LinkState> {
        self.links.get(name)
    }

    /// Gets a child blueprint by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.child_blueprints.get(name)
    }

    /// Returns resources in name order.
    pub fn resources_by_name(&self) -> impl Iterator<Item = (&str, &ResourceState)> {
        let mut resources: Vec<_> = self
            .resources
            .values()
            .map(|resource| (resource.name.as_str(), resource))
            .collect();
        resources.sort_by(|a, b| a.0.cmp(b.0));
        resources.into_iter()
    }
}

impl ResourceState {
    /// Creates a new resource state with the given status.
    #[must_use]
    pub fn new(resource_id: &str, name: &str, resource_type: &str, status: ResourceStatus) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            status,
            ..Self::default()
        }
    }

    /// Sets the detailed status, builder style.
    #[must_use]
    pub const fn with_precise_status(mut self, precise_status: PreciseResourceStatus) -> Self {
        self.precise_status = precise_status;
        self
    }

    /// Sets the spec data, builder style.
    #[must_use]
    pub fn with_spec(mut self, spec: MappingNode) -> Self {
        self.spec_data = Some(spec);
        self
    }

    /// Returns true if the resource finished being created, so removing it
    /// is safe.
    #[must_use]
    pub const fn creation_complete(&self) -> bool {
        matches!(self.status, ResourceStatus::Created)
            || matches!(
                self.precise_status,
                PreciseResourceStatus::ConfigComplete | PreciseResourceStatus::Created
            )
    }

    /// Returns true if the resource finished being updated, so reverting
    /// the update is safe.
    #[must_use]
    pub const fn update_complete(&self) -> bool {
        matches!(self.status, ResourceStatus::Updated)
            || matches!(self.precise_status, PreciseResourceStatus::UpdateConfigComplete)
    }

    /// Returns true if the resource finished being destroyed, so recreating
    /// it is safe.
    #[must_use]
    pub const fn destruction_complete(&self) -> bool {
        matches!(self.status, ResourceStatus::Destroyed)
    }
}

impl LinkState {
    /// Creates a new link state with the given status.
    #[must_use]
    pub fn new(link_id: &str, name: &str, status: LinkStatus) -> Self {
        Self {
            link_id: link_id.to_string(),
            name: name.to_string(),
            status,
            ..Self::default()
        }
    }

    /// Sets the link data, builder style.
    #[must_use]
    pub fn with_data(mut self, data: MappingNode) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns true if the link finished being created, so removing it is
    /// safe.
    #[must_use]
    pub const fn creation_complete(&self) -> bool {
        matches!(self.status, LinkStatus::Created)
            || matches!(
                self.precise_status,
                PreciseLinkStatus::IntermediaryResourcesUpdated
            )
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Unknown => "UNKNOWN",
            Self::Preparing => "PREPARING",
            Self::Deploying => "DEPLOYING",
            Self::Deployed => "DEPLOYED",
            Self::DeployFailed => "DEPLOY FAILED",
            Self::Updating => "UPDATING",
            Self::Updated => "UPDATED",
            Self::UpdateFailed => "UPDATE FAILED",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
            Self::DestroyFailed => "DESTROY FAILED",
            Self::RollingBack => "ROLLING BACK",
            Self::RollbackFailed => "ROLLBACK FAILED",
            Self::RollbackComplete => "ROLLBACK COMPLETE",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Unknown => "UNKNOWN",
            Self::Creating => "CREATING",
            Self::Created => "CREATED",
            Self::CreateFailed => "CREATE FAILED",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
            Self::DestroyFailed => "DESTROY FAILED",
            Self::Updating => "UPDATING",
            Self::Updated => "UPDATED",
            Self::UpdateFailed => "UPDATE FAILED",
            Self::RollingBack => "ROLLING BACK",
            Self::RollbackFailed => "ROLLBACK FAILED",
            Self::RollbackComplete => "ROLLBACK COMPLETE",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Unknown => "UNKNOWN",
            Self::Creating => "CREATING",
            Self::Created => "CREATED",
            Self::CreateFailed => "CREATE FAILED",
            Self::Destroying => "DESTROYING",
            Self::Destroyed => "DESTROYED",
            Self::DestroyFailed => "DESTROY FAILED",
            Self::Updating => "UPDATING",
            Self::Updated => "UPDATED",
            Self::UpdateFailed => "UPDATE FAILED",
            Self::RollingBack => "ROLLING BACK",
            Self::RollbackFailed => "ROLLBACK FAILED",
            Self::RollbackComplete => "ROLLBACK COMPLETE",
        };
        write!(f, "{status}")
    }
}
