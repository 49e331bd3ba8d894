//! Teardown changesets built from instance state alone.
//!
//! Used to tear down a deployment that never finished being created, where
//! no prior changeset exists to reverse.

use tracing::{debug, info};

use crate::state::InstanceState;

use super::reverse::MAX_REVERSE_DEPTH;
use super::types::{
    BlueprintChanges, REASON_LINK_CREATE_INCOMPLETE, REASON_RESOURCE_CREATE_INCOMPLETE,
    RemovalChangesResult, SkippedItemType, SkippedRollbackItem, join_child_path,
};

/// Builds a teardown changeset for an instance, using the default depth
/// bound.
#[must_use]
pub fn create_removal_changes_from_instance_state(
    state: Option<&InstanceState>,
) -> RemovalChangesResult {
    RemovalChangesBuilder::default().build(state)
}

/// Builds teardown changesets, removing only entities that finished being
/// created.
#[derive(Debug, Clone, Copy)]
pub struct RemovalChangesBuilder {
    max_depth: usize,
}

impl Default for RemovalChangesBuilder {
    fn default() -> Self {
        Self::new(MAX_REVERSE_DEPTH)
    }
}

impl RemovalChangesBuilder {
    /// Creates a builder that inspects at most `max_depth` levels of child
    /// blueprints for unsafe entities.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Builds the teardown changeset for `state`.
    ///
    /// Children and exports are always removed. Resources and links are
    /// removed only if their creation completed; the rest are reported as
    /// skipped.
    #[must_use]
    pub fn build(&self, state: Option<&InstanceState>) -> RemovalChangesResult {
        let Some(state) = state else {
            return RemovalChangesResult::default();
        };

        let mut skipped = Vec::new();
        let changes = Self::removal_level(state, "", &mut skipped);

        for (name, child) in &state.child_blueprints {
            self.collect_child_skips(child, &join_child_path("", name), 1, &mut skipped);
        }

        info!(
            "Teardown: {} resource(s), {} link(s), {} child blueprint(s), {} skipped",
            changes.removed_resources.len(),
            changes.removed_links.len(),
            changes.removed_children.len(),
            skipped.len()
        );

        RemovalChangesResult::new(Some(changes), skipped)
    }

    fn removal_level(
        state: &InstanceState,
        child_path: &str,
        skipped: &mut Vec<SkippedRollbackItem>,
    ) -> BlueprintChanges {
        let changes = BlueprintChanges {
            removed_resources: state
                .resources_by_name()
                .filter(|(_, resource)| resource.creation_complete())
                .map(|(name, _)| name.to_string())
                .collect(),
            removed_links: state
                .links
                .iter()
                .filter(|(_, link)| link.creation_complete())
                .map(|(name, _)| name.clone())
                .collect(),
            removed_children: state.child_blueprints.keys().cloned().collect(),
            removed_exports: state.exports.keys().cloned().collect(),
            ..BlueprintChanges::default()
        };

        collect_unsafe_entities(state, child_path, skipped);
        changes
    }

    /// Records the unsafe entities of a child blueprint that is removed as a
    /// whole.
    fn collect_child_skips(
        &self,
        state: &InstanceState,
        child_path: &str,
        depth: usize,
        skipped: &mut Vec<SkippedRollbackItem>,
    ) {
        if depth > self.max_depth {
            debug!("Not inspecting children below {child_path}: depth bound reached");
            return;
        }

        collect_unsafe_entities(state, child_path, skipped);

        for (name, child) in &state.child_blueprints {
            let path = join_child_path(child_path, name);
            self.collect_child_skips(child, &path, depth + 1, skipped);
        }
    }
}

/// Records every resource and link of one level whose creation never
/// completed.
fn collect_unsafe_entities(
    state: &InstanceState,
    child_path: &str,
    skipped: &mut Vec<SkippedRollbackItem>,
) {
    for (name, resource) in state.resources_by_name() {
        if !resource.creation_complete() {
            skipped.push(SkippedRollbackItem {
                name: name.to_string(),
                item_type: SkippedItemType::Resource,
                child_path: child_path.to_string(),
                status: resource.status.to_string(),
                reason: String::from(REASON_RESOURCE_CREATE_INCOMPLETE),
            });
        }
    }

    for (name, link) in &state.links {
        if !link.creation_complete() {
            skipped.push(SkippedRollbackItem {
                name: name.clone(),
                item_type: SkippedItemType::Link,
                child_path: child_path.to_string(),
                status: link.status.to_string(),
                reason: String::from(REASON_LINK_CREATE_INCOMPLETE),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MappingNode;
    use crate::state::{
        ExportState, LinkState, LinkStatus, PreciseLinkStatus, PreciseResourceStatus,
        ResourceState, ResourceStatus,
    };

    #[test]
    fn test_none_state() {
        let result = create_removal_changes_from_instance_state(None);
        assert!(result.changes.is_none());
        assert!(!result.has_skipped_items);
    }

    #[test]
    fn test_removal_safety() {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(ResourceState::new("res-1", "first", "t", ResourceStatus::Created));
        state.set_resource(ResourceState::new(
            "res-2",
            "second",
            "t",
            ResourceStatus::CreateFailed,
        ));

        let result = create_removal_changes_from_instance_state(Some(&state));
        let changes = result.changes.as_ref().expect("changes");

        assert_eq!(changes.removed_resources, vec!["first"]);
        assert!(result.has_skipped_items);
        assert_eq!(result.skipped_items.len(), 1);
        assert_eq!(result.skipped_items[0].name, "second");
        assert_eq!(result.skipped_items[0].status, "CREATE FAILED");
        assert_eq!(result.skipped_items[0].reason, REASON_RESOURCE_CREATE_INCOMPLETE);
    }

    #[test]
    fn test_precise_status_counts_as_created() {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(
            ResourceState::new("res-1", "configured", "t", ResourceStatus::Creating)
                .with_precise_status(PreciseResourceStatus::ConfigComplete),
        );
        let mut link = LinkState::new("l-1", "configured::other", LinkStatus::Updating);
        link.precise_status = PreciseLinkStatus::IntermediaryResourcesUpdated;
        state.set_link(link);
        state.set_link(LinkState::new("l-2", "configured::broken", LinkStatus::CreateFailed));

        let result = create_removal_changes_from_instance_state(Some(&state));
        let changes = result.changes.as_ref().expect("changes");

        assert_eq!(changes.removed_resources, vec!["configured"]);
        assert_eq!(changes.removed_links, vec!["configured::other"]);
        assert_eq!(result.skipped_items.len(), 1);
        assert_eq!(result.skipped_items[0].item_type, SkippedItemType::Link);
    }

    #[test]
    fn test_children_and_exports() {
        let mut child = InstanceState::new("inst-child");
        child.set_resource(ResourceState::new("res-9", "cache", "t", ResourceStatus::Creating));
        let mut state = InstanceState::new("inst-1");
        state.set_child("core", child);
        state.set_export(
            "url",
            ExportState {
                field: String::from("resources.api.spec.url"),
                value: Some(MappingNode::from("https://api")),
                export_type: String::from("string"),
            },
        );

        let result = create_removal_changes_from_instance_state(Some(&state));
        let changes = result.changes.as_ref().expect("changes");

        assert_eq!(changes.removed_children, vec!["core"]);
        assert_eq!(changes.removed_exports, vec!["url"]);
        assert_eq!(result.skipped_items.len(), 1);
        assert_eq!(result.skipped_items[0].child_path, "core");
        assert_eq!(result.skipped_items[0].name, "cache");
    }

    #[test]
    fn test_state_without_name_index() {
        let json = r#"{
            "instance_id": "inst-1",
            "resources": {
                "res-1": {"name": "q", "status": "CREATED"},
                "res-2": {"name": "bad", "status": "CREATE_FAILED"}
            }
        }"#;
        let state: InstanceState = serde_json::from_str(json).expect("valid state");

        let result = create_removal_changes_from_instance_state(Some(&state));
        let changes = result.changes.as_ref().expect("changes");

        assert_eq!(changes.removed_resources, vec!["q"]);
        assert_eq!(result.skipped_items.len(), 1);
        assert_eq!(result.skipped_items[0].name, "bad");
    }

    #[test]
    fn test_child_depth_bound() {
        let mut deepest = InstanceState::new("inst-deep");
        deepest.set_resource(ResourceState::new("res-1", "r", "t", ResourceStatus::CreateFailed));
        let mut state = deepest;
        for level in 0..6 {
            let mut parent = InstanceState::new(&format!("inst-{level}"));
            parent.set_child("child", state);
            state = parent;
        }

        let bounded = RemovalChangesBuilder::new(5).build(Some(&state));
        assert!(!bounded.has_skipped_items);

        let unbounded = RemovalChangesBuilder::new(6).build(Some(&state));
        assert_eq!(unbounded.skipped_items.len(), 1);
        assert_eq!(
            unbounded.skipped_items[0].child_path,
            "child.child.child.child.child.child"
        );
    }
}
