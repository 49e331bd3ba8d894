//! Changeset types.
//!
//! A [`BlueprintChanges`] tree describes the difference between a persisted
//! instance state and a newly resolved blueprint, one node per blueprint
//! level. Trees are built fresh for each operation (staging, reversal,
//! filtering, teardown) and are treated as immutable values afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{MappingNode, ResolvedResource};
use crate::state::ResourceState;

/// Reason reported when reverting a resource update is unsafe.
pub const REASON_RESOURCE_UPDATE_INCOMPLETE: &str =
    "resource update was not completed successfully";

/// Reason reported when recreating a destroyed resource is unsafe.
pub const REASON_RESOURCE_DESTROY_INCOMPLETE: &str =
    "resource destruction was not completed successfully";

/// Reason reported when removing a created resource is unsafe.
pub const REASON_RESOURCE_CREATE_INCOMPLETE: &str =
    "resource creation was not completed successfully";

/// Reason reported when removing a created link is unsafe.
pub const REASON_LINK_CREATE_INCOMPLETE: &str = "link creation was not completed successfully";

/// A change to a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Path of the field within its entity (e.g. `spec.tags[0].value`).
    pub field_path: String,
    /// Previous value, `None` when the field was absent.
    #[serde(default)]
    pub prev_value: Option<MappingNode>,
    /// New value, `None` when absent or only known at deploy time.
    #[serde(default)]
    pub new_value: Option<MappingNode>,
    /// Whether applying the change requires recreating the entity.
    #[serde(default)]
    pub must_recreate: bool,
    /// Whether the values must be redacted in output.
    #[serde(default)]
    pub sensitive: bool,
}

/// Identity of the resource a set of changes applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceInfo {
    /// Resource ID, empty for a resource that does not exist yet.
    pub resource_id: String,
    /// Resource name within its blueprint.
    pub resource_name: String,
    /// Resource type.
    pub resource_type: String,
    /// Instance the resource belongs to.
    pub instance_id: String,
    /// Persisted state of the resource, if it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<ResourceState>,
    /// Newly resolved resource, if one is being applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedResource>,
}

/// Changes to a single resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Changes {
    /// Identity of the resource.
    pub applied_resource_info: ResourceInfo,
    /// Whether the resource must be destroyed and created again.
    pub must_recreate: bool,
    /// Fields whose value changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified_fields: Vec<FieldChange>,
    /// Fields that were added.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_fields: Vec<FieldChange>,
    /// Paths of fields that were removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<String>,
    /// Paths of fields that did not change.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchanged_fields: Vec<String>,
    /// Paths of fields computed by the provider at deploy time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub computed_fields: Vec<String>,
    /// Paths of fields whose new value is only known at deploy time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_changes_known_on_deploy: Vec<String>,
    /// Links to be created, keyed by target resource name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_outbound_links: BTreeMap<String, LinkChanges>,
    /// Links whose data changed, keyed by target resource name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outbound_link_changes: BTreeMap<String, LinkChanges>,
    /// Target resource names of links to be removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_outbound_links: Vec<String>,
}

/// Changes to the data held by a link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkChanges {
    /// Fields whose value changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified_fields: Vec<FieldChange>,
    /// Fields that were added.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_fields: Vec<FieldChange>,
    /// Paths of fields that were removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<String>,
    /// Paths of fields that did not change.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchanged_fields: Vec<String>,
    /// Paths of fields whose new value is only known at deploy time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_changes_known_on_deploy: Vec<String>,
}

/// Changes to blueprint-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataChanges {
    /// Fields that were added.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_fields: Vec<FieldChange>,
    /// Fields whose value changed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified_fields: Vec<FieldChange>,
    /// Paths of fields that were removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<String>,
    /// Paths of fields that did not change.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchanged_fields: Vec<String>,
}

/// The to-be-created contents of a brand-new child blueprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewBlueprintDefinition {
    /// Resources to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_resources: BTreeMap<String, Changes>,
    /// Nested child blueprints to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_children: BTreeMap<String, NewBlueprintDefinition>,
    /// Exports to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_exports: BTreeMap<String, FieldChange>,
    /// Paths whose values are only known at deploy time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolve_on_deploy: Vec<String>,
}

/// The changeset for one blueprint level.
///
/// Within a category, a name appears in at most one of the new, changed,
/// removed and unchanged collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintChanges {
    /// Resources to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_resources: BTreeMap<String, Changes>,
    /// Resources to update or recreate.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_changes: BTreeMap<String, Changes>,
    /// Names of resources to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_resources: Vec<String>,
    /// Names of links to remove (`resourceA::resourceB`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_links: Vec<String>,
    /// Child blueprints to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_children: BTreeMap<String, NewBlueprintDefinition>,
    /// Changes to existing child blueprints.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub child_changes: BTreeMap<String, BlueprintChanges>,
    /// Names of child blueprints to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_children: Vec<String>,
    /// Exports to create.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub new_exports: BTreeMap<String, FieldChange>,
    /// Exports whose value or source changed.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub export_changes: BTreeMap<String, FieldChange>,
    /// Names of exports that did not change.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchanged_exports: Vec<String>,
    /// Names of exports to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_exports: Vec<String>,
    /// Changes to blueprint-level metadata.
    pub metadata_changes: MetadataChanges,
    /// Paths whose new values are only known at deploy time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolve_on_deploy: Vec<String>,
}

/// Action a consumer takes for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Resource will be created.
    Create,
    /// Resource will be updated in place.
    Update,
    /// Resource will be destroyed and created again.
    Recreate,
    /// Resource will be removed.
    Delete,
    /// Nothing to do.
    NoChange,
}

/// A resource name paired with the action planned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAction {
    /// Dotted path of the containing child blueprint, empty at the root.
    pub child_path: String,
    /// Resource name.
    pub name: String,
    /// Planned action.
    pub action: ChangeAction,
}

/// Counts of planned actions across a changeset tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Resources to create.
    pub create: usize,
    /// Resources to update.
    pub update: usize,
    /// Resources to recreate.
    pub recreate: usize,
    /// Resources to remove.
    pub delete: usize,
    /// Links to remove.
    pub removed_links: usize,
    /// Child blueprints to create.
    pub new_children: usize,
    /// Child blueprints to remove.
    pub removed_children: usize,
}

/// Kind of entity a skipped rollback item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkippedItemType {
    /// A resource.
    Resource,
    /// A link between resources.
    Link,
}

/// An operation left out of a rollback or teardown because the entity is
/// not in a status from which it can be safely applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRollbackItem {
    /// Entity name.
    pub name: String,
    /// Entity kind.
    #[serde(rename = "type")]
    pub item_type: SkippedItemType,
    /// Dotted path of the containing child blueprint, empty at the root.
    pub child_path: String,
    /// Current status of the entity.
    pub status: String,
    /// Why the operation was skipped.
    pub reason: String,
}

/// A teardown changeset with the items that were unsafe to remove.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemovalChangesResult {
    /// The teardown changeset, `None` when there was no state.
    pub changes: Option<BlueprintChanges>,
    /// Items left out of the changeset.
    pub skipped_items: Vec<SkippedRollbackItem>,
    /// Whether any item was left out.
    pub has_skipped_items: bool,
}

/// A filtered reverse changeset with the items that were unsafe to revert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackFilterResult {
    /// The filtered changeset, `None` when there was nothing to filter.
    pub changes: Option<BlueprintChanges>,
    /// Items left out of the changeset.
    pub skipped_items: Vec<SkippedRollbackItem>,
    /// Whether any item was left out.
    pub has_skipped_items: bool,
}

impl FieldChange {
    /// Creates a field change.
    #[must_use]
    pub fn new(
        field_path: impl Into<String>,
        prev_value: Option<MappingNode>,
        new_value: Option<MappingNode>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            prev_value,
            new_value,
            must_recreate: false,
            sensitive: false,
        }
    }

    /// Returns the change with previous and new values swapped.
    ///
    /// `must_recreate` and `sensitive` are preserved.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            field_path: self.field_path.clone(),
            prev_value: self.new_value.clone(),
            new_value: self.prev_value.clone(),
            must_recreate: self.must_recreate,
            sensitive: self.sensitive,
        }
    }
}

impl ResourceInfo {
    /// Creates resource info for a named resource.
    #[must_use]
    pub fn named(resource_name: &str, resource_type: &str) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }

    /// Creates resource info from a persisted resource.
    #[must_use]
    pub fn from_state(state: &ResourceState) -> Self {
        Self {
            resource_id: state.resource_id.clone(),
            resource_name: state.name.clone(),
            resource_type: state.resource_type.clone(),
            instance_id: state.instance_id.clone(),
            current_state: Some(state.clone()),
            resolved: None,
        }
    }
}

impl Changes {
    /// Returns true if any field, recreation flag or outbound link changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.must_recreate
            || self.has_field_changes()
            || !self.new_outbound_links.is_empty()
            || !self.outbound_link_changes.is_empty()
            || !self.removed_outbound_links.is_empty()
    }

    /// Returns true if any field was added, modified or removed.
    #[must_use]
    pub fn has_field_changes(&self) -> bool {
        !self.new_fields.is_empty()
            || !self.modified_fields.is_empty()
            || !self.removed_fields.is_empty()
    }
}

impl LinkChanges {
    /// Returns true if any link field was added, modified or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_fields.is_empty()
            || !self.modified_fields.is_empty()
            || !self.removed_fields.is_empty()
    }
}

impl MetadataChanges {
    /// Returns true if any metadata field was added, modified or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_fields.is_empty()
            || !self.modified_fields.is_empty()
            || !self.removed_fields.is_empty()
    }
}

impl ChangeAction {
    /// Classifies the action for a resource.
    ///
    /// New wins over removed, removed over recreation, recreation over any
    /// other field or outbound link delta.
    #[must_use]
    pub fn classify(is_new: bool, is_removed: bool, changes: Option<&Changes>) -> Self {
        if is_new {
            return Self::Create;
        }
        if is_removed {
            return Self::Delete;
        }
        match changes {
            Some(changes) if changes.must_recreate => Self::Recreate,
            Some(changes) if changes.has_changes() => Self::Update,
            _ => Self::NoChange,
        }
    }
}

impl BlueprintChanges {
    /// Returns true if the changeset holds any real change.
    ///
    /// Export entries whose new value is only known at deploy time are not
    /// counted on their own: they report a change only when something else
    /// in the same subtree changed too.
    #[must_use]
    pub fn has_any_changes(&self) -> bool {
        !self.new_resources.is_empty()
            || !self.removed_resources.is_empty()
            || !self.removed_links.is_empty()
            || !self.new_children.is_empty()
            || !self.removed_children.is_empty()
            || !self.removed_exports.is_empty()
            || self.resource_changes.values().any(Changes::has_changes)
            || self.child_changes.values().any(Self::has_any_changes)
            || self.metadata_changes.has_changes()
            || self
                .new_exports
                .values()
                .chain(self.export_changes.values())
                .any(|change| !self.is_deferred_placeholder(change))
    }

    /// Returns true if a field change only stands in for a value that will
    /// be resolved at deploy time.
    #[must_use]
    pub fn is_deferred_placeholder(&self, change: &FieldChange) -> bool {
        change.new_value.is_none() && self.resolve_on_deploy.contains(&change.field_path)
    }

    /// Returns true if the changeset holds no entries at all, including
    /// deploy-time placeholders but ignoring unchanged listings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_any_changes()
            && self.new_exports.is_empty()
            && self.export_changes.is_empty()
            && self.resource_changes.is_empty()
            && self.child_changes.values().all(Self::is_empty)
    }

    /// Lists the action planned for every resource in the tree.
    #[must_use]
    pub fn resource_actions(&self) -> Vec<ResourceAction> {
        let mut actions = Vec::new();
        self.collect_actions("", &mut actions);
        actions
    }

    fn collect_actions(&self, child_path: &str, actions: &mut Vec<ResourceAction>) {
        let mut push = |name: &str, action: ChangeAction| {
            actions.push(ResourceAction {
                child_path: child_path.to_string(),
                name: name.to_string(),
                action,
            });
        };

        for name in self.new_resources.keys() {
            push(name, ChangeAction::Create);
        }
        for (name, changes) in &self.resource_changes {
            push(name, ChangeAction::classify(false, false, Some(changes)));
        }
        for name in &self.removed_resources {
            push(name, ChangeAction::Delete);
        }

        for (name, child) in &self.child_changes {
            let path = join_child_path(child_path, name);
            child.collect_actions(&path, actions);
        }
    }

    /// Counts planned actions across the tree.
    #[must_use]
    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for action in self.resource_actions() {
            match action.action {
                ChangeAction::Create => summary.create += 1,
                ChangeAction::Update => summary.update += 1,
                ChangeAction::Recreate => summary.recreate += 1,
                ChangeAction::Delete => summary.delete += 1,
                ChangeAction::NoChange => {}
            }
        }
        self.count_blueprint_entries(&mut summary);
        summary
    }

    fn count_blueprint_entries(&self, summary: &mut ChangeSummary) {
        summary.removed_links += self.removed_links.len();
        summary.new_children += self.new_children.len();
        summary.removed_children += self.removed_children.len();
        for child in self.child_changes.values() {
            child.count_blueprint_entries(summary);
        }
    }
}

impl ChangeSummary {
    /// Total number of resource actions.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.create + self.update + self.recreate + self.delete
    }
}

impl RemovalChangesResult {
    /// Wraps a teardown changeset and its skipped items.
    #[must_use]
    pub fn new(changes: Option<BlueprintChanges>, skipped_items: Vec<SkippedRollbackItem>) -> Self {
        let has_skipped_items = !skipped_items.is_empty();
        Self {
            changes,
            skipped_items,
            has_skipped_items,
        }
    }
}

impl RollbackFilterResult {
    /// Wraps a filtered changeset and its skipped items.
    #[must_use]
    pub fn new(changes: Option<BlueprintChanges>, skipped_items: Vec<SkippedRollbackItem>) -> Self {
        let has_skipped_items = !skipped_items.is_empty();
        Self {
            changes,
            skipped_items,
            has_skipped_items,
        }
    }

    /// Wraps a changeset that was passed through without filtering.
    #[must_use]
    pub fn unfiltered(changes: Option<BlueprintChanges>) -> Self {
        Self::new(changes, Vec::new())
    }
}

/// Appends a child name to a dotted child path.
#[must_use]
pub fn join_child_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Recreate => "recreate",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for SkippedItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource => write!(f, "resource"),
            Self::Link => write!(f, "link"),
        }
    }
}

impl std::fmt::Display for SkippedRollbackItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.child_path.is_empty() {
            write!(f, "{} '{}'", self.item_type, self.name)?;
        } else {
            write!(f, "{} '{}' in {}", self.item_type, self.name, self.child_path)?;
        }
        write!(f, " [{}]: {}", self.status, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed_resource() -> Changes {
        Changes {
            modified_fields: vec![FieldChange::new(
                "spec.memorySize",
                Some(MappingNode::from(128_i64)),
                Some(MappingNode::from(256_i64)),
            )],
            ..Changes::default()
        }
    }

    fn placeholder_only() -> BlueprintChanges {
        BlueprintChanges {
            export_changes: BTreeMap::from([(
                String::from("queueUrl"),
                FieldChange::new("exports.queueUrl", Some(MappingNode::from("https://q")), None),
            )]),
            resolve_on_deploy: vec![String::from("exports.queueUrl")],
            ..BlueprintChanges::default()
        }
    }

    #[test]
    fn test_has_changes_link_only() {
        let mut changes = Changes::default();
        assert!(!changes.has_changes());

        changes
            .new_outbound_links
            .insert(String::from("ordersTable"), LinkChanges::default());
        assert!(changes.has_changes());
        assert!(!changes.has_field_changes());
    }

    #[test]
    fn test_classify() {
        let mut recreate = changed_resource();
        recreate.must_recreate = true;

        assert_eq!(ChangeAction::classify(true, false, None), ChangeAction::Create);
        assert_eq!(ChangeAction::classify(false, true, None), ChangeAction::Delete);
        assert_eq!(
            ChangeAction::classify(false, false, Some(&recreate)),
            ChangeAction::Recreate
        );
        assert_eq!(
            ChangeAction::classify(false, false, Some(&changed_resource())),
            ChangeAction::Update
        );
        assert_eq!(
            ChangeAction::classify(false, false, Some(&Changes::default())),
            ChangeAction::NoChange
        );
    }

    #[test]
    fn test_placeholder_export_is_not_a_change() {
        let changes = placeholder_only();
        assert!(!changes.has_any_changes());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_placeholder_export_with_resource_change() {
        let mut changes = placeholder_only();
        changes
            .resource_changes
            .insert(String::from("ordersFunction"), changed_resource());
        assert!(changes.has_any_changes());
    }

    #[test]
    fn test_export_with_value_is_a_change() {
        let mut changes = BlueprintChanges::default();
        changes.new_exports.insert(
            String::from("tableName"),
            FieldChange::new("exports.tableName", None, Some(MappingNode::from("orders"))),
        );
        assert!(changes.has_any_changes());
    }

    #[test]
    fn test_nested_child_changes() {
        let mut child = BlueprintChanges::default();
        child
            .resource_changes
            .insert(String::from("queue"), changed_resource());
        let mut root = BlueprintChanges::default();
        root.child_changes.insert(String::from("coreInfra"), child);

        assert!(root.has_any_changes());
        let actions = root.resource_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].child_path, "coreInfra");
        assert_eq!(actions[0].action, ChangeAction::Update);
    }

    #[test]
    fn test_summary() {
        let mut root = BlueprintChanges::default();
        root.new_resources
            .insert(String::from("a"), Changes::default());
        root.removed_resources.push(String::from("b"));
        root.removed_links.push(String::from("b::c"));
        root.resource_changes
            .insert(String::from("c"), changed_resource());

        let summary = root.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.update, 1);
        assert_eq!(summary.removed_links, 1);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_field_change_reversed() {
        let mut change = FieldChange::new(
            "spec.name",
            Some(MappingNode::from("a")),
            Some(MappingNode::from("b")),
        );
        change.must_recreate = true;
        change.sensitive = true;

        let reversed = change.reversed();
        assert_eq!(reversed.prev_value, Some(MappingNode::from("b")));
        assert_eq!(reversed.new_value, Some(MappingNode::from("a")));
        assert!(reversed.must_recreate);
        assert!(reversed.sensitive);
        assert_eq!(reversed.reversed(), change);
    }

    #[test]
    fn test_skipped_item_display() {
        let item = SkippedRollbackItem {
            name: String::from("queue"),
            item_type: SkippedItemType::Resource,
            child_path: String::from("coreInfra"),
            status: String::from("UPDATE FAILED"),
            reason: String::from(REASON_RESOURCE_UPDATE_INCOMPLETE),
        };
        assert_eq!(
            item.to_string(),
            "resource 'queue' in coreInfra [UPDATE FAILED]: resource update was not completed successfully"
        );
    }
}
