//! Reverse changeset generation.
//!
//! Reversing a changeset produces the changeset that undoes it: field
//! changes swap their previous and new values, and every "new" entry
//! becomes a "removed" entry and vice versa. Entities that the original
//! removed can only be brought back from the previous instance state;
//! entries with no previous state are dropped.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::core::{MappingNode, field_path, link_name, split_link_name};
use crate::error::ReverseError;
use crate::state::{InstanceState, LinkState, ResourceState};

use super::types::{
    BlueprintChanges, Changes, FieldChange, LinkChanges, MetadataChanges, NewBlueprintDefinition,
    ResourceInfo, join_child_path,
};

/// Maximum nesting of child changes a reversal will follow.
pub const MAX_REVERSE_DEPTH: usize = 5;

/// Reverses a changeset against the instance state it was applied to,
/// using the default depth bound.
///
/// Returns `Ok(None)` when either input is missing.
///
/// # Errors
///
/// Returns [`ReverseError::MaxDepthExceeded`] if child changes are nested
/// deeper than [`MAX_REVERSE_DEPTH`].
pub fn reverse_changeset(
    original: Option<&BlueprintChanges>,
    previous: Option<&InstanceState>,
) -> Result<Option<BlueprintChanges>, ReverseError> {
    ReverseChangesetGenerator::default().reverse(original, previous)
}

/// Depth-bounded changeset reverser.
#[derive(Debug, Clone, Copy)]
pub struct ReverseChangesetGenerator {
    max_depth: usize,
}

impl Default for ReverseChangesetGenerator {
    fn default() -> Self {
        Self::new(MAX_REVERSE_DEPTH)
    }
}

impl ReverseChangesetGenerator {
    /// Creates a reverser that follows at most `max_depth` levels of child
    /// changes.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Reverses `original` against `previous`, the state before `original`
    /// was applied.
    ///
    /// Returns `Ok(None)` when either input is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ReverseError::MaxDepthExceeded`] if child changes or
    /// previously deployed children are nested beyond the depth bound. The
    /// whole reversal fails; no partial result is returned.
    pub fn reverse(
        &self,
        original: Option<&BlueprintChanges>,
        previous: Option<&InstanceState>,
    ) -> Result<Option<BlueprintChanges>, ReverseError> {
        let (Some(original), Some(previous)) = (original, previous) else {
            debug!("Nothing to reverse");
            return Ok(None);
        };

        let reversed = self.reverse_level(original, previous, "", 0)?;
        info!(
            "Reversed changeset: {} to recreate, {} to revert, {} to remove",
            reversed.new_resources.len(),
            reversed.resource_changes.len(),
            reversed.removed_resources.len()
        );
        Ok(Some(reversed))
    }

    fn check_depth(&self, path: &str, depth: usize) -> Result<(), ReverseError> {
        if depth > self.max_depth {
            return Err(ReverseError::MaxDepthExceeded {
                max_depth: self.max_depth,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn reverse_level(
        &self,
        original: &BlueprintChanges,
        previous: &InstanceState,
        path: &str,
        depth: usize,
    ) -> Result<BlueprintChanges, ReverseError> {
        let mut reversed = BlueprintChanges::default();

        for (name, changes) in &original.new_resources {
            reversed.removed_resources.push(name.clone());
            for target in changes.new_outbound_links.keys() {
                reversed.removed_links.push(link_name(name, target));
            }
        }

        for name in &original.removed_resources {
            match previous.resource_by_name(name) {
                Some(state) => {
                    reversed
                        .new_resources
                        .insert(name.clone(), recreate_resource(state));
                }
                None => debug!("Dropping removed resource {name}: no previous state"),
            }
        }

        for (name, changes) in &original.resource_changes {
            reversed.resource_changes.insert(
                name.clone(),
                reverse_resource_changes(name, changes, previous),
            );
        }

        for name in &original.removed_links {
            restore_link(name, previous, &mut reversed);
        }

        reversed.removed_children = original.new_children.keys().cloned().collect();

        for name in &original.removed_children {
            let child_path = join_child_path(path, name);
            match previous.child(name) {
                Some(child) => {
                    let definition = self.definition_from_state(child, &child_path, depth + 1)?;
                    reversed.new_children.insert(name.clone(), definition);
                }
                None => debug!("Dropping removed child {child_path}: no previous state"),
            }
        }

        let empty = InstanceState::default();
        for (name, child_changes) in &original.child_changes {
            let child_path = join_child_path(path, name);
            self.check_depth(&child_path, depth + 1)?;
            let previous_child = previous.child(name).unwrap_or(&empty);
            let child = self.reverse_level(child_changes, previous_child, &child_path, depth + 1)?;
            reversed.child_changes.insert(name.clone(), child);
        }

        reversed.removed_exports = original.new_exports.keys().cloned().collect();
        for name in &original.removed_exports {
            if let Some(export) = previous.exports.get(name) {
                reversed.new_exports.insert(
                    name.clone(),
                    FieldChange::new(field_path("exports", name), None, export.value.clone()),
                );
            }
        }
        reversed.export_changes = original
            .export_changes
            .iter()
            .map(|(name, change)| (name.clone(), change.reversed()))
            .collect();
        reversed.unchanged_exports.clone_from(&original.unchanged_exports);

        reversed.metadata_changes = reverse_metadata(&original.metadata_changes);

        Ok(reversed)
    }

    /// Builds the definition that recreates a previously deployed child.
    fn definition_from_state(
        &self,
        state: &InstanceState,
        path: &str,
        depth: usize,
    ) -> Result<NewBlueprintDefinition, ReverseError> {
        self.check_depth(path, depth)?;

        let mut definition = NewBlueprintDefinition::default();

        for (name, resource) in state.resources_by_name() {
            let mut changes = recreate_resource(resource);
            for (link, link_state) in &state.links {
                if let Some((source, target)) = split_link_name(link) {
                    if source == name {
                        changes
                            .new_outbound_links
                            .insert(target.to_string(), link_from_state(link_state));
                    }
                }
            }
            definition.new_resources.insert(name.to_string(), changes);
        }

        for (name, child) in &state.child_blueprints {
            let child_path = join_child_path(path, name);
            let child_definition = self.definition_from_state(child, &child_path, depth + 1)?;
            definition.new_children.insert(name.clone(), child_definition);
        }

        for (name, export) in &state.exports {
            definition.new_exports.insert(
                name.clone(),
                FieldChange::new(field_path("exports", name), None, export.value.clone()),
            );
        }

        Ok(definition)
    }
}

/// Lists a tree's top-level fields as new fields below `root`.
fn new_fields_from(root: &str, value: Option<&MappingNode>) -> Vec<FieldChange> {
    match value {
        Some(MappingNode::Fields(fields)) => fields
            .iter()
            .map(|(key, value)| FieldChange::new(field_path(root, key), None, Some(value.clone())))
            .collect(),
        Some(other) => vec![FieldChange::new(root, None, Some(other.clone()))],
        None => Vec::new(),
    }
}

/// Changes that recreate a resource from its persisted state.
fn recreate_resource(state: &ResourceState) -> Changes {
    let mut new_fields = new_fields_from("spec", state.spec_data.as_ref());
    new_fields.extend(new_fields_from("metadata", state.metadata.as_ref()));

    Changes {
        applied_resource_info: ResourceInfo::from_state(state),
        new_fields,
        computed_fields: state.computed_fields.clone(),
        ..Changes::default()
    }
}

/// Link changes that recreate a link from its persisted state.
fn link_from_state(state: &LinkState) -> LinkChanges {
    LinkChanges {
        new_fields: new_fields_from("", state.data.as_ref()),
        ..LinkChanges::default()
    }
}

fn reverse_resource_changes(name: &str, changes: &Changes, previous: &InstanceState) -> Changes {
    let applied_resource_info = previous
        .resource_by_name(name)
        .map_or_else(|| changes.applied_resource_info.clone(), ResourceInfo::from_state);

    let new_outbound_links: BTreeMap<String, LinkChanges> = changes
        .removed_outbound_links
        .iter()
        .filter_map(|target| {
            previous
                .link(&link_name(name, target))
                .map(|link| (target.clone(), link_from_state(link)))
        })
        .collect();

    Changes {
        applied_resource_info,
        must_recreate: changes.must_recreate,
        modified_fields: changes.modified_fields.iter().map(FieldChange::reversed).collect(),
        new_fields: restored_fields(&changes.removed_fields),
        removed_fields: field_paths(&changes.new_fields),
        unchanged_fields: changes.unchanged_fields.clone(),
        computed_fields: changes.computed_fields.clone(),
        field_changes_known_on_deploy: Vec::new(),
        new_outbound_links,
        outbound_link_changes: changes
            .outbound_link_changes
            .iter()
            .map(|(target, link)| (target.clone(), reverse_link_changes(link)))
            .collect(),
        removed_outbound_links: changes.new_outbound_links.keys().cloned().collect(),
    }
}

fn reverse_link_changes(changes: &LinkChanges) -> LinkChanges {
    LinkChanges {
        modified_fields: changes.modified_fields.iter().map(FieldChange::reversed).collect(),
        new_fields: restored_fields(&changes.removed_fields),
        removed_fields: field_paths(&changes.new_fields),
        unchanged_fields: changes.unchanged_fields.clone(),
        field_changes_known_on_deploy: Vec::new(),
    }
}

fn reverse_metadata(changes: &MetadataChanges) -> MetadataChanges {
    MetadataChanges {
        new_fields: restored_fields(&changes.removed_fields),
        modified_fields: changes.modified_fields.iter().map(FieldChange::reversed).collect(),
        removed_fields: field_paths(&changes.new_fields),
        unchanged_fields: changes.unchanged_fields.clone(),
    }
}

/// Removed fields come back without a value; it is read from state when the
/// reverse changeset is applied.
fn restored_fields(removed: &[String]) -> Vec<FieldChange> {
    removed
        .iter()
        .map(|path| FieldChange::new(path.clone(), None, None))
        .collect()
}

fn field_paths(changes: &[FieldChange]) -> Vec<String> {
    changes.iter().map(|c| c.field_path.clone()).collect()
}

/// Re-adds a link removed by the original changeset as a new outbound link
/// of its source resource.
fn restore_link(name: &str, previous: &InstanceState, reversed: &mut BlueprintChanges) {
    let (Some((source, target)), Some(link)) = (split_link_name(name), previous.link(name)) else {
        debug!("Dropping removed link {name}: no previous state");
        return;
    };
    let link_changes = link_from_state(link);

    if let Some(changes) = reversed.new_resources.get_mut(source) {
        changes
            .new_outbound_links
            .insert(target.to_string(), link_changes);
    } else if let Some(changes) = reversed.resource_changes.get_mut(source) {
        changes
            .new_outbound_links
            .insert(target.to_string(), link_changes);
    } else if let Some(state) = previous.resource_by_name(source) {
        let mut changes = Changes {
            applied_resource_info: ResourceInfo::from_state(state),
            ..Changes::default()
        };
        changes
            .new_outbound_links
            .insert(target.to_string(), link_changes);
        reversed.resource_changes.insert(source.to_string(), changes);
    } else {
        debug!("Dropping removed link {name}: source resource {source} has no previous state");
    }
}
