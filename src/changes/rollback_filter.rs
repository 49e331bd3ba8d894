//! Rollback safety filtering.
//!
//! A reverse changeset is computed against the state *before* a deployment,
//! but it will be applied to the state *after* a deployment that may have
//! only partially succeeded. This module drops the reverse operations whose
//! target entity never reached the status the operation assumes, and
//! reports each dropped operation as a [`SkippedRollbackItem`].

use tracing::{debug, info, warn};

use crate::state::InstanceState;

use super::reverse::MAX_REVERSE_DEPTH;
use super::types::{
    BlueprintChanges, REASON_LINK_CREATE_INCOMPLETE, REASON_RESOURCE_CREATE_INCOMPLETE,
    REASON_RESOURCE_DESTROY_INCOMPLETE, REASON_RESOURCE_UPDATE_INCOMPLETE, RollbackFilterResult,
    SkippedItemType, SkippedRollbackItem, join_child_path,
};

/// Filters a reverse changeset by the current instance state, using the
/// default depth bound.
///
/// Entities missing from the current state are kept. Exports and metadata
/// are never filtered.
#[must_use]
pub fn filter_reverse_changeset_by_current_state(
    reverse: Option<&BlueprintChanges>,
    current: Option<&InstanceState>,
) -> RollbackFilterResult {
    RollbackFilter::default().filter(reverse, current)
}

/// Depth-bounded rollback safety filter.
#[derive(Debug, Clone, Copy)]
pub struct RollbackFilter {
    max_depth: usize,
}

impl Default for RollbackFilter {
    fn default() -> Self {
        Self::new(MAX_REVERSE_DEPTH)
    }
}

impl RollbackFilter {
    /// Creates a filter that follows at most `max_depth` levels of child
    /// changes; deeper children pass through unfiltered.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Filters `reverse` by `current`.
    ///
    /// When either input is missing the changeset is returned as given with
    /// no skipped items.
    #[must_use]
    pub fn filter(
        &self,
        reverse: Option<&BlueprintChanges>,
        current: Option<&InstanceState>,
    ) -> RollbackFilterResult {
        let (Some(reverse), Some(current)) = (reverse, current) else {
            debug!("Rollback filter skipped: missing changeset or state");
            return RollbackFilterResult::unfiltered(reverse.cloned());
        };

        let mut skipped = Vec::new();
        let filtered = self.filter_level(reverse, current, "", 0, &mut skipped);

        if skipped.is_empty() {
            info!("All rollback operations are safe to apply");
        } else {
            warn!(
                "Skipping {} rollback operation(s) that are not safe to apply",
                skipped.len()
            );
        }

        RollbackFilterResult::new(Some(filtered), skipped)
    }

    fn filter_level(
        &self,
        reverse: &BlueprintChanges,
        current: &InstanceState,
        child_path: &str,
        depth: usize,
        skipped: &mut Vec<SkippedRollbackItem>,
    ) -> BlueprintChanges {
        let mut filtered = reverse.clone();
        let mut skip = |name: &str, item_type: SkippedItemType, status: String, reason: &str| {
            debug!("Skipping rollback of {item_type} {name} ({status})");
            skipped.push(SkippedRollbackItem {
                name: name.to_string(),
                item_type,
                child_path: child_path.to_string(),
                status,
                reason: reason.to_string(),
            });
        };

        filtered.resource_changes.retain(|name, _| {
            match current.resource_by_name(name) {
                Some(resource) if !resource.update_complete() => {
                    skip(
                        name.as_str(),
                        SkippedItemType::Resource,
                        resource.status.to_string(),
                        REASON_RESOURCE_UPDATE_INCOMPLETE,
                    );
                    false
                }
                _ => true,
            }
        });

        filtered.new_resources.retain(|name, _| {
            match current.resource_by_name(name) {
                Some(resource) if !resource.destruction_complete() => {
                    skip(
                        name.as_str(),
                        SkippedItemType::Resource,
                        resource.status.to_string(),
                        REASON_RESOURCE_DESTROY_INCOMPLETE,
                    );
                    false
                }
                _ => true,
            }
        });

        filtered.removed_resources.retain(|name| {
            match current.resource_by_name(name) {
                Some(resource) if !resource.creation_complete() => {
                    skip(
                        name.as_str(),
                        SkippedItemType::Resource,
                        resource.status.to_string(),
                        REASON_RESOURCE_CREATE_INCOMPLETE,
                    );
                    false
                }
                _ => true,
            }
        });

        filtered.removed_links.retain(|name| match current.link(name) {
            Some(link) if !link.creation_complete() => {
                skip(
                    name.as_str(),
                    SkippedItemType::Link,
                    link.status.to_string(),
                    REASON_LINK_CREATE_INCOMPLETE,
                );
                false
            }
            _ => true,
        });

        if depth + 1 > self.max_depth {
            if !filtered.child_changes.is_empty() {
                debug!("Child changes below {child_path:?} pass through unfiltered");
            }
            return filtered;
        }

        for (name, child) in &mut filtered.child_changes {
            if let Some(current_child) = current.child(name) {
                let path = join_child_path(child_path, name);
                *child = self.filter_level(child, current_child, &path, depth + 1, skipped);
            }
        }

        filtered
    }
}
