//! Changeset computation.
//!
//! This module turns resolved blueprints and persisted instance state into
//! changesets, and changesets back into rollback and teardown plans:
//!
//! - field-level diffing of specs, metadata and link data
//! - per-resource change generation and whole-blueprint staging
//! - reversing an applied changeset
//! - filtering a reverse changeset against the state a failed deployment
//!   left behind
//! - building a teardown changeset from instance state alone

mod digest;
mod field_diff;
mod link;
mod removal;
mod resource;
mod reverse;
mod rollback_filter;
mod stager;
mod types;

pub use digest::ChangesetHasher;
pub use field_diff::{DEFAULT_MAX_DIFF_DEPTH, FieldDiff, FieldDiffer};
pub use link::{LinkChangeGenerator, OutboundLinkChanges};
pub use removal::{RemovalChangesBuilder, create_removal_changes_from_instance_state};
pub use resource::{LinkContext, ResourceChangeGenerator};
pub use reverse::{MAX_REVERSE_DEPTH, ReverseChangesetGenerator, reverse_changeset};
pub use rollback_filter::{RollbackFilter, filter_reverse_changeset_by_current_state};
pub use stager::{ChangeStager, DEFAULT_MAX_BLUEPRINT_DEPTH, ResourceFailure, StagingResult};
pub use types::{
    BlueprintChanges, ChangeAction, ChangeSummary, Changes, FieldChange, LinkChanges,
    MetadataChanges, NewBlueprintDefinition, REASON_LINK_CREATE_INCOMPLETE,
    REASON_RESOURCE_CREATE_INCOMPLETE, REASON_RESOURCE_DESTROY_INCOMPLETE,
    REASON_RESOURCE_UPDATE_INCOMPLETE, RemovalChangesResult, ResourceAction, ResourceInfo,
    RollbackFilterResult, SkippedItemType, SkippedRollbackItem, join_child_path,
};
