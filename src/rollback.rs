//! Rollback and teardown planning.
//!
//! This module ties change computation to the state store: it loads the
//! state a failed deployment left behind, reverses the changeset that was
//! being applied, filters out operations that are unsafe against that
//! state, and stamps the result with a digest so a replayed rollback can be
//! checked against the original plan.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changes::{
    BlueprintChanges, ChangesetHasher, RemovalChangesBuilder, ReverseChangesetGenerator,
    RollbackFilter, SkippedRollbackItem,
};
use crate::error::{Result, StateError};
use crate::state::{InstanceState, StateStore};

/// Kind of plan produced by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    /// Undo of a previously applied changeset.
    Rollback,
    /// Removal of everything in an instance.
    Teardown,
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rollback => write!(f, "Rollback"),
            Self::Teardown => write!(f, "Teardown"),
        }
    }
}

/// A rollback or teardown plan ready to be handed to a deployer.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackPlan {
    /// Plan kind.
    pub kind: PlanKind,
    /// Instance the plan applies to.
    pub instance_id: String,
    /// When the plan was computed.
    pub created_at: DateTime<Utc>,
    /// Digest of the planned changeset, if there is one.
    pub digest: Option<String>,
    /// Changeset to apply. `None` when there is nothing to do.
    pub changes: Option<BlueprintChanges>,
    /// Operations left out because they are unsafe to apply.
    pub skipped_items: Vec<SkippedRollbackItem>,
}

impl RollbackPlan {
    /// Returns true if some operations were left out of the plan.
    #[must_use]
    pub fn has_skipped_items(&self) -> bool {
        !self.skipped_items.is_empty()
    }

    /// Returns true if the plan contains no operations.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.as_ref().is_none_or(BlueprintChanges::is_empty)
    }

    /// Returns true if this plan's changeset has the given digest.
    #[must_use]
    pub fn matches_digest(&self, digest: &str) -> bool {
        self.digest
            .as_deref()
            .is_some_and(|own| ChangesetHasher::hashes_match(own, digest))
    }
}

/// Planner for rollbacks and teardowns of persisted instances.
pub struct RollbackPlanner<'a, S: StateStore> {
    /// State store.
    state_store: &'a S,
    /// Changeset reverser.
    reverser: ReverseChangesetGenerator,
    /// Rollback safety filter.
    filter: RollbackFilter,
    /// Teardown builder.
    removal: RemovalChangesBuilder,
    /// Changeset digests.
    hasher: ChangesetHasher,
}

impl<'a, S: StateStore> RollbackPlanner<'a, S> {
    /// Creates a new planner with default depth bounds.
    #[must_use]
    pub fn new(state_store: &'a S) -> Self {
        Self {
            state_store,
            reverser: ReverseChangesetGenerator::default(),
            filter: RollbackFilter::default(),
            removal: RemovalChangesBuilder::default(),
            hasher: ChangesetHasher::new(),
        }
    }

    /// Sets the child nesting depth followed when reversing, filtering and
    /// tearing down.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.reverser = ReverseChangesetGenerator::new(max_depth);
        self.filter = RollbackFilter::new(max_depth);
        self.removal = RemovalChangesBuilder::new(max_depth);
        self
    }

    /// Plans the rollback of `applied`, a changeset that was being applied
    /// to `previous` when the deployment of `instance_id` failed.
    ///
    /// The current state is loaded from the store. If no current state is
    /// stored, the reverse changeset is returned unfiltered.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded, if the reversal
    /// exceeds the depth bound, or if the plan cannot be digested.
    pub async fn plan_rollback(
        &self,
        instance_id: &str,
        applied: &BlueprintChanges,
        previous: &InstanceState,
    ) -> Result<RollbackPlan> {
        info!("Planning rollback for instance {}", instance_id);

        let current = self.state_store.load_instance(instance_id).await?;
        if current.is_none() {
            warn!(
                "No current state stored for {}, rollback will not be filtered",
                instance_id
            );
        }

        let reversed = self.reverser.reverse(Some(applied), Some(previous))?;
        let filtered = self.filter.filter(reversed.as_ref(), current.as_ref());

        self.finish(
            PlanKind::Rollback,
            instance_id,
            filtered.changes,
            filtered.skipped_items,
        )
    }

    /// Plans a rollback using a changeset stored under `changeset_id` and
    /// the previous instance state stored under `previous_instance_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if either stored input is missing, or for any of
    /// the reasons [`Self::plan_rollback`] fails.
    pub async fn plan_rollback_from_store(
        &self,
        instance_id: &str,
        changeset_id: &str,
        previous_instance_id: &str,
    ) -> Result<RollbackPlan> {
        let applied = self
            .state_store
            .load_changes(changeset_id)
            .await?
            .ok_or_else(|| StateError::ChangesetNotFound {
                changeset_id: changeset_id.to_string(),
            })?;

        let previous = self
            .state_store
            .load_instance(previous_instance_id)
            .await?
            .ok_or_else(|| StateError::InstanceNotFound {
                instance_id: previous_instance_id.to_string(),
            })?;

        self.plan_rollback(instance_id, &applied, &previous).await
    }

    /// Plans the removal of everything in the stored instance that is safe
    /// to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance state is missing or cannot be
    /// loaded.
    pub async fn plan_teardown(&self, instance_id: &str) -> Result<RollbackPlan> {
        info!("Planning teardown for instance {}", instance_id);

        let state = self
            .state_store
            .load_instance(instance_id)
            .await?
            .ok_or_else(|| StateError::InstanceNotFound {
                instance_id: instance_id.to_string(),
            })?;

        let removal = self.removal.build(Some(&state));

        self.finish(
            PlanKind::Teardown,
            instance_id,
            removal.changes,
            removal.skipped_items,
        )
    }

    fn finish(
        &self,
        kind: PlanKind,
        instance_id: &str,
        changes: Option<BlueprintChanges>,
        skipped_items: Vec<SkippedRollbackItem>,
    ) -> Result<RollbackPlan> {
        let digest = changes
            .as_ref()
            .map(|changes| self.hasher.hash_changes(changes))
            .transpose()?;

        if let Some(digest) = &digest {
            debug!("{} plan digest: {}", kind, self.hasher.short_hash(digest));
        }

        Ok(RollbackPlan {
            kind,
            instance_id: instance_id.to_string(),
            created_at: Utc::now(),
            digest,
            changes,
            skipped_items,
        })
    }
}

impl std::fmt::Display for RollbackPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} plan for {}:", self.kind, self.instance_id)?;

        match &self.changes {
            Some(changes) => {
                let summary = changes.summary();
                writeln!(f, "  Create: {}", summary.create)?;
                writeln!(f, "  Update: {}", summary.update)?;
                writeln!(f, "  Recreate: {}", summary.recreate)?;
                writeln!(f, "  Delete: {}", summary.delete)?;
                writeln!(f, "  Removed links: {}", summary.removed_links)?;
            }
            None => writeln!(f, "  Nothing to do")?,
        }

        if self.has_skipped_items() {
            writeln!(f, "  Skipped:")?;
            for item in &self.skipped_items {
                writeln!(f, "    - {item}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{Changes, FieldChange, ResourceInfo};
    use crate::core::MappingNode;
    use crate::state::{MockStateStore, ResourceState, ResourceStatus};

    fn previous_state() -> InstanceState {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(
            ResourceState::new("res-1", "q", "aws/sqs/queue", ResourceStatus::Created)
                .with_spec(MappingNode::fields([("timeout", MappingNode::from(30_i64))])),
        );
        state
    }

    fn applied_changes() -> BlueprintChanges {
        let mut changes = BlueprintChanges::default();
        let mut resource = Changes {
            applied_resource_info: ResourceInfo::named("q", "aws/sqs/queue"),
            ..Changes::default()
        };
        resource.modified_fields.push(FieldChange::new(
            "spec.timeout",
            Some(MappingNode::from(30_i64)),
            Some(MappingNode::from(60_i64)),
        ));
        changes.resource_changes.insert(String::from("q"), resource);
        changes
    }

    fn current_state(status: ResourceStatus) -> InstanceState {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(ResourceState::new("res-1", "q", "aws/sqs/queue", status));
        state
    }

    #[tokio::test]
    async fn test_plan_rollback_safe() {
        let mut store = MockStateStore::new();
        store
            .expect_load_instance()
            .withf(|id| id == "inst-1")
            .returning(|_| Ok(Some(current_state(ResourceStatus::Updated))));

        let planner = RollbackPlanner::new(&store);
        let plan = planner
            .plan_rollback("inst-1", &applied_changes(), &previous_state())
            .await
            .expect("plan");

        assert_eq!(plan.kind, PlanKind::Rollback);
        assert!(!plan.has_skipped_items());
        let changes = plan.changes.as_ref().expect("changes");
        let change = &changes.resource_changes["q"].modified_fields[0];
        assert_eq!(change.new_value, Some(MappingNode::from(30_i64)));
        assert_eq!(plan.digest.as_ref().map(String::len), Some(64));
    }

    #[tokio::test]
    async fn test_plan_rollback_skips_failed_update() {
        let mut store = MockStateStore::new();
        store
            .expect_load_instance()
            .returning(|_| Ok(Some(current_state(ResourceStatus::UpdateFailed))));

        let planner = RollbackPlanner::new(&store);
        let plan = planner
            .plan_rollback("inst-1", &applied_changes(), &previous_state())
            .await
            .expect("plan");

        assert!(plan.has_skipped_items());
        assert_eq!(plan.skipped_items[0].name, "q");
        assert!(plan.is_noop());
    }

    #[tokio::test]
    async fn test_plan_rollback_deterministic_digest() {
        let mut store = MockStateStore::new();
        store
            .expect_load_instance()
            .returning(|_| Ok(Some(current_state(ResourceStatus::Updated))));

        let planner = RollbackPlanner::new(&store);
        let first = planner
            .plan_rollback("inst-1", &applied_changes(), &previous_state())
            .await
            .expect("plan");
        let second = planner
            .plan_rollback("inst-1", &applied_changes(), &previous_state())
            .await
            .expect("plan");

        let digest = second.digest.as_deref().expect("digest");
        assert!(first.matches_digest(digest));
    }

    #[tokio::test]
    async fn test_plan_rollback_from_store_missing_changeset() {
        let mut store = MockStateStore::new();
        store.expect_load_changes().returning(|_| Ok(None));

        let planner = RollbackPlanner::new(&store);
        let result = planner
            .plan_rollback_from_store("inst-1", "missing", "inst-0")
            .await;

        assert!(matches!(
            result,
            Err(crate::error::ChangesError::State(
                StateError::ChangesetNotFound { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_plan_teardown() {
        let mut store = MockStateStore::new();
        store.expect_load_instance().returning(|_| {
            let mut state = current_state(ResourceStatus::Created);
            state.set_resource(ResourceState::new(
                "res-2",
                "broken",
                "aws/sqs/queue",
                ResourceStatus::CreateFailed,
            ));
            Ok(Some(state))
        });

        let planner = RollbackPlanner::new(&store);
        let plan = planner.plan_teardown("inst-1").await.expect("plan");

        assert_eq!(plan.kind, PlanKind::Teardown);
        let changes = plan.changes.as_ref().expect("changes");
        assert_eq!(changes.removed_resources, vec!["q"]);
        assert_eq!(plan.skipped_items.len(), 1);
        assert_eq!(plan.skipped_items[0].name, "broken");
    }

    #[tokio::test]
    async fn test_plan_teardown_missing_instance() {
        let mut store = MockStateStore::new();
        store.expect_load_instance().returning(|_| Ok(None));

        let planner = RollbackPlanner::new(&store);
        assert!(planner.plan_teardown("nope").await.is_err());
    }
}
