//! Changeset staging.
//!
//! The [`ChangeStager`] composes per-resource changes, link removals, child
//! blueprint changes, export changes and metadata changes into one
//! [`BlueprintChanges`] tree mirroring the blueprint's child structure.

use tracing::{debug, info, warn};

use crate::core::{MappingNode, ResolvedBlueprint, ResolvedResource, field_path, split_link_name};
use crate::error::{DiffError, StageError};
use crate::schema::{ResourceSchema, SchemaRegistry};
use crate::state::InstanceState;

use super::field_diff::FieldDiffer;
use super::resource::{LinkContext, ResourceChangeGenerator};
use super::types::{
    BlueprintChanges, Changes, FieldChange, MetadataChanges, NewBlueprintDefinition, ResourceInfo,
    join_child_path,
};

/// Default bound on child blueprint nesting.
pub const DEFAULT_MAX_BLUEPRINT_DEPTH: usize = 5;

/// A resource whose changes could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFailure {
    /// Dotted path of the containing child blueprint, empty at the root.
    pub child_path: String,
    /// Resource name.
    pub resource_name: String,
    /// Why the diff failed.
    pub error: DiffError,
}

/// Outcome of staging: the changeset plus any per-resource failures.
///
/// Failed resources are left out of the changeset.
#[derive(Debug, Clone, Default)]
pub struct StagingResult {
    /// The staged changeset.
    pub changes: BlueprintChanges,
    /// Resources whose changes could not be computed.
    pub failures: Vec<ResourceFailure>,
}

impl StagingResult {
    /// Returns true if every resource was diffed successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the changeset, or an error if any resource failed.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::ResourceChangesFailed`] if any resource could
    /// not be diffed.
    pub fn into_changes(self) -> Result<BlueprintChanges, StageError> {
        match self.failures.first() {
            None => Ok(self.changes),
            Some(first) => Err(StageError::ResourceChangesFailed {
                count: self.failures.len(),
                first: format!(
                    "{}: {}",
                    join_child_path(&first.child_path, &first.resource_name),
                    first.error
                ),
            }),
        }
    }
}

/// Builds changesets from a resolved blueprint and the current state.
pub struct ChangeStager<'r, R: SchemaRegistry + ?Sized> {
    registry: &'r R,
    generator: ResourceChangeGenerator,
    differ: FieldDiffer,
    max_depth: usize,
}

impl<R: SchemaRegistry + ?Sized> std::fmt::Debug for ChangeStager<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStager")
            .field("differ", &self.differ)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl<'r, R: SchemaRegistry + ?Sized> ChangeStager<'r, R> {
    /// Creates a stager with default depth bounds.
    #[must_use]
    pub fn new(registry: &'r R) -> Self {
        Self::with_limits(registry, FieldDiffer::default(), DEFAULT_MAX_BLUEPRINT_DEPTH)
    }

    /// Creates a stager with a custom field differ and child depth bound.
    #[must_use]
    pub const fn with_limits(registry: &'r R, differ: FieldDiffer, max_depth: usize) -> Self {
        Self {
            registry,
            generator: ResourceChangeGenerator::new(differ),
            differ,
            max_depth,
        }
    }

    /// Stages the changes needed to move `current` to `blueprint`.
    ///
    /// `current` is `None` for a first deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if child blueprints are nested beyond the depth
    /// bound. Per-resource diff failures are reported in the result.
    pub fn stage(
        &self,
        blueprint: &ResolvedBlueprint,
        current: Option<&InstanceState>,
    ) -> Result<StagingResult, StageError> {
        info!(
            "Staging changes for {} resource(s), {} child blueprint(s)",
            blueprint.resources.len(),
            blueprint.children.len()
        );

        let mut failures = Vec::new();
        let changes = self.stage_level(blueprint, current, "", 0, &mut failures)?;

        if failures.is_empty() {
            let summary = changes.summary();
            info!(
                "Staged: {} to create, {} to update, {} to recreate, {} to remove",
                summary.create, summary.update, summary.recreate, summary.delete
            );
        } else {
            warn!("{} resource(s) could not be diffed", failures.len());
        }

        Ok(StagingResult { changes, failures })
    }

    fn schema_for(&self, resource: &ResolvedResource) -> Result<&'r ResourceSchema, DiffError> {
        self.registry
            .resource_schema(&resource.resource_type)
            .ok_or_else(|| DiffError::UnknownResourceType {
                resource_type: resource.resource_type.clone(),
            })
    }

    fn resource_changes(
        &self,
        blueprint: &ResolvedBlueprint,
        current: Option<&InstanceState>,
        name: &str,
        resource: &ResolvedResource,
    ) -> Result<Changes, DiffError> {
        let schema = self.schema_for(resource)?;
        let current_state = current.and_then(|c| c.resource_by_name(name));

        let info = ResourceInfo {
            resource_id: current_state
                .map(|s| s.resource_id.clone())
                .unwrap_or_default(),
            resource_name: name.to_string(),
            resource_type: resource.resource_type.clone(),
            instance_id: current.map(|c| c.instance_id.clone()).unwrap_or_default(),
            current_state: current_state.cloned(),
            resolved: Some(resource.clone()),
        };
        let links = LinkContext::from_state(name, current, blueprint.outbound_links(name));

        self.generator.generate_changes(
            &info,
            Some(schema),
            &blueprint.resource_resolve_on_deploy(name),
            &links,
        )
    }

    fn check_depth(&self, path: &str, depth: usize) -> Result<(), StageError> {
        if depth > self.max_depth {
            return Err(StageError::MaxDepthExceeded {
                max_depth: self.max_depth,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn stage_level(
        &self,
        blueprint: &ResolvedBlueprint,
        current: Option<&InstanceState>,
        child_path: &str,
        depth: usize,
        failures: &mut Vec<ResourceFailure>,
    ) -> Result<BlueprintChanges, StageError> {
        let mut changes = BlueprintChanges {
            resolve_on_deploy: blueprint.resolve_on_deploy.clone(),
            ..BlueprintChanges::default()
        };

        for (name, resource) in &blueprint.resources {
            let exists = current.and_then(|c| c.resource_by_name(name)).is_some();
            match self.resource_changes(blueprint, current, name, resource) {
                Ok(resource_changes) if !exists => {
                    changes.new_resources.insert(name.clone(), resource_changes);
                }
                Ok(resource_changes) => {
                    if resource_changes.has_changes() {
                        changes.resource_changes.insert(name.clone(), resource_changes);
                    }
                }
                Err(error) => {
                    warn!("Failed to compute changes for resource {name}: {error}");
                    failures.push(ResourceFailure {
                        child_path: child_path.to_string(),
                        resource_name: name.clone(),
                        error,
                    });
                }
            }
        }

        if let Some(current) = current {
            for (name, _) in current.resources_by_name() {
                if !blueprint.resources.contains_key(name) {
                    changes.removed_resources.push(name.to_string());
                }
            }

            for link_name in current.links.keys() {
                let touches_removed = split_link_name(link_name).is_some_and(|(a, b)| {
                    changes.removed_resources.iter().any(|r| r == a || r == b)
                });
                if touches_removed {
                    changes.removed_links.push(link_name.clone());
                }
            }

            for name in current.child_blueprints.keys() {
                if !blueprint.children.contains_key(name) {
                    changes.removed_children.push(name.clone());
                }
            }
        }

        for (name, child) in &blueprint.children {
            let path = join_child_path(child_path, name);
            self.check_depth(&path, depth + 1)?;

            match current.and_then(|c| c.child(name)) {
                Some(current_child) => {
                    let child_changes =
                        self.stage_level(child, Some(current_child), &path, depth + 1, failures)?;
                    if child_changes.is_empty() {
                        debug!("Child blueprint {path} has no changes");
                    } else {
                        changes.child_changes.insert(name.clone(), child_changes);
                    }
                }
                None => {
                    let definition = self.new_definition(child, &path, depth + 1, failures)?;
                    changes.new_children.insert(name.clone(), definition);
                }
            }
        }

        Self::stage_exports(blueprint, current, &mut changes);
        changes.metadata_changes = self.metadata_changes(blueprint, current, child_path, failures);

        Ok(changes)
    }

    fn new_definition(
        &self,
        blueprint: &ResolvedBlueprint,
        child_path: &str,
        depth: usize,
        failures: &mut Vec<ResourceFailure>,
    ) -> Result<NewBlueprintDefinition, StageError> {
        let mut definition = NewBlueprintDefinition {
            resolve_on_deploy: blueprint.resolve_on_deploy.clone(),
            ..NewBlueprintDefinition::default()
        };

        for (name, resource) in &blueprint.resources {
            match self.resource_changes(blueprint, None, name, resource) {
                Ok(resource_changes) => {
                    definition.new_resources.insert(name.clone(), resource_changes);
                }
                Err(error) => failures.push(ResourceFailure {
                    child_path: child_path.to_string(),
                    resource_name: name.clone(),
                    error,
                }),
            }
        }

        for (name, child) in &blueprint.children {
            let path = join_child_path(child_path, name);
            self.check_depth(&path, depth + 1)?;
            let child_definition = self.new_definition(child, &path, depth + 1, failures)?;
            definition.new_children.insert(name.clone(), child_definition);
        }

        for (name, export) in &blueprint.exports {
            definition.new_exports.insert(
                name.clone(),
                FieldChange::new(field_path("exports", name), None, export.value.clone()),
            );
        }

        Ok(definition)
    }

    fn stage_exports(
        blueprint: &ResolvedBlueprint,
        current: Option<&InstanceState>,
        changes: &mut BlueprintChanges,
    ) {
        for (name, export) in &blueprint.exports {
            let path = field_path("exports", name);
            let deferred = export.value.is_none() && blueprint.resolve_on_deploy.contains(&path);

            match current.and_then(|c| c.exports.get(name)) {
                None => {
                    changes.new_exports.insert(
                        name.clone(),
                        FieldChange::new(path, None, export.value.clone()),
                    );
                }
                Some(existing) if deferred => {
                    changes.export_changes.insert(
                        name.clone(),
                        FieldChange::new(path, existing.value.clone(), None),
                    );
                }
                Some(existing) if existing.value == export.value && existing.field == export.field => {
                    changes.unchanged_exports.push(name.clone());
                }
                Some(existing) => {
                    changes.export_changes.insert(
                        name.clone(),
                        FieldChange::new(path, existing.value.clone(), export.value.clone()),
                    );
                }
            }
        }

        if let Some(current) = current {
            for name in current.exports.keys() {
                if !blueprint.exports.contains_key(name) {
                    changes.removed_exports.push(name.clone());
                }
            }
        }
    }

    fn metadata_changes(
        &self,
        blueprint: &ResolvedBlueprint,
        current: Option<&InstanceState>,
        child_path: &str,
        failures: &mut Vec<ResourceFailure>,
    ) -> MetadataChanges {
        let prev: Option<&MappingNode> = current.and_then(|c| c.metadata.as_ref());
        match self.differ.diff(
            "metadata",
            None,
            prev,
            blueprint.metadata.as_ref(),
            &blueprint.blueprint_resolve_on_deploy(),
        ) {
            Ok(diff) => MetadataChanges {
                new_fields: diff.new_fields,
                modified_fields: diff.modified_fields,
                removed_fields: diff.removed_fields,
                unchanged_fields: diff.unchanged_fields,
            },
            Err(error) => {
                failures.push(ResourceFailure {
                    child_path: child_path.to_string(),
                    resource_name: String::from("metadata"),
                    error,
                });
                MetadataChanges::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LinkDefinition, ResolvedExport};
    use crate::schema::{FieldType, SchemaField, StaticSchemaRegistry};
    use crate::state::{ExportState, LinkState, LinkStatus, ResourceState, ResourceStatus};

    const QUEUE: &str = "aws/sqs/queue";

    fn registry() -> StaticSchemaRegistry {
        StaticSchemaRegistry::new().with(ResourceSchema {
            resource_type: String::from(QUEUE),
            spec: SchemaField::object([
                ("queueName", SchemaField::of(FieldType::String).recreate()),
                ("delay", SchemaField::of(FieldType::Integer)),
            ]),
        })
    }

    fn queue(name: &str, delay: i64) -> ResolvedResource {
        ResolvedResource {
            resource_type: String::from(QUEUE),
            metadata: None,
            spec: Some(queue_spec(name, delay)),
        }
    }

    fn queue_spec(name: &str, delay: i64) -> MappingNode {
        MappingNode::fields([
            ("queueName", MappingNode::from(name)),
            ("delay", MappingNode::from(delay)),
        ])
    }

    fn queue_state(id: &str, name: &str, delay: i64) -> ResourceState {
        ResourceState::new(id, name, QUEUE, ResourceStatus::Created).with_spec(queue_spec(name, delay))
    }

    fn deployed() -> InstanceState {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(queue_state("res-1", "orders", 0));
        state.set_resource(queue_state("res-2", "legacy", 0));
        state.set_link(LinkState::new("link-1", "orders::legacy", LinkStatus::Created));
        state.set_export(
            "ordersUrl",
            ExportState {
                field: String::from("resources.orders.spec.url"),
                value: Some(MappingNode::from("https://orders")),
                export_type: String::from("string"),
            },
        );
        state
    }

    fn export(field: &str, value: Option<&str>) -> ResolvedExport {
        ResolvedExport {
            field: field.to_string(),
            value: value.map(MappingNode::from),
            export_type: String::from("string"),
        }
    }

    #[test]
    fn test_first_deployment() {
        let blueprint = ResolvedBlueprint {
            resources: [(String::from("orders"), queue("orders", 0))].into(),
            links: vec![LinkDefinition {
                resource_a: String::from("orders"),
                resource_b: String::from("dlq"),
                data: None,
            }],
            ..ResolvedBlueprint::default()
        };

        let registry = registry();
        let result = ChangeStager::new(&registry).stage(&blueprint, None).expect("stage");
        assert!(result.is_complete());

        let changes = result.into_changes().expect("changes");
        let orders = &changes.new_resources["orders"];
        assert_eq!(orders.new_fields.len(), 2);
        assert!(orders.new_outbound_links.contains_key("dlq"));
        assert!(changes.has_any_changes());
    }

    #[test]
    fn test_update_remove_and_link_cleanup() {
        let blueprint = ResolvedBlueprint {
            resources: [(String::from("orders"), queue("orders", 10))].into(),
            exports: [(
                String::from("ordersUrl"),
                export("resources.orders.spec.url", Some("https://orders")),
            )]
            .into(),
            ..ResolvedBlueprint::default()
        };
        let state = deployed();

        let registry = registry();
        let changes = ChangeStager::new(&registry)
            .stage(&blueprint, Some(&state))
            .expect("stage")
            .into_changes()
            .expect("changes");

        assert_eq!(changes.removed_resources, vec!["legacy"]);
        assert_eq!(changes.removed_links, vec!["orders::legacy"]);
        let orders = &changes.resource_changes["orders"];
        assert_eq!(orders.modified_fields[0].field_path, "spec.delay");
        assert_eq!(orders.applied_resource_info.resource_id, "res-1");
        assert_eq!(changes.unchanged_exports, vec!["ordersUrl"]);
    }

    #[test]
    fn test_unchanged_resources_are_omitted() {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(queue_state("res-1", "orders", 0));
        let blueprint = ResolvedBlueprint {
            resources: [(String::from("orders"), queue("orders", 0))].into(),
            ..ResolvedBlueprint::default()
        };

        let registry = registry();
        let changes = ChangeStager::new(&registry)
            .stage(&blueprint, Some(&state))
            .expect("stage")
            .changes;
        assert!(changes.resource_changes.is_empty());
        assert!(!changes.has_any_changes());
    }

    #[test]
    fn test_deferred_export_is_not_a_change() {
        let mut state = InstanceState::new("inst-1");
        state.set_resource(queue_state("res-1", "orders", 0));
        state.set_export(
            "ordersUrl",
            ExportState {
                field: String::from("resources.orders.spec.url"),
                value: Some(MappingNode::from("https://orders")),
                export_type: String::from("string"),
            },
        );

        let mut blueprint = ResolvedBlueprint {
            resources: [(String::from("orders"), queue("orders", 0))].into(),
            exports: [(
                String::from("ordersUrl"),
                export("resources.orders.spec.url", None),
            )]
            .into(),
            resolve_on_deploy: vec![String::from("exports.ordersUrl")],
            ..ResolvedBlueprint::default()
        };

        let registry = registry();
        let stager = ChangeStager::new(&registry);
        let changes = stager.stage(&blueprint, Some(&state)).expect("stage").changes;
        assert!(changes.export_changes.contains_key("ordersUrl"));
        assert!(!changes.has_any_changes());

        blueprint
            .resources
            .insert(String::from("orders"), queue("orders", 30));
        let changes = stager.stage(&blueprint, Some(&state)).expect("stage").changes;
        assert!(changes.has_any_changes());
    }

    #[test]
    fn test_unknown_resource_type_is_collected() {
        let blueprint = ResolvedBlueprint {
            resources: [
                (String::from("orders"), queue("orders", 0)),
                (
                    String::from("topic"),
                    ResolvedResource {
                        resource_type: String::from("aws/sns/topic"),
                        ..ResolvedResource::default()
                    },
                ),
            ]
            .into(),
            ..ResolvedBlueprint::default()
        };

        let registry = registry();
        let result = ChangeStager::new(&registry).stage(&blueprint, None).expect("stage");
        assert!(!result.is_complete());
        assert!(result.changes.new_resources.contains_key("orders"));
        assert_eq!(result.failures[0].resource_name, "topic");

        let err = result.into_changes().expect_err("failure");
        assert!(matches!(err, StageError::ResourceChangesFailed { count: 1, .. }));
    }

    #[test]
    fn test_children() {
        let mut state = InstanceState::new("inst-1");
        let mut core = InstanceState::new("inst-core");
        core.set_resource(queue_state("res-9", "events", 0));
        state.set_child("core", core);
        state.set_child("retired", InstanceState::new("inst-retired"));

        let core_blueprint = ResolvedBlueprint {
            resources: [(String::from("events"), queue("events", 5))].into(),
            ..ResolvedBlueprint::default()
        };
        let edge_blueprint = ResolvedBlueprint {
            resources: [(String::from("cache"), queue("cache", 0))].into(),
            exports: [(String::from("cacheName"), export("resources.cache.spec.queueName", Some("cache")))].into(),
            ..ResolvedBlueprint::default()
        };
        let blueprint = ResolvedBlueprint {
            children: [
                (String::from("core"), core_blueprint),
                (String::from("edge"), edge_blueprint),
            ]
            .into(),
            ..ResolvedBlueprint::default()
        };

        let registry = registry();
        let changes = ChangeStager::new(&registry)
            .stage(&blueprint, Some(&state))
            .expect("stage")
            .changes;

        assert_eq!(changes.removed_children, vec!["retired"]);
        assert!(changes.child_changes["core"].resource_changes.contains_key("events"));
        let edge = &changes.new_children["edge"];
        assert!(edge.new_resources.contains_key("cache"));
        assert!(edge.new_exports.contains_key("cacheName"));
    }

    #[test]
    fn test_child_depth_bound() {
        fn nested(levels: usize) -> ResolvedBlueprint {
            let mut blueprint = ResolvedBlueprint::default();
            for _ in 0..levels {
                blueprint = ResolvedBlueprint {
                    children: [(String::from("child"), blueprint)].into(),
                    ..ResolvedBlueprint::default()
                };
            }
            blueprint
        }

        let registry = registry();
        let stager = ChangeStager::new(&registry);
        assert!(stager.stage(&nested(5), None).is_ok());

        let err = stager.stage(&nested(6), None).expect_err("too deep");
        assert!(matches!(err, StageError::MaxDepthExceeded { max_depth: 5, .. }));
    }
}
