//! Per-resource change generation.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{MappingNode, is_under_path, split_link_name};
use crate::error::DiffError;
use crate::schema::ResourceSchema;
use crate::state::InstanceState;

use super::field_diff::FieldDiffer;
use super::link::LinkChangeGenerator;
use super::types::{Changes, ResourceInfo};

/// Outbound links of a resource, keyed by target resource name.
#[derive(Debug, Clone, Default)]
pub struct LinkContext<'a> {
    /// Links declared by the resolved blueprint, with their data.
    pub desired: BTreeMap<String, Option<MappingNode>>,
    /// Links present in the persisted state, with their data.
    pub current: BTreeMap<String, Option<&'a MappingNode>>,
}

impl<'a> LinkContext<'a> {
    /// Collects the persisted outbound links of `resource_name` from a state.
    #[must_use]
    pub fn from_state(
        resource_name: &str,
        state: Option<&'a InstanceState>,
        desired: BTreeMap<String, Option<MappingNode>>,
    ) -> Self {
        let current = state
            .map(|state| {
                state
                    .links
                    .iter()
                    .filter_map(|(name, link)| {
                        split_link_name(name)
                            .filter(|(source, _)| *source == resource_name)
                            .map(|(_, target)| (target.to_string(), link.data.as_ref()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { desired, current }
    }
}

/// Generates [`Changes`] for a single resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceChangeGenerator {
    differ: FieldDiffer,
    links: LinkChangeGenerator,
}

impl ResourceChangeGenerator {
    /// Creates a generator using the given field differ.
    #[must_use]
    pub const fn new(differ: FieldDiffer) -> Self {
        Self {
            differ,
            links: LinkChangeGenerator::new(differ),
        }
    }

    /// Computes the changes between a resource's persisted state and its
    /// newly resolved form.
    ///
    /// `resolve_on_deploy` lists paths relative to the resource
    /// (`spec.arn`, `metadata.labels`). A resource without persisted state
    /// is diffed against nothing, so every field is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved spec contradicts the schema.
    pub fn generate_changes(
        &self,
        info: &ResourceInfo,
        schema: Option<&ResourceSchema>,
        resolve_on_deploy: &[String],
        links: &LinkContext<'_>,
    ) -> Result<Changes, DiffError> {
        let current = info.current_state.as_ref();
        let resolved = info.resolved.as_ref();

        let spec = self.differ.diff(
            "spec",
            schema.map(|s| &s.spec),
            current.and_then(|c| c.spec_data.as_ref()),
            resolved.and_then(|r| r.spec.as_ref()),
            resolve_on_deploy,
        )?;
        let metadata = self.differ.diff(
            "metadata",
            None,
            current.and_then(|c| c.metadata.as_ref()),
            resolved.and_then(|r| r.metadata.as_ref()),
            resolve_on_deploy,
        )?;
        let outbound = self.links.outbound(&links.desired, &links.current)?;

        let type_changed = match (current, resolved) {
            (Some(current), Some(resolved)) => current.resource_type != resolved.resource_type,
            _ => false,
        };

        // Fields the provider computed on the last deploy are not user removals.
        let state_computed = current.map_or(&[][..], |c| c.computed_fields.as_slice());
        let (computed_removals, removed_fields): (Vec<String>, Vec<String>) = spec
            .removed_fields
            .into_iter()
            .chain(metadata.removed_fields)
            .partition(|path| state_computed.iter().any(|c| is_under_path(path, c)));

        let mut computed_fields = spec.computed_fields;
        computed_fields.extend(computed_removals);

        let pending: Vec<_> = spec
            .pending_placeholders
            .into_iter()
            .chain(metadata.pending_placeholders)
            .collect();

        let mut changes = Changes {
            applied_resource_info: info.clone(),
            must_recreate: current.is_some() && (spec.must_recreate || type_changed),
            modified_fields: spec
                .modified_fields
                .into_iter()
                .chain(metadata.modified_fields)
                .collect(),
            new_fields: spec.new_fields.into_iter().chain(metadata.new_fields).collect(),
            removed_fields,
            unchanged_fields: spec
                .unchanged_fields
                .into_iter()
                .chain(metadata.unchanged_fields)
                .collect(),
            computed_fields,
            field_changes_known_on_deploy: spec
                .known_on_deploy
                .into_iter()
                .chain(metadata.known_on_deploy)
                .collect(),
            new_outbound_links: outbound.new_links,
            outbound_link_changes: outbound.changed_links,
            removed_outbound_links: outbound.removed_links,
        };

        // Placeholders held back by one tree surface when the resource changed elsewhere.
        if changes.has_changes() {
            for placeholder in pending {
                changes.must_recreate |= current.is_some() && placeholder.must_recreate;
                changes.modified_fields.push(placeholder);
            }
        }

        debug!(
            "Resource {}: {} new, {} modified, {} removed fields, recreate={}",
            info.resource_name,
            changes.new_fields.len(),
            changes.modified_fields.len(),
            changes.removed_fields.len(),
            changes.must_recreate
        );

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResolvedResource;
    use crate::schema::{FieldType, SchemaField};
    use crate::state::{LinkState, LinkStatus, ResourceState, ResourceStatus};

    fn queue_schema() -> ResourceSchema {
        ResourceSchema {
            resource_type: String::from("aws/sqs/queue"),
            spec: SchemaField::object([
                ("queueName", SchemaField::of(FieldType::String).recreate()),
                ("delay", SchemaField::of(FieldType::Integer)),
                ("arn", SchemaField::of(FieldType::String).computed()),
            ]),
        }
    }

    fn queue_spec(name: &str, delay: i64) -> MappingNode {
        MappingNode::fields([
            ("queueName", MappingNode::from(name)),
            ("delay", MappingNode::from(delay)),
        ])
    }

    fn empty_spec() -> MappingNode {
        MappingNode::fields(Vec::<(String, MappingNode)>::new())
    }

    fn existing(spec: MappingNode) -> ResourceState {
        ResourceState::new("res-1", "queue", "aws/sqs/queue", ResourceStatus::Created).with_spec(spec)
    }

    fn info(current: Option<ResourceState>, spec: MappingNode, resource_type: &str) -> ResourceInfo {
        ResourceInfo {
            resource_id: current.as_ref().map(|c| c.resource_id.clone()).unwrap_or_default(),
            resource_name: String::from("queue"),
            resource_type: resource_type.to_string(),
            instance_id: String::from("inst-1"),
            current_state: current,
            resolved: Some(ResolvedResource {
                resource_type: resource_type.to_string(),
                metadata: None,
                spec: Some(spec),
            }),
        }
    }

    #[test]
    fn test_update_in_place() {
        let info = info(
            Some(existing(queue_spec("orders", 0))),
            queue_spec("orders", 5),
            "aws/sqs/queue",
        );
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, Some(&queue_schema()), &[], &LinkContext::default())
            .expect("changes");

        assert!(!changes.must_recreate);
        assert_eq!(changes.modified_fields.len(), 1);
        assert_eq!(changes.modified_fields[0].field_path, "spec.delay");
        assert_eq!(changes.unchanged_fields, vec!["spec.queueName"]);
    }

    #[test]
    fn test_immutable_field_forces_recreate() {
        let info = info(
            Some(existing(queue_spec("orders", 0))),
            queue_spec("orders-v2", 0),
            "aws/sqs/queue",
        );
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, Some(&queue_schema()), &[], &LinkContext::default())
            .expect("changes");
        assert!(changes.must_recreate);
    }

    #[test]
    fn test_type_change_forces_recreate() {
        let info = info(
            Some(existing(queue_spec("orders", 0))),
            queue_spec("orders", 0),
            "aws/sqs/fifoQueue",
        );
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, None, &[], &LinkContext::default())
            .expect("changes");
        assert!(changes.must_recreate);
        assert!(!changes.has_field_changes());
    }

    #[test]
    fn test_new_resource_never_recreates() {
        let info = info(None, queue_spec("orders", 0), "aws/sqs/queue");
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, Some(&queue_schema()), &[], &LinkContext::default())
            .expect("changes");

        assert!(!changes.must_recreate);
        assert_eq!(changes.new_fields.len(), 2);
    }

    #[test]
    fn test_state_computed_fields_are_not_removals() {
        let mut current = existing(MappingNode::fields([
            ("queueName", MappingNode::from("orders")),
            ("delay", MappingNode::from(0_i64)),
            ("url", MappingNode::from("https://q")),
        ]));
        current.computed_fields = vec![String::from("spec.url")];

        let info = info(Some(current), queue_spec("orders", 0), "aws/sqs/queue");
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, None, &[], &LinkContext::default())
            .expect("changes");

        assert!(changes.removed_fields.is_empty());
        assert_eq!(changes.computed_fields, vec!["spec.url"]);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_link_only_change_is_an_update() {
        let mut state = InstanceState::new("inst-1");
        state.set_link(
            LinkState::new("link-1", "queue::oldTopic", LinkStatus::Created)
                .with_data(MappingNode::fields([("a", MappingNode::from(1_i64))])),
        );
        state.set_link(LinkState::new("link-2", "other::queue", LinkStatus::Created));

        let desired = BTreeMap::from([(String::from("newTopic"), None)]);
        let links = LinkContext::from_state("queue", Some(&state), desired);
        assert_eq!(links.current.keys().collect::<Vec<_>>(), vec!["oldTopic"]);

        let info = info(
            Some(existing(queue_spec("orders", 0))),
            queue_spec("orders", 0),
            "aws/sqs/queue",
        );
        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, Some(&queue_schema()), &[], &links)
            .expect("changes");

        assert!(!changes.has_field_changes());
        assert!(changes.has_changes());
        assert!(changes.new_outbound_links.contains_key("newTopic"));
        assert_eq!(changes.removed_outbound_links, vec!["oldTopic"]);
    }

    #[test]
    fn test_spec_placeholder_surfaces_with_metadata_change() {
        let mut current = existing(MappingNode::fields([("arn", MappingNode::from("arn:old"))]));
        current.metadata = Some(MappingNode::fields([("displayName", MappingNode::from("a"))]));

        let mut info = info(Some(current), empty_spec(), "aws/sqs/queue");
        if let Some(resolved) = info.resolved.as_mut() {
            resolved.metadata = Some(MappingNode::fields([("displayName", MappingNode::from("b"))]));
        }
        let deferred = vec![String::from("spec.arn")];

        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, None, &deferred, &LinkContext::default())
            .expect("changes");

        let modified: Vec<&str> = changes
            .modified_fields
            .iter()
            .map(|c| c.field_path.as_str())
            .collect();
        assert_eq!(modified, vec!["metadata.displayName", "spec.arn"]);
        assert_eq!(changes.modified_fields[1].new_value, None);
        assert_eq!(changes.field_changes_known_on_deploy, vec!["spec.arn"]);
    }

    #[test]
    fn test_lone_placeholder_is_not_a_change() {
        let current = existing(MappingNode::fields([("arn", MappingNode::from("arn:old"))]));
        let info = info(Some(current), empty_spec(), "aws/sqs/queue");
        let deferred = vec![String::from("spec.arn")];

        let changes = ResourceChangeGenerator::default()
            .generate_changes(&info, None, &deferred, &LinkContext::default())
            .expect("changes");

        assert!(!changes.has_changes());
        assert_eq!(changes.field_changes_known_on_deploy, vec!["spec.arn"]);
    }

    #[test]
    fn test_schema_error_is_returned() {
        let info = info(
            Some(existing(queue_spec("orders", 0))),
            MappingNode::fields([("delay", MappingNode::items([]))]),
            "aws/sqs/queue",
        );
        let err = ResourceChangeGenerator::default()
            .generate_changes(&info, Some(&queue_schema()), &[], &LinkContext::default())
            .expect_err("type mismatch");
        assert!(matches!(err, DiffError::TypeMismatch { .. }));
    }
}
