//! Resolved blueprint inputs.
//!
//! These types are produced by the substitution-resolution step and are
//! treated as fully resolved, except for the paths listed in
//! `resolve_on_deploy`, whose values are only known at deploy time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::mapping::MappingNode;
use super::path::{field_path, is_under_path, link_name};

/// A resource with all resolvable substitutions resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Resource type (e.g. `aws/lambda/function`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource metadata (display name, labels, annotations, custom).
    #[serde(default)]
    pub metadata: Option<MappingNode>,
    /// Resource spec.
    #[serde(default)]
    pub spec: Option<MappingNode>,
}

/// A desired link between two resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDefinition {
    /// Name of the resource the link originates from.
    pub resource_a: String,
    /// Name of the resource the link points to.
    pub resource_b: String,
    /// Data the link will hold once applied.
    #[serde(default)]
    pub data: Option<MappingNode>,
}

/// A resolved blueprint export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedExport {
    /// Field path the export reads from (e.g. `resources.orders.spec.arn`).
    pub field: String,
    /// Exported value, `None` while it cannot be resolved before deployment.
    #[serde(default)]
    pub value: Option<MappingNode>,
    /// Export type (`string`, `integer`, `object`, ...).
    #[serde(rename = "type", default)]
    pub export_type: String,
}

/// The desired state of one blueprint level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBlueprint {
    /// Resources by name.
    #[serde(default)]
    pub resources: BTreeMap<String, ResolvedResource>,
    /// Links between resources of this blueprint.
    #[serde(default)]
    pub links: Vec<LinkDefinition>,
    /// Child blueprints by name.
    #[serde(default)]
    pub children: BTreeMap<String, ResolvedBlueprint>,
    /// Exports by name.
    #[serde(default)]
    pub exports: BTreeMap<String, ResolvedExport>,
    /// Blueprint-level metadata.
    #[serde(default)]
    pub metadata: Option<MappingNode>,
    /// Paths whose values are only known at deploy time.
    #[serde(default)]
    pub resolve_on_deploy: Vec<String>,
}

impl LinkDefinition {
    /// Returns the link name (`resourceA::resourceB`).
    #[must_use]
    pub fn name(&self) -> String {
        link_name(&self.resource_a, &self.resource_b)
    }
}

impl ResolvedBlueprint {
    /// Returns the resolve-on-deploy paths of one resource, relative to the
    /// resource (e.g. `spec.arn`).
    #[must_use]
    pub fn resource_resolve_on_deploy(&self, resource_name: &str) -> Vec<String> {
        let prefix = field_path("resources", resource_name);
        self.resolve_on_deploy
            .iter()
            .filter(|path| is_under_path(path, &prefix))
            .filter_map(|path| path.get(prefix.len()..))
            .map(|rest| rest.trim_start_matches('.').to_string())
            .filter(|rest| !rest.is_empty())
            .collect()
    }

    /// Returns the resolve-on-deploy paths that apply to exports and
    /// blueprint metadata, unchanged.
    #[must_use]
    pub fn blueprint_resolve_on_deploy(&self) -> Vec<String> {
        self.resolve_on_deploy
            .iter()
            .filter(|path| is_under_path(path, "exports") || is_under_path(path, "metadata"))
            .cloned()
            .collect()
    }

    /// Returns the desired outbound links of a resource keyed by target name.
    #[must_use]
    pub fn outbound_links(&self, resource_name: &str) -> BTreeMap<String, Option<MappingNode>> {
        self.links
            .iter()
            .filter(|link| link.resource_a == resource_name)
            .map(|link| (link.resource_b.clone(), link.data.clone()))
            .collect()
    }
}
