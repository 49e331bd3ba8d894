//! Link change generation.
//!
//! Links carry their own data tree, diffed without a schema, and are keyed
//! from the point of view of the source resource by the name of the target
//! resource.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::core::MappingNode;
use crate::error::DiffError;

use super::field_diff::FieldDiffer;
use super::types::LinkChanges;

/// Outbound link deltas of one resource, keyed by target resource name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundLinkChanges {
    /// Links to create.
    pub new_links: BTreeMap<String, LinkChanges>,
    /// Existing links whose data changed.
    pub changed_links: BTreeMap<String, LinkChanges>,
    /// Target names of links to remove.
    pub removed_links: Vec<String>,
}

/// Generates [`LinkChanges`] for links between resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkChangeGenerator {
    differ: FieldDiffer,
}

impl LinkChangeGenerator {
    /// Creates a generator using the given field differ.
    #[must_use]
    pub const fn new(differ: FieldDiffer) -> Self {
        Self { differ }
    }

    /// Diffs the data of a single link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link data cannot be diffed.
    pub fn generate(
        &self,
        prev: Option<&MappingNode>,
        new: Option<&MappingNode>,
    ) -> Result<LinkChanges, DiffError> {
        let diff = self.differ.diff("", None, prev, new, &[])?;
        Ok(LinkChanges {
            modified_fields: diff.modified_fields,
            new_fields: diff.new_fields,
            removed_fields: diff.removed_fields,
            unchanged_fields: diff
                .unchanged_fields
                .into_iter()
                .filter(|path| !path.is_empty())
                .collect(),
            field_changes_known_on_deploy: diff.known_on_deploy,
        })
    }

    /// Classifies the outbound links of a resource.
    ///
    /// `desired` holds the links the resolved blueprint declares and
    /// `current` the links present in the persisted state, both keyed by
    /// target resource name.
    ///
    /// # Errors
    ///
    /// Returns an error if the data of any link cannot be diffed.
    pub fn outbound(
        &self,
        desired: &BTreeMap<String, Option<MappingNode>>,
        current: &BTreeMap<String, Option<&MappingNode>>,
    ) -> Result<OutboundLinkChanges, DiffError> {
        let mut result = OutboundLinkChanges::default();

        let targets: BTreeSet<&String> = desired.keys().chain(current.keys()).collect();
        for target in targets {
            match (current.get(target), desired.get(target)) {
                (None, Some(new_data)) => {
                    let changes = self.generate(None, new_data.as_ref())?;
                    result.new_links.insert(target.clone(), changes);
                }
                (Some(prev_data), Some(new_data)) => {
                    let changes = self.generate(*prev_data, new_data.as_ref())?;
                    if changes.has_changes() {
                        result.changed_links.insert(target.clone(), changes);
                    }
                }
                (Some(_), None) => result.removed_links.push(target.clone()),
                (None, None) => {}
            }
        }

        debug!(
            "Outbound links: {} new, {} changed, {} removed",
            result.new_links.len(),
            result.changed_links.len(),
            result.removed_links.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: &str) -> MappingNode {
        MappingNode::fields([("policy", MappingNode::from(value))])
    }

    #[test]
    fn test_outbound_classification() {
        let existing = data("read");
        let kept = data("write");

        let desired = BTreeMap::from([
            (String::from("stream"), None),
            (String::from("table"), Some(data("readwrite"))),
            (String::from("topic"), Some(kept.clone())),
        ]);
        let current = BTreeMap::from([
            (String::from("table"), Some(&existing)),
            (String::from("topic"), Some(&kept)),
            (String::from("bucket"), None),
        ]);

        let result = LinkChangeGenerator::default()
            .outbound(&desired, &current)
            .expect("outbound");

        assert_eq!(result.new_links.keys().collect::<Vec<_>>(), vec!["stream"]);
        assert_eq!(result.changed_links.keys().collect::<Vec<_>>(), vec!["table"]);
        assert_eq!(result.removed_links, vec!["bucket"]);

        let table = &result.changed_links["table"];
        assert_eq!(table.modified_fields[0].field_path, "policy");
    }

    #[test]
    fn test_new_link_data_fields() {
        let changes = LinkChangeGenerator::default()
            .generate(None, Some(&data("read")))
            .expect("generate");

        assert_eq!(changes.new_fields.len(), 1);
        assert_eq!(changes.new_fields[0].field_path, "policy");
        assert!(changes.has_changes());
    }

    #[test]
    fn test_empty_link_data_is_unchanged() {
        let empty = MappingNode::fields(Vec::<(&str, MappingNode)>::new());
        let changes = LinkChangeGenerator::default()
            .generate(Some(&empty), Some(&empty))
            .expect("generate");

        assert!(!changes.has_changes());
        assert!(changes.unchanged_fields.is_empty());
    }
}
