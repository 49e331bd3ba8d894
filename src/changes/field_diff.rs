//! Field-level diffing of value trees.
//!
//! The [`FieldDiffer`] walks a previously persisted value tree and a newly
//! resolved one side by side and records which field paths were added,
//! modified, removed or left unchanged. Schema rules shape the comparison:
//! arrays declaring a sort field are compared order-insensitively, nullable
//! fields with a default are compared against that default when the
//! persisted value is absent, and paths only resolvable at deploy time are
//! held back as placeholders.

use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::trace;

use crate::core::{MappingNode, field_path, index_path, is_under_path};
use crate::error::DiffError;
use crate::schema::SchemaField;

use super::types::FieldChange;

/// Default maximum depth of a field-by-field walk.
pub const DEFAULT_MAX_DIFF_DEPTH: usize = 20;

/// Field-level differences between two value trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff {
    /// Fields present only in the new tree.
    pub new_fields: Vec<FieldChange>,
    /// Fields present in both trees with different values, followed by any
    /// deploy-time placeholders when something else changed.
    pub modified_fields: Vec<FieldChange>,
    /// Paths of fields present only in the previous tree.
    pub removed_fields: Vec<String>,
    /// Paths of fields equal in both trees.
    pub unchanged_fields: Vec<String>,
    /// Paths of provider-computed fields absent from the new tree.
    pub computed_fields: Vec<String>,
    /// Paths whose new value is only known at deploy time.
    pub known_on_deploy: Vec<String>,
    /// Deploy-time placeholders held back because nothing else in this tree
    /// changed. A caller combining several trees surfaces them when another
    /// tree did change.
    pub pending_placeholders: Vec<FieldChange>,
    /// Whether any reported change touches a field that forces recreation.
    pub must_recreate: bool,
}

impl FieldDiff {
    /// Returns true if any field was added, modified or removed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_fields.is_empty()
            || !self.modified_fields.is_empty()
            || !self.removed_fields.is_empty()
    }
}

/// Depth-bounded differ for [`MappingNode`] trees.
#[derive(Debug, Clone, Copy)]
pub struct FieldDiffer {
    max_depth: usize,
}

impl Default for FieldDiffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIFF_DEPTH)
    }
}

/// Flags inherited from ancestor schema fields.
#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    must_recreate: bool,
    sensitive: bool,
}

impl Inherited {
    fn with(self, schema: Option<&SchemaField>) -> Self {
        schema.map_or(self, |schema| Self {
            must_recreate: self.must_recreate || schema.must_recreate,
            sensitive: self.sensitive || schema.sensitive,
        })
    }
}

struct Walk<'a> {
    max_depth: usize,
    resolve_on_deploy: &'a [String],
    diff: FieldDiff,
    placeholders: Vec<FieldChange>,
    resolved: BTreeSet<String>,
}

impl FieldDiffer {
    /// Creates a differ that walks at most `max_depth` levels below the root.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns the configured depth bound.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Diffs `prev` against `new` below the path `root`.
    ///
    /// `resolve_on_deploy` lists full paths (e.g. `spec.arn`) whose new
    /// values are only known at deploy time; listed paths outside `root`
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a new value contradicts its schema or an array
    /// element cannot be sorted by the declared sort field.
    pub fn diff(
        &self,
        root: &str,
        schema: Option<&SchemaField>,
        prev: Option<&MappingNode>,
        new: Option<&MappingNode>,
        resolve_on_deploy: &[String],
    ) -> Result<FieldDiff, DiffError> {
        let mut walk = Walk {
            max_depth: self.max_depth,
            resolve_on_deploy,
            diff: FieldDiff::default(),
            placeholders: Vec::new(),
            resolved: BTreeSet::new(),
        };

        walk.node(root, schema, prev, new, 0, Inherited::default().with(schema))?;
        walk.unvisited_placeholders(root);
        Ok(walk.finish())
    }
}

impl Walk<'_> {
    fn is_deferred(&self, path: &str) -> bool {
        self.resolve_on_deploy
            .iter()
            .any(|listed| is_under_path(path, listed))
    }

    fn node(
        &mut self,
        path: &str,
        schema: Option<&SchemaField>,
        prev: Option<&MappingNode>,
        new: Option<&MappingNode>,
        depth: usize,
        flags: Inherited,
    ) -> Result<(), DiffError> {
        let Some(new) = new else {
            self.absent_in_new(path, schema, prev, depth, flags);
            return Ok(());
        };

        self.resolved.insert(path.to_string());
        check_shape(path, schema, new)?;

        let Some(prev) = prev else {
            if let Some(default) = schema.and_then(SchemaField::nullable_default) {
                if normalized_eq(path, schema, default, new)? {
                    self.diff.unchanged_fields.push(path.to_string());
                } else {
                    self.new_field(path, new.clone(), flags);
                }
                return Ok(());
            }
            return self.added(path, schema, new, depth, flags);
        };

        if depth >= self.max_depth {
            if normalized_eq(path, schema, prev, new)? {
                self.diff.unchanged_fields.push(path.to_string());
            } else {
                self.modified(path, prev.clone(), new.clone(), flags);
            }
            return Ok(());
        }

        match (prev, new) {
            (MappingNode::Fields(prev_fields), MappingNode::Fields(new_fields)) => {
                let keys: BTreeSet<&String> = prev_fields.keys().chain(new_fields.keys()).collect();
                if keys.is_empty() {
                    self.diff.unchanged_fields.push(path.to_string());
                }
                for key in keys {
                    let child_schema = schema.and_then(|s| s.child(key));
                    self.node(
                        &field_path(path, key),
                        child_schema,
                        prev_fields.get(key),
                        new_fields.get(key),
                        depth + 1,
                        flags.with(child_schema),
                    )?;
                }
                Ok(())
            }
            (MappingNode::Items(prev_items), MappingNode::Items(new_items)) => {
                let prev_items = sort_items(path, schema, prev_items)?;
                let new_items = sort_items(path, schema, new_items)?;
                if prev_items.is_empty() && new_items.is_empty() {
                    self.diff.unchanged_fields.push(path.to_string());
                }
                let item_schema = schema.and_then(SchemaField::item);
                for index in 0..prev_items.len().max(new_items.len()) {
                    self.node(
                        &index_path(path, index),
                        item_schema,
                        prev_items.get(index),
                        new_items.get(index),
                        depth + 1,
                        flags.with(item_schema),
                    )?;
                }
                Ok(())
            }
            (MappingNode::Scalar(a), MappingNode::Scalar(b)) if a == b => {
                self.diff.unchanged_fields.push(path.to_string());
                Ok(())
            }
            _ => {
                self.modified(path, prev.clone(), new.clone(), flags);
                Ok(())
            }
        }
    }

    fn absent_in_new(
        &mut self,
        path: &str,
        schema: Option<&SchemaField>,
        prev: Option<&MappingNode>,
        depth: usize,
        flags: Inherited,
    ) {
        if self.is_deferred(path) {
            trace!("Deferring {path} until deploy time");
            self.diff.known_on_deploy.push(path.to_string());
            self.placeholders.push(FieldChange {
                field_path: path.to_string(),
                prev_value: prev.cloned(),
                new_value: None,
                must_recreate: flags.must_recreate,
                sensitive: flags.sensitive,
            });
            return;
        }

        if schema.is_some_and(|s| s.computed) {
            self.diff.computed_fields.push(path.to_string());
            return;
        }

        if let Some(prev) = prev {
            self.removed(path, schema, prev, depth, flags);
        }
    }

    fn added(
        &mut self,
        path: &str,
        schema: Option<&SchemaField>,
        new: &MappingNode,
        depth: usize,
        flags: Inherited,
    ) -> Result<(), DiffError> {
        if depth < self.max_depth {
            match new {
                MappingNode::Fields(fields) if !fields.is_empty() => {
                    for (key, value) in fields {
                        let child_schema = schema.and_then(|s| s.child(key));
                        self.node(
                            &field_path(path, key),
                            child_schema,
                            None,
                            Some(value),
                            depth + 1,
                            flags.with(child_schema),
                        )?;
                    }
                    return Ok(());
                }
                MappingNode::Items(items) if !items.is_empty() => {
                    let items = sort_items(path, schema, items)?;
                    let item_schema = schema.and_then(SchemaField::item);
                    for (index, item) in items.iter().enumerate() {
                        self.node(
                            &index_path(path, index),
                            item_schema,
                            None,
                            Some(item),
                            depth + 1,
                            flags.with(item_schema),
                        )?;
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        let value = normalize(path, schema, new)?.into_owned();
        self.new_field(path, value, flags);
        Ok(())
    }

    fn removed(
        &mut self,
        path: &str,
        schema: Option<&SchemaField>,
        prev: &MappingNode,
        depth: usize,
        flags: Inherited,
    ) {
        if depth < self.max_depth {
            match prev {
                MappingNode::Fields(fields) if !fields.is_empty() => {
                    for (key, value) in fields {
                        let child_schema = schema.and_then(|s| s.child(key));
                        self.absent_in_new(
                            &field_path(path, key),
                            child_schema,
                            Some(value),
                            depth + 1,
                            flags.with(child_schema),
                        );
                    }
                    return;
                }
                MappingNode::Items(items) if !items.is_empty() => {
                    // Persisted arrays that cannot be sorted are walked as stored.
                    let items = sort_items(path, schema, items).unwrap_or(Cow::Borrowed(items));
                    let item_schema = schema.and_then(SchemaField::item);
                    for (index, item) in items.iter().enumerate() {
                        self.absent_in_new(
                            &index_path(path, index),
                            item_schema,
                            Some(item),
                            depth + 1,
                            flags.with(item_schema),
                        );
                    }
                    return;
                }
                _ => {}
            }
        }

        self.diff.must_recreate |= flags.must_recreate;
        self.diff.removed_fields.push(path.to_string());
    }

    fn new_field(&mut self, path: &str, value: MappingNode, flags: Inherited) {
        self.diff.must_recreate |= flags.must_recreate;
        self.diff.new_fields.push(FieldChange {
            field_path: path.to_string(),
            prev_value: None,
            new_value: Some(value),
            must_recreate: flags.must_recreate,
            sensitive: flags.sensitive,
        });
    }

    fn modified(&mut self, path: &str, prev: MappingNode, new: MappingNode, flags: Inherited) {
        self.diff.must_recreate |= flags.must_recreate;
        self.diff.modified_fields.push(FieldChange {
            field_path: path.to_string(),
            prev_value: Some(prev),
            new_value: Some(new),
            must_recreate: flags.must_recreate,
            sensitive: flags.sensitive,
        });
    }

    /// Records listed paths below `root` that the walk never reached and
    /// that have no resolved value.
    fn unvisited_placeholders(&mut self, root: &str) {
        for listed in self.resolve_on_deploy {
            let unseen = is_under_path(listed, root)
                && !self.resolved.contains(listed)
                && !self.diff.known_on_deploy.contains(listed);
            if unseen {
                self.diff.known_on_deploy.push(listed.clone());
                self.placeholders
                    .push(FieldChange::new(listed.clone(), None, None));
            }
        }
    }

    fn finish(mut self) -> FieldDiff {
        if self.diff.has_changes() {
            for placeholder in self.placeholders {
                self.diff.must_recreate |= placeholder.must_recreate;
                self.diff.modified_fields.push(placeholder);
            }
        } else {
            self.diff.pending_placeholders = self.placeholders;
        }
        self.diff
    }
}

fn check_shape(path: &str, schema: Option<&SchemaField>, node: &MappingNode) -> Result<(), DiffError> {
    match schema {
        Some(schema) if !schema.field_type.accepts(node) => Err(DiffError::type_mismatch(
            path,
            schema.field_type.as_str(),
            node.kind(),
        )),
        _ => Ok(()),
    }
}

/// Returns the array items in canonical order when the schema declares a
/// sort field, otherwise as given.
fn sort_items<'n>(
    path: &str,
    schema: Option<&SchemaField>,
    items: &'n [MappingNode],
) -> Result<Cow<'n, [MappingNode]>, DiffError> {
    let Some(sort_field) = schema.and_then(|s| s.sort_array_by_field.as_deref()) else {
        return Ok(Cow::Borrowed(items));
    };

    let mut keyed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let key = item
            .get(sort_field)
            .ok_or_else(|| DiffError::SortFieldMissing {
                path: path.to_string(),
                index,
                field: sort_field.to_string(),
            })?
            .as_scalar()
            .ok_or_else(|| DiffError::SortFieldNotScalar {
                path: path.to_string(),
                index,
                field: sort_field.to_string(),
            })?;
        keyed.push((key, item));
    }

    keyed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    Ok(Cow::Owned(keyed.into_iter().map(|(_, item)| item.clone()).collect()))
}

/// Canonicalizes every sorted array within `node`.
fn normalize<'n>(
    path: &str,
    schema: Option<&SchemaField>,
    node: &'n MappingNode,
) -> Result<Cow<'n, MappingNode>, DiffError> {
    let Some(schema) = schema else {
        return Ok(Cow::Borrowed(node));
    };

    match node {
        MappingNode::Scalar(_) => Ok(Cow::Borrowed(node)),
        MappingNode::Items(items) => {
            let sorted = sort_items(path, Some(schema), items)?;
            let item_schema = schema.item();
            let items = sorted
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    normalize(&index_path(path, i), item_schema, item).map(Cow::into_owned)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Cow::Owned(MappingNode::Items(items)))
        }
        MappingNode::Fields(fields) => {
            let fields = fields
                .iter()
                .map(|(key, value)| {
                    normalize(&field_path(path, key), schema.child(key), value)
                        .map(|v| (key.clone(), v.into_owned()))
                })
                .collect::<Result<_, _>>()?;
            Ok(Cow::Owned(MappingNode::Fields(fields)))
        }
    }
}

fn normalized_eq(
    path: &str,
    schema: Option<&SchemaField>,
    a: &MappingNode,
    b: &MappingNode,
) -> Result<bool, DiffError> {
    Ok(normalize(path, schema, a)? == normalize(path, schema, b)?)
}
