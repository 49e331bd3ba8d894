//! Schema definition types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::MappingNode;

/// Shape of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Object with a fixed set of named attributes.
    Object,
    /// Map with arbitrary keys and uniformly typed values.
    Map,
    /// Ordered list of uniformly typed items.
    Array,
    /// String scalar.
    String,
    /// Integer scalar.
    Integer,
    /// Floating point scalar.
    Float,
    /// Boolean scalar.
    Boolean,
    /// Any shape; never checked.
    #[default]
    Any,
}

/// Field-level rules for one node of a resource spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaField {
    /// Expected shape of the value.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Attributes of an object.
    pub attributes: BTreeMap<String, SchemaField>,
    /// Schema of each item of an array.
    pub items: Option<Box<SchemaField>>,
    /// Schema of each value of a map.
    pub map_values: Option<Box<SchemaField>>,
    /// Whether the field may be left unset by the user.
    pub nullable: bool,
    /// Value the provider applies when the field is unset.
    pub default: Option<MappingNode>,
    /// Whether changing the field requires the resource to be recreated.
    pub must_recreate: bool,
    /// Whether the value is computed by the provider at deploy time.
    pub computed: bool,
    /// Whether the value must be redacted in output.
    pub sensitive: bool,
    /// Sub-field used to canonicalize array order before comparison.
    pub sort_array_by_field: Option<String>,
}

/// Schema for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Resource type the schema describes.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Schema of the resource spec.
    #[serde(default)]
    pub spec: SchemaField,
}

impl FieldType {
    /// Returns the lowercase name used in schema files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Map => "map",
            Self::Array => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }

    /// Returns true if a value of the given shape is acceptable.
    #[must_use]
    pub const fn accepts(self, node: &MappingNode) -> bool {
        match self {
            Self::Any => true,
            Self::Object | Self::Map => matches!(node, MappingNode::Fields(_)),
            Self::Array => matches!(node, MappingNode::Items(_)),
            Self::String | Self::Integer | Self::Float | Self::Boolean => {
                matches!(node, MappingNode::Scalar(_))
            }
        }
    }
}

impl SchemaField {
    /// Creates a schema field of the given type with no rules.
    #[must_use]
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    /// Creates an object schema from named attributes.
    #[must_use]
    pub fn object<K, I>(attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self {
            field_type: FieldType::Object,
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }

    /// Creates an array schema with the given item schema.
    #[must_use]
    pub fn array(items: Self) -> Self {
        Self {
            field_type: FieldType::Array,
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// Creates a map schema with the given value schema.
    #[must_use]
    pub fn map(values: Self) -> Self {
        Self {
            field_type: FieldType::Map,
            map_values: Some(Box::new(values)),
            ..Self::default()
        }
    }

    /// Marks the field as requiring recreation when changed.
    #[must_use]
    pub const fn recreate(mut self) -> Self {
        self.must_recreate = true;
        self
    }

    /// Marks the field as computed by the provider.
    #[must_use]
    pub const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Marks the field as sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Marks the field as nullable with a provider default.
    #[must_use]
    pub fn nullable_with_default(mut self, default: MappingNode) -> Self {
        self.nullable = true;
        self.default = Some(default);
        self
    }

    /// Canonicalizes array order by the given sub-field.
    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>) -> Self {
        self.sort_array_by_field = Some(field.into());
        self
    }

    /// Returns the schema of a named child, for objects and maps.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        match self.field_type {
            FieldType::Map => self.map_values.as_deref(),
            _ => self.attributes.get(name),
        }
    }

    /// Returns the schema of array items.
    #[must_use]
    pub fn item(&self) -> Option<&Self> {
        self.items.as_deref()
    }

    /// Returns the default value when the field is nullable.
    #[must_use]
    pub const fn nullable_default(&self) -> Option<&MappingNode> {
        if self.nullable {
            self.default.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_yaml() {
        let yaml = r"
type: aws/lambda/function
spec:
  type: object
  attributes:
    functionName:
      type: string
      must_recreate: true
    memorySize:
      type: integer
      nullable: true
      default: 128
    tags:
      type: array
      sort_array_by_field: key
      items:
        type: object
        attributes:
          key:
            type: string
          value:
            type: string
";
        let schema: ResourceSchema = serde_yaml::from_str(yaml).expect("valid schema");

        assert_eq!(schema.resource_type, "aws/lambda/function");
        let function_name = schema.spec.child("functionName").expect("functionName");
        assert!(function_name.must_recreate);

        let memory = schema.spec.child("memorySize").expect("memorySize");
        assert_eq!(memory.nullable_default(), Some(&MappingNode::from(128_i64)));

        let tags = schema.spec.child("tags").expect("tags");
        assert_eq!(tags.sort_array_by_field.as_deref(), Some("key"));
        assert_eq!(tags.item().map(|i| i.field_type), Some(FieldType::Object));
    }

    #[test]
    fn test_accepts() {
        assert!(FieldType::Object.accepts(&MappingNode::fields([("a", MappingNode::from(1_i64))])));
        assert!(!FieldType::Array.accepts(&MappingNode::from("x")));
        assert!(FieldType::Any.accepts(&MappingNode::items([])));
    }

    #[test]
    fn test_map_child_uses_value_schema() {
        let schema = SchemaField::map(SchemaField::of(FieldType::String).sensitive());
        assert!(schema.child("anything").is_some_and(|c| c.sensitive));
    }
}
