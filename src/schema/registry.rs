//! Schema lookup by resource type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ChangesError, ConfigError, Result};

use super::definition::ResourceSchema;

/// Resolves the schema of a resource type.
pub trait SchemaRegistry {
    /// Returns the schema registered for a resource type.
    fn resource_schema(&self, resource_type: &str) -> Option<&ResourceSchema>;
}

/// Map-backed schema registry, loadable from a YAML or JSON document that
/// lists resource schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticSchemaRegistry {
    /// Schemas keyed by resource type.
    #[serde(default)]
    schemas: BTreeMap<String, ResourceSchema>,
}

/// On-disk layout of a schema registry file.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    resources: Vec<ResourceSchema>,
}

impl StaticSchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Registers a schema, replacing any previous one for the same type.
    pub fn register(&mut self, schema: ResourceSchema) {
        debug!("Registering schema for {}", schema.resource_type);
        self.schemas.insert(schema.resource_type.clone(), schema);
    }

    /// Adds a schema, builder style.
    #[must_use]
    pub fn with(mut self, schema: ResourceSchema) -> Self {
        self.register(schema);
        self
    }

    /// Parses a registry from YAML (JSON is accepted as a YAML subset).
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid schema file.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: SchemaFile = serde_yaml::from_str(content).map_err(|e| {
            ChangesError::Config(ConfigError::ParseError {
                message: format!("Invalid schema file: {e}"),
                location: None,
            })
        })?;

        Ok(file
            .resources
            .into_iter()
            .fold(Self::new(), |registry, schema| registry.with(schema)))
    }

    /// Loads a registry from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading resource schemas from: {}", path.display());

        if !path.exists() {
            return Err(ChangesError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            ChangesError::Config(ConfigError::ParseError { message, .. }) => {
                ChangesError::Config(ConfigError::ParseError {
                    message,
                    location: Some(path.display().to_string()),
                })
            }
            other => other,
        })
    }

    /// Loads and merges several registry files. A type defined in more than
    /// one file takes the schema from the last one.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or parsed.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        paths.iter().try_fold(Self::new(), |mut registry, path| {
            let loaded = Self::load_file(path)?;
            registry.schemas.extend(loaded.schemas);
            Ok(registry)
        })
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schemas are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaRegistry for StaticSchemaRegistry {
    fn resource_schema(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.schemas.get(resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField};

    #[test]
    fn test_from_yaml() {
        let yaml = r"
resources:
  - type: aws/sqs/queue
    spec:
      type: object
      attributes:
        queueName:
          type: string
          must_recreate: true
  - type: aws/dynamodb/table
";
        let registry = StaticSchemaRegistry::from_yaml(yaml).expect("valid registry");

        assert_eq!(registry.len(), 2);
        let queue = registry.resource_schema("aws/sqs/queue").expect("queue schema");
        assert!(queue.spec.child("queueName").is_some_and(|f| f.must_recreate));
        assert!(registry.resource_schema("aws/sns/topic").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = StaticSchemaRegistry::new();
        registry.register(ResourceSchema {
            resource_type: String::from("t"),
            spec: SchemaField::of(FieldType::Any),
        });
        registry.register(ResourceSchema {
            resource_type: String::from("t"),
            spec: SchemaField::of(FieldType::Object),
        });

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resource_schema("t").map(|s| s.spec.field_type),
            Some(FieldType::Object)
        );
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(StaticSchemaRegistry::from_yaml("resources: 3").is_err());
    }
}
