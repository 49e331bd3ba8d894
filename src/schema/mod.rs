//! Resource schema descriptors.
//!
//! A schema describes, per resource type, the field-level rules the field
//! differ applies: immutability, nullable defaults, computed and sensitive
//! fields, and array canonicalization.

mod definition;
mod registry;

pub use definition::{FieldType, ResourceSchema, SchemaField};
pub use registry::{SchemaRegistry, StaticSchemaRegistry};
