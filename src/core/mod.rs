//! Core value model shared by every change computation.
//!
//! This module holds the tagged-union value tree used for resource specs,
//! metadata, link data and exports, the resolved blueprint inputs produced
//! by substitution resolution, and field path helpers.

mod mapping;
mod path;
mod resolved;

pub use mapping::{MappingNode, ScalarValue};
pub use path::{field_path, index_path, is_under_path, link_name, split_link_name};
pub use resolved::{LinkDefinition, ResolvedBlueprint, ResolvedExport, ResolvedResource};
