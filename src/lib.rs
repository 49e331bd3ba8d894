// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Blueprint Changes
//!
//! Changeset computation for declarative blueprint deployments.
//!
//! ## Overview
//!
//! Given a resolved blueprint and the persisted state of a deployed
//! instance, this crate computes what has to change, and given a changeset
//! that failed part-way, what can safely be undone:
//!
//! - Field-level diffs of resource specs, metadata and link data, driven by
//!   per-type schemas
//! - A changeset tree covering resources, links, child blueprints, exports
//!   and metadata
//! - Reverse changesets that undo an applied changeset
//! - Rollback filtering that drops operations unsafe against the state a
//!   failed deployment left behind
//! - Teardown changesets built from instance state alone
//!
//! ## Modules
//!
//! - [`core`]: Value trees, field paths and resolved blueprint inputs
//! - [`schema`]: Resource schemas and the schema registry
//! - [`state`]: Instance state types and storage backends
//! - [`changes`]: Diffing, staging, reversal, filtering and teardown
//! - [`rollback`]: Rollback and teardown planning over a state store
//! - [`config`]: Configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```
//! use blueprint_changes::changes::{
//!     filter_reverse_changeset_by_current_state, reverse_changeset, BlueprintChanges,
//! };
//! use blueprint_changes::state::InstanceState;
//!
//! let applied = BlueprintChanges::default();
//! let previous = InstanceState::new("inst-1");
//! let current = InstanceState::new("inst-1");
//!
//! let reversed = reverse_changeset(Some(&applied), Some(&previous)).unwrap();
//! let filtered = filter_reverse_changeset_by_current_state(reversed.as_ref(), Some(&current));
//! assert!(!filtered.has_skipped_items);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod changes;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod rollback;
pub mod schema;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use changes::{
    BlueprintChanges, ChangeStager, Changes, ChangesetHasher, FieldDiffer, RollbackFilterResult,
    RemovalChangesResult, SkippedRollbackItem, create_removal_changes_from_instance_state,
    filter_reverse_changeset_by_current_state, reverse_changeset,
};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ChangesConfig, ConfigParser, ConfigValidator};
pub use error::{ChangesError, Result};
pub use rollback::{RollbackPlan, RollbackPlanner};
pub use schema::{SchemaRegistry, StaticSchemaRegistry};
pub use state::{InstanceState, LocalStateStore, StateStore};
