//! Configuration types for the changeset engine.
//!
//! This module defines the structs that map to the `bpchanges.yaml` file.
//! Every section is optional; omitted values fall back to the engine's
//! built-in bounds.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::changes::{DEFAULT_MAX_BLUEPRINT_DEPTH, DEFAULT_MAX_DIFF_DEPTH, MAX_REVERSE_DEPTH};

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangesConfig {
    /// Field diffing settings.
    pub diff: DiffConfig,
    /// Changeset staging settings.
    pub staging: StagingConfig,
    /// Rollback settings.
    pub rollback: RollbackConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// State storage settings.
    pub state: StateConfig,
    /// Resource schema files to load into the schema registry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<PathBuf>,
}

/// Field diffing settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    /// Depth below which values are compared as opaque wholes.
    pub max_depth: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DIFF_DEPTH,
        }
    }
}

/// Changeset staging settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StagingConfig {
    /// Maximum nesting of child blueprints.
    pub max_blueprint_depth: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            max_blueprint_depth: DEFAULT_MAX_BLUEPRINT_DEPTH,
        }
    }
}

/// Rollback settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RollbackConfig {
    /// Maximum nesting of child changes followed when reversing, filtering
    /// and tearing down.
    pub max_reverse_depth: usize,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            max_reverse_depth: MAX_REVERSE_DEPTH,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level filter (e.g. `info`, `bpchanges=debug`).
    pub level: String,
    /// Emit logs as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            json: false,
        }
    }
}

/// State storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding instance states and staged changesets. Defaults to
    /// `.bpchanges` in the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}
