//! Error types for the blueprint changes system.
//!
//! This module provides the error hierarchy for every stage of change
//! computation: configuration, state storage, field diffing, changeset
//! staging and changeset reversal.
//!
//! Unsafe-to-rollback conditions are deliberately absent here: they are
//! reported as skipped items alongside a usable changeset, never as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Reason code reported when a reversal recurses past the depth bound.
pub const MAX_REVERSE_DEPTH_EXCEEDED: &str = "max_reverse_depth_exceeded";

/// The main error type for the blueprint changes system.
#[derive(Debug, Error)]
pub enum ChangesError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State storage errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Field diffing errors.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Changeset staging errors.
    #[error("Staging error: {0}")]
    Stage(#[from] StageError),

    /// Changeset reversal errors.
    #[error("Reverse error: {0}")]
    Reverse(#[from] ReverseError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// An environment override could not be interpreted.
    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnvVar {
        /// Name of the variable.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// State storage errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// No state is stored for the instance.
    #[error("No state stored for instance '{instance_id}'")]
    InstanceNotFound {
        /// Instance identifier.
        instance_id: String,
    },

    /// No changeset is stored under the ID.
    #[error("No changeset stored with ID '{changeset_id}'")]
    ChangesetNotFound {
        /// Changeset identifier.
        changeset_id: String,
    },

    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// Storage backend failure.
    #[error("State storage error: {message}")]
    StorageError {
        /// Description of the storage failure.
        message: String,
    },
}

/// Errors raised while diffing a value tree against its schema.
///
/// These are fatal for the entity being diffed but not for the changeset
/// that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A value's shape contradicts the schema declared for its path.
    #[error("Value at {path} does not match schema: expected {expected}, found {found}")]
    TypeMismatch {
        /// Field path of the offending value.
        path: String,
        /// Shape declared by the schema.
        expected: String,
        /// Shape actually found.
        found: String,
    },

    /// An array element lacks the field the array is sorted by.
    #[error("Element {path}[{index}] is missing sort field '{field}'")]
    SortFieldMissing {
        /// Field path of the array.
        path: String,
        /// Index of the element in its original order.
        index: usize,
        /// Name of the sort field.
        field: String,
    },

    /// An array element's sort field is not a scalar.
    #[error("Sort field '{field}' of element {path}[{index}] is not a scalar")]
    SortFieldNotScalar {
        /// Field path of the array.
        path: String,
        /// Index of the element in its original order.
        index: usize,
        /// Name of the sort field.
        field: String,
    },

    /// No schema is registered for the resource type.
    #[error("No schema registered for resource type '{resource_type}'")]
    UnknownResourceType {
        /// The unregistered resource type.
        resource_type: String,
    },
}

/// Errors raised while staging a changeset.
#[derive(Debug, Error)]
pub enum StageError {
    /// One or more resources could not be diffed.
    #[error("Failed to compute changes for {count} resource(s), first: {first}")]
    ResourceChangesFailed {
        /// Number of failed resources.
        count: usize,
        /// Description of the first failure.
        first: String,
    },

    /// Child blueprints are nested deeper than the configured bound.
    #[error("Child blueprint nesting exceeds maximum depth {max_depth} at '{path}'")]
    MaxDepthExceeded {
        /// Configured depth bound.
        max_depth: usize,
        /// Dotted path of the child that exceeded it.
        path: String,
    },
}

/// Errors raised while reversing a changeset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReverseError {
    /// Child changes are nested deeper than the reversal bound.
    #[error("max_reverse_depth_exceeded: child changes nested beyond depth {max_depth} at '{path}'")]
    MaxDepthExceeded {
        /// Configured depth bound.
        max_depth: usize,
        /// Dotted path of the child that exceeded it.
        path: String,
    },
}

/// Result type alias for blueprint changes operations.
pub type Result<T> = std::result::Result<T, ChangesError>;

impl ChangesError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the machine-readable reason code, if the error carries one.
    #[must_use]
    pub const fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Reverse(err) => Some(err.reason_code()),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StateError {
    /// Creates a storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl DiffError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl ReverseError {
    /// Returns the distinguished reason code for this error.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::MaxDepthExceeded { .. } => MAX_REVERSE_DEPTH_EXCEEDED,
        }
    }
}
