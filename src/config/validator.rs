//! Configuration validation.
//!
//! This module checks depth bounds, logging filters and schema paths before
//! any changeset is computed.

use crate::error::{ChangesError, ConfigError, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::spec::ChangesConfig;

/// Depth above which a bound is reported as suspicious.
const DEPTH_WARNING_THRESHOLD: usize = 64;

/// Validator for engine configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &ChangesConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ChangesError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &ChangesConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_depths(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_schemas(config, &mut result);

        result
    }

    fn validate_depths(config: &ChangesConfig, result: &mut ValidationResult) {
        let bounds = [
            ("diff.max_depth", config.diff.max_depth),
            ("staging.max_blueprint_depth", config.staging.max_blueprint_depth),
            ("rollback.max_reverse_depth", config.rollback.max_reverse_depth),
        ];

        for (field, value) in bounds {
            if value == 0 {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} must be at least 1"),
                });
            } else if value > DEPTH_WARNING_THRESHOLD {
                result.warnings.push(format!(
                    "{field} is {value}; very deep walks may be slow on large blueprints"
                ));
            }
        }

        if config.rollback.max_reverse_depth < config.staging.max_blueprint_depth {
            result.warnings.push(format!(
                "rollback.max_reverse_depth ({}) is below staging.max_blueprint_depth ({}); \
                 changesets for the deepest blueprints cannot be rolled back",
                config.rollback.max_reverse_depth, config.staging.max_blueprint_depth
            ));
        }
    }

    fn validate_logging(config: &ChangesConfig, result: &mut ValidationResult) {
        if let Err(e) = EnvFilter::try_new(&config.logging.level) {
            result.errors.push(ValidationError {
                field: String::from("logging.level"),
                message: format!("Invalid log filter '{}': {e}", config.logging.level),
            });
        }
    }

    fn validate_schemas(config: &ChangesConfig, result: &mut ValidationResult) {
        for (index, path) in config.schemas.iter().enumerate() {
            if !path.exists() {
                result.errors.push(ValidationError {
                    field: format!("schemas[{index}]"),
                    message: format!("Schema file not found: {}", path.display()),
                });
            }
        }

        if config.schemas.is_empty() {
            result.warnings.push(String::from(
                "No schema files configured; staging will fail for every resource type",
            ));
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
