//! Configuration module for the changeset engine.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `bpchanges.yaml`
//! - Environment overrides and `.env` loading
//! - Validation of depth bounds, log filters and schema paths

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_PREFIX, apply_env_overrides, find_config_file,
};
pub use spec::{
    ChangesConfig, DiffConfig, LoggingConfig, RollbackConfig, StagingConfig, StateConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
