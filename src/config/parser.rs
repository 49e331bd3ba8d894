//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ChangesError, ConfigError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::spec::ChangesConfig;

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "BPCHANGES_";

/// Configuration parser for loading engine configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// Relative schema paths and state directories are resolved against
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ChangesConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ChangesError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ChangesError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        if let Some(dir) = path.parent() {
            resolve_relative_paths(&mut config, dir);
        }
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ChangesConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(ChangesConfig::default());
        }

        let config: ChangesConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ChangesError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration with {} schema file(s)", config.schemas.len());
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `BPCHANGES_<SECTION>_<KEY>` (e.g., `BPCHANGES_DIFF_MAX_DEPTH`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// override has an invalid value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ChangesConfig> {
        let mut config = self.load_file(path)?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Loads the configuration at `path`, or the first one found by
    /// [`find_config_file`], or the defaults if there is none. Environment
    /// overrides apply in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, if a file
    /// cannot be parsed, or if an override has an invalid value.
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<ChangesConfig> {
        let found = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let start = self
                    .base_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                find_config_file(start).ok()
            }
        };

        match found {
            Some(path) => self.load_with_env(path),
            None => {
                debug!("No configuration file found, using defaults");
                let mut config = ChangesConfig::default();
                apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
                Ok(config)
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ChangesError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Applies `BPCHANGES_*` overrides, reading variables through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] if a numeric or boolean override
/// cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut ChangesConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        let name = format!("{ENV_PREFIX}{key}");
        lookup(&name).map(|value| (name, value))
    };

    if let Some((name, value)) = var("DIFF_MAX_DEPTH") {
        debug!("Overriding diff.max_depth from environment");
        config.diff.max_depth = parse_var(&name, &value)?;
    }

    if let Some((name, value)) = var("STAGING_MAX_BLUEPRINT_DEPTH") {
        debug!("Overriding staging.max_blueprint_depth from environment");
        config.staging.max_blueprint_depth = parse_var(&name, &value)?;
    }

    if let Some((name, value)) = var("ROLLBACK_MAX_REVERSE_DEPTH") {
        debug!("Overriding rollback.max_reverse_depth from environment");
        config.rollback.max_reverse_depth = parse_var(&name, &value)?;
    }

    if let Some((_, value)) = var("LOG_LEVEL") {
        debug!("Overriding logging.level from environment");
        config.logging.level = value;
    }

    if let Some((name, value)) = var("LOG_JSON") {
        debug!("Overriding logging.json from environment");
        config.logging.json = parse_var(&name, &value)?;
    }

    if let Some((_, value)) = var("STATE_DIR") {
        debug!("Overriding state.dir from environment");
        config.state.dir = Some(PathBuf::from(value));
    }

    Ok(())
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ChangesError::Config(ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value: value.to_string(),
        })
    })
}

fn resolve_relative_paths(config: &mut ChangesConfig, base: &Path) {
    for schema in &mut config.schemas {
        if schema.is_relative() {
            *schema = base.join(&*schema);
        }
    }
    if let Some(dir) = config.state.dir.as_mut() {
        if dir.is_relative() {
            *dir = base.join(&*dir);
        }
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["bpchanges.yaml", "bpchanges.yml"];

/// Finds the configuration file in the given directory or its parents, then
/// in the user configuration directory (`<config dir>/bpchanges/`).
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        if let Some(found) = find_in(&current) {
            return Ok(found);
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(user_dir) = dirs::config_dir().map(|dir| dir.join("bpchanges")) {
        if let Some(found) = find_in(&user_dir) {
            return Ok(found);
        }
    }

    Err(ChangesError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.iter().find_map(|filename| {
        let config_path = dir.join(filename);
        if config_path.exists() {
            info!("Found configuration file: {}", config_path.display());
            Some(config_path)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_minimal_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("", None).unwrap();

        assert_eq!(config, ChangesConfig::default());
        assert_eq!(config.diff.max_depth, 20);
        assert_eq!(config.rollback.max_reverse_depth, 5);
        assert_eq!(config.staging.max_blueprint_depth, 5);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
diff:
  max_depth: 12
staging:
  max_blueprint_depth: 3
rollback:
  max_reverse_depth: 4
logging:
  level: debug
  json: true
state:
  dir: /var/lib/bpchanges
schemas:
  - schemas/aws.yaml
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.diff.max_depth, 12);
        assert_eq!(config.staging.max_blueprint_depth, 3);
        assert_eq!(config.rollback.max_reverse_depth, 4);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.state.dir, Some(PathBuf::from("/var/lib/bpchanges")));
        assert_eq!(config.schemas.len(), 1);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("diff: [unclosed", None);

        assert!(matches!(
            result,
            Err(ChangesError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ChangesConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("BPCHANGES_DIFF_MAX_DEPTH", "8"),
                ("BPCHANGES_LOG_JSON", "true"),
                ("BPCHANGES_STATE_DIR", "/tmp/state"),
            ]),
        )
        .unwrap();

        assert_eq!(config.diff.max_depth, 8);
        assert!(config.logging.json);
        assert_eq!(config.state.dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(config.rollback.max_reverse_depth, 5);
    }

    #[test]
    fn test_env_override_invalid() {
        let mut config = ChangesConfig::default();
        let result = apply_env_overrides(
            &mut config,
            lookup(&[("BPCHANGES_ROLLBACK_MAX_REVERSE_DEPTH", "deep")]),
        );

        assert!(matches!(
            result,
            Err(ChangesError::Config(ConfigError::InvalidEnvVar { .. }))
        ));
    }

    #[test]
    fn test_load_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bpchanges.yaml");
        std::fs::write(&path, "schemas:\n  - aws.yaml\nstate:\n  dir: state\n").unwrap();

        let config = ConfigParser::new().load_file(&path).unwrap();

        assert_eq!(config.schemas, vec![dir.path().join("aws.yaml")]);
        assert_eq!(config.state.dir, Some(dir.path().join("state")));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("bpchanges.yml"), "").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("bpchanges.yml"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigParser::new().load_file("/nonexistent/bpchanges.yaml");
        assert!(matches!(
            result,
            Err(ChangesError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
