//! bpchanges CLI entrypoint.
//!
//! This is the main entrypoint for the bpchanges command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use blueprint_changes::changes::{
    BlueprintChanges, ChangeStager, ChangesetHasher, FieldDiffer, ReverseChangesetGenerator,
    RollbackFilter,
};
use blueprint_changes::cli::{Cli, Commands, OutputFormatter};
use blueprint_changes::config::{ChangesConfig, ConfigParser, ConfigValidator, LoggingConfig};
use blueprint_changes::core::ResolvedBlueprint;
use blueprint_changes::error::{ChangesError, ConfigError, Result};
use blueprint_changes::rollback::RollbackPlanner;
use blueprint_changes::schema::StaticSchemaRegistry;
use blueprint_changes::state::{InstanceState, LocalStateStore, StateStore};

use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    init_logging(cli.verbose, &config.logging);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads `.env`, the configuration file and environment overrides.
fn load_config(config_path: Option<&Path>) -> Result<ChangesConfig> {
    let base = config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;
    parser.load_or_default(config_path)
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the configured level; `--verbose`
/// takes precedence over both. Logs go to stderr so stdout carries only
/// command output.
fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, config: ChangesConfig) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let store = create_state_store(&config)?;
    debug!("Using {} state store", store.backend_type());

    match cli.command {
        Commands::Stage {
            blueprint,
            instance,
            save,
            detailed,
        } => {
            cmd_stage(
                &config,
                &store,
                &blueprint,
                instance.as_deref(),
                save,
                detailed,
                &formatter,
            )
            .await
        }
        Commands::Reverse {
            changes,
            previous,
            current,
        } => cmd_reverse(&config, &changes, &previous, current.as_deref(), &formatter),
        Commands::Rollback {
            instance,
            changeset,
            previous,
            expect_digest,
        } => {
            cmd_rollback(
                &config,
                &store,
                &instance,
                &changeset,
                &previous,
                expect_digest.as_deref(),
                &formatter,
            )
            .await
        }
        Commands::Teardown { instance } => {
            cmd_teardown(&config, &store, &instance, &formatter).await
        }
        Commands::Digest { changes, full } => cmd_digest(&changes, full, &formatter),
        Commands::ValidateConfig { warnings } => cmd_validate_config(&config, warnings, &formatter),
    }
}

/// Stage the changes for a resolved blueprint.
async fn cmd_stage(
    config: &ChangesConfig,
    store: &LocalStateStore,
    blueprint_path: &Path,
    instance_id: Option<&str>,
    save: bool,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let blueprint: ResolvedBlueprint = read_yaml_file(blueprint_path)?;
    let registry = StaticSchemaRegistry::load_files(&config.schemas)?;
    info!("Loaded {} resource schema(s)", registry.len());

    let current = match instance_id {
        Some(id) => {
            let state = store.load_instance(id).await?;
            if state.is_none() {
                info!("No state stored for {}, staging a first deployment", id);
            }
            state
        }
        None => None,
    };

    let stager = ChangeStager::with_limits(
        &registry,
        FieldDiffer::new(config.diff.max_depth),
        config.staging.max_blueprint_depth,
    );
    let result = stager.stage(&blueprint, current.as_ref())?;

    let changeset_id = if save && result.is_complete() {
        Some(store.save_changes(&result.changes).await?)
    } else {
        if save {
            warn!("Not saving an incomplete changeset");
        }
        None
    };

    emit(&formatter.format_staging(&result, changeset_id.as_deref(), detailed))?;

    result.into_changes().map(|_| ()).map_err(ChangesError::from)
}

/// Reverse a changeset file, optionally filtering by current state.
fn cmd_reverse(
    config: &ChangesConfig,
    changes_path: &Path,
    previous_path: &Path,
    current_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let changes: BlueprintChanges = read_yaml_file(changes_path)?;
    let previous: InstanceState = read_yaml_file(previous_path)?;

    let depth = config.rollback.max_reverse_depth;
    let reversed = ReverseChangesetGenerator::new(depth).reverse(Some(&changes), Some(&previous))?;

    let output = match current_path {
        Some(path) => {
            let current: InstanceState = read_yaml_file(path)?;
            let filtered = RollbackFilter::new(depth).filter(reversed.as_ref(), Some(&current));
            formatter.format_reversal(filtered.changes.as_ref(), &filtered.skipped_items)
        }
        None => formatter.format_reversal(reversed.as_ref(), &[]),
    };

    emit(&output)
}

/// Plan the rollback of a stored changeset.
async fn cmd_rollback(
    config: &ChangesConfig,
    store: &LocalStateStore,
    instance_id: &str,
    changeset_id: &str,
    previous_id: &str,
    expect_digest: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let planner = RollbackPlanner::new(store).with_max_depth(config.rollback.max_reverse_depth);
    let plan = planner
        .plan_rollback_from_store(instance_id, changeset_id, previous_id)
        .await?;

    if let Some(expected) = expect_digest {
        if !plan.matches_digest(expected) {
            return Err(ChangesError::internal(format!(
                "Rollback plan digest {} does not match expected {expected}",
                plan.digest.as_deref().unwrap_or("(none)")
            )));
        }
    }

    emit(&formatter.format_plan(&plan))
}

/// Plan the teardown of a stored instance.
async fn cmd_teardown(
    config: &ChangesConfig,
    store: &LocalStateStore,
    instance_id: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let planner = RollbackPlanner::new(store).with_max_depth(config.rollback.max_reverse_depth);
    let plan = planner.plan_teardown(instance_id).await?;

    if plan.has_skipped_items() {
        warn!(
            "{} item(s) of {} cannot be safely removed",
            plan.skipped_items.len(),
            instance_id
        );
    }

    emit(&formatter.format_plan(&plan))
}

/// Print the digest of a changeset file.
fn cmd_digest(changes_path: &Path, full: bool, formatter: &OutputFormatter) -> Result<()> {
    let changes: BlueprintChanges = read_yaml_file(changes_path)?;
    let digest = ChangesetHasher::new().hash_changes(&changes)?;
    emit(&formatter.format_digest(&digest, full))
}

/// Validate configuration.
fn cmd_validate_config(
    config: &ChangesConfig,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let validator = ConfigValidator::new();
    let result = validator.check(config);

    emit(&formatter.format_validation(&result, show_warnings))?;

    validator.validate(config).map(|_| ())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Creates the state store for the configured directory.
fn create_state_store(config: &ChangesConfig) -> Result<LocalStateStore> {
    match &config.state.dir {
        Some(dir) => Ok(LocalStateStore::with_base_dir(dir.clone())),
        None => LocalStateStore::new(),
    }
}

/// Reads a YAML or JSON document.
fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ChangesError::Config(ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        ChangesError::Config(ConfigError::ParseError {
            message: format!("Invalid document: {e}"),
            location: Some(path.display().to_string()),
        })
    })
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
