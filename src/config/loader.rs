//! Configuration loading and discovery for `minipack.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::MinipackConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = "minipack.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No configuration file could be found
    #[error("No minipack.toml found in {} or any parent directory", .0.display())]
    NotFound(PathBuf),
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse minipack.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Ignore timestamps and lint state
    pub force: Option<bool>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
    /// Concatenate every aggregate without minifying
    pub nominify: Option<bool>,
    /// Line break column for every aggregate
    pub linebreakpos: Option<usize>,
    /// Report lint problems without failing
    pub no_fail: Option<bool>,
    /// Run only the aggregate with this name
    pub only: Option<String>,
}

/// Find minipack.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration and return it with its project root.
///
/// If a path is provided, loads from that file. Otherwise walks up from the
/// current directory looking for minipack.toml.
///
/// # Example
/// ```ignore
/// let (config, root) = load_config(None)?;
/// let jobs = config.batch_jobs(&root);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<(MinipackConfig, PathBuf), ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let cwd = env::current_dir()?;
            find_config_from(cwd.clone()).ok_or(ConfigError::NotFound(cwd))?
        }
    };

    let config = load_config_file(&config_path)?;
    let root = match project_root(&config_path) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => env::current_dir()?,
    };
    tracing::debug!(config = %config_path.display(), root = %root.display(), "loaded configuration");
    Ok((config, root))
}

/// Load configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<MinipackConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: MinipackConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. `only` drops every
/// other aggregate and fails validation when nothing matches.
pub fn merge_cli_overrides(
    config: &mut MinipackConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(force) = overrides.force {
        config.build.force = force;
    }

    if let Some(jobs) = overrides.jobs {
        config.build.jobs = jobs;
    }

    if let Some(nominify) = overrides.nominify {
        for aggregate in &mut config.aggregates {
            aggregate.nominify = nominify;
        }
    }

    if let Some(linebreakpos) = overrides.linebreakpos {
        for aggregate in &mut config.aggregates {
            aggregate.linebreakpos = linebreakpos;
        }
    }

    if let Some(true) = overrides.no_fail {
        if let Some(lint) = &mut config.lint {
            lint.fail = false;
        }
    }

    if let Some(only) = &overrides.only {
        // Pin generated names before filtering so they stay stable.
        for index in 0..config.aggregates.len() {
            let name = config.aggregate_name(index);
            config.aggregates[index].name = Some(name);
        }
        config.aggregates.retain(|a| a.name.as_deref() == Some(only.as_str()));
        if config.aggregates.is_empty() {
            return Err(ConfigError::Validation(vec![format!("no aggregate named '{}'", only)]));
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(())
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the minipack.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}
