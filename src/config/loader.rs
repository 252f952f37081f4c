use crate::config::schema::{AppConfig, ValidationError};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MIDNIGHT_AI_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "midnight-ai.toml";
/// Config file looked up in the home directory.
pub const HOME_CONFIG: &str = ".midnight-ai.toml";

pub(crate) const TRACING_TARGET: &str = "midnight_ai::config";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Candidate config files, highest priority first.
///
/// 1. Explicit `--config` path
/// 2. `MIDNIGHT_AI_CONFIG` environment variable
/// 3. `./midnight-ai.toml`
/// 4. `~/.midnight-ai.toml`
fn candidate_paths(explicit: Option<&Path>) -> Vec<(PathBuf, bool)> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            candidates.push((PathBuf::from(env_path), true));
        }
    }
    candidates.push((PathBuf::from(LOCAL_CONFIG), false));
    if let Some(home) = home::home_dir() {
        candidates.push((home.join(HOME_CONFIG), false));
    }
    candidates
}

/// Resolve the effective configuration.
///
/// Explicitly named files must exist; discovered ones are skipped when
/// absent. With no file at all the defaults apply. Returns the config and
/// the file it came from.
pub fn discover(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    for (path, required) in candidate_paths(explicit) {
        if !required && !path.is_file() {
            continue;
        }
        let config = load_from_path(&path)?;
        tracing::debug!(target: TRACING_TARGET, path = %path.display(), "loaded config");
        return Ok((config, Some(path)));
    }
    Ok((AppConfig::default(), None))
}
