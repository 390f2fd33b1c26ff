//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! wikifork has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Settings stored with the wiki repository
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//!
//! # Global Config Locations
//!
//! Searched in order, first match wins:
//! 1. `$WIKIFORK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/wikifork/config.toml`
//! 3. `~/.wikifork/config.toml`
//!
//! # Repo Config Location
//!
//! `<git_dir>/wikifork/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use wikifork::core::config::Config;
//! use std::path::Path;
//!
//! let loaded = Config::load(Some(Path::new("/srv/wiki.git"))).unwrap();
//! println!("canonical: {}", loaded.config.canonical_branch);
//! ```

pub mod schema;

pub use schema::{ConfigFile, FieldsConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::page::schema::{DEFAULT_TEMPLATE, TEMPLATE_FIELD};
use crate::core::page::{FieldSchema, TemplateSet};
use crate::core::paths::WikiPaths;
use crate::core::types::{BranchName, PageName};

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "WIKIFORK_CONFIG";

const DEFAULT_CANONICAL: &str = "master";
const DEFAULT_EXTENSION: &str = "md";
const DEFAULT_HOMEPAGE: &str = "Home";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Fully resolved configuration for one wiki.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub canonical_branch: BranchName,
    pub extension: String,
    pub homepage: PageName,
    pub auth_enabled: bool,
    pub forking_enabled: bool,
    pub lock_timeout: Duration,
    pub fields: FieldSchema,
    pub templates: TemplateSet,
}

impl WikiConfig {
    /// Configuration with every value at its default.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::resolve(ConfigFile::default())
    }

    /// Resolve a (merged) config file against the defaults.
    pub fn resolve(file: ConfigFile) -> Result<Self, ConfigError> {
        file.validate()?;

        let canonical = file
            .canonical_branch
            .unwrap_or_else(|| DEFAULT_CANONICAL.to_string());
        let canonical_branch = BranchName::new(canonical)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let homepage = PageName::new(
            file.homepage
                .unwrap_or_else(|| DEFAULT_HOMEPAGE.to_string()),
        )
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let defaults = FieldSchema::default();
        let fields = match file.fields {
            None => defaults,
            Some(FieldsConfig { editor, open }) => {
                let mut editor = editor.unwrap_or_else(|| {
                    defaults
                        .defaults()
                        .filter(|(k, _)| defaults.is_editor_field(k))
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                });
                let open = open.unwrap_or_else(|| {
                    defaults
                        .defaults()
                        .filter(|(k, _)| defaults.is_open_field(k))
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                });
                editor
                    .entry(TEMPLATE_FIELD.to_string())
                    .or_insert_with(|| DEFAULT_TEMPLATE.to_string());
                FieldSchema::new(editor, open)
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))?
            }
        };

        let fallback = file
            .default_template
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        let templates = TemplateSet::new(file.templates.unwrap_or_default(), fallback);

        Ok(Self {
            canonical_branch,
            extension: file
                .extension
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            homepage,
            auth_enabled: file.auth_enabled.unwrap_or(true),
            forking_enabled: file.forking_enabled.unwrap_or(true),
            lock_timeout: Duration::from_millis(
                file.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS),
            ),
            fields,
            templates,
        })
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The resolved configuration.
    pub config: WikiConfig,
    /// Files that contributed, lowest precedence first.
    pub sources: Vec<PathBuf>,
}

/// Configuration loading entry points.
pub struct Config;

impl Config {
    /// Load configuration from the default locations.
    ///
    /// If `git_dir` is provided, the repository file is layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(git_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let global = Self::global_config_path();
        let repo = git_dir.map(|dir| WikiPaths::new(dir.to_path_buf()).repo_config_path());
        Self::load_from(global.as_deref(), repo.as_deref())
    }

    /// Load configuration from explicit files; missing files are skipped.
    pub fn load_from(
        global: Option<&Path>,
        repo: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut merged = ConfigFile::default();
        let mut sources = Vec::new();

        for path in [global, repo].into_iter().flatten() {
            if let Some(file) = Self::read_file(path)? {
                tracing::debug!(path = %path.display(), "loaded config file");
                merged = merged.merged_with(file);
                sources.push(path.to_path_buf());
            }
        }

        Ok(ConfigLoadResult {
            config: WikiConfig::resolve(merged)?,
            sources,
        })
    }

    /// The first existing global config file, if any.
    pub fn global_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("wikifork/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".wikifork/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and validate one config file; `Ok(None)` if it doesn't exist.
    pub fn read_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Some(file))
    }

    /// Write the repository config file atomically.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn write_repo(paths: &WikiPaths, config: &ConfigFile) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = paths.repo_config_path();
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        fs::rename(&temp_path, path).map_err(write_err)?;

        Ok(())
    }
}
