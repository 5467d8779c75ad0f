//! CLI configuration.
//!
//! # Responsibility
//! - Load the optional TOML config file.
//! - Resolve effective settings: flags > environment > file > defaults.
//!
//! # Invariants
//! - A missing default config file is not an error; a missing explicit one is.
//! - Every resolved path is absolute so logging accepts the log directory.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use todo_core::TaskSort;

pub const ENV_DB_PATH: &str = "TODO_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";

const APP_DIR: &str = "todo";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "todo.db";
const SESSION_FILE: &str = "session";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    pub default_sort: Option<TaskSort>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub session_file: PathBuf,
    pub default_sort: TaskSort,
}

impl FileConfig {
    /// Reads `explicit`, or the default config path when `None`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file `{}`", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config file `{}`", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies environment values from `env` and then `overrides`.
    ///
    /// Relative paths from flags or environment resolve against `cwd`;
    /// relative paths from the file resolve against `data_dir`, which also
    /// anchors the defaults.
    pub fn resolve(
        self,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
        cwd: &Path,
        data_dir: &Path,
    ) -> Result<Settings> {
        if !data_dir.is_absolute() || !cwd.is_absolute() {
            bail!(
                "base directories must be absolute: `{}`, `{}`",
                cwd.display(),
                data_dir.display()
            );
        }
        let anchor = |path: PathBuf| absolute_from(data_dir, path);

        let db_path = overrides
            .db_path
            .clone()
            .or_else(|| non_empty(env(ENV_DB_PATH)).map(PathBuf::from))
            .map(|path| absolute_from(cwd, path))
            .or_else(|| self.db_path.map(anchor))
            .unwrap_or_else(|| data_dir.join(DB_FILE));

        let log_level = overrides
            .log_level
            .clone()
            .or_else(|| non_empty(env(ENV_LOG_LEVEL)))
            .or(self.log_level)
            .unwrap_or_else(|| todo_core::default_log_level().to_string());

        Ok(Settings {
            db_path,
            log_level,
            log_dir: self
                .log_dir
                .map(anchor)
                .unwrap_or_else(|| data_dir.join("logs")),
            session_file: self
                .session_file
                .map(anchor)
                .unwrap_or_else(|| data_dir.join(SESSION_FILE)),
            default_sort: self.default_sort.unwrap_or_default(),
        })
    }
}

/// `<config dir>/todo/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// `<data dir>/todo`, falling back to the temp dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn absolute_from(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}
