//! Configuration for tycheck.
//!
//! Looked up per workspace first, then per user:
//! `<root>/.tycheck.toml`, then `~/.tycheck/config.toml`. The first file that
//! exists wins; files are not merged.
//!
//! ```toml
//! [checker]
//! interpreter = "${VIRTUAL_ENV}/bin/python"
//! enabled = true
//! baseline = true
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Environment variable that overrides `[checker] interpreter`.
pub const INTERPRETER_ENV: &str = "TYCHECK_INTERPRETER";

/// Workspace-local config file name.
pub const WORKSPACE_CONFIG: &str = ".tycheck.toml";

const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct TycheckConfig {
    pub checker: Option<CheckerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Python interpreter with the checker installed. `${VAR}` is expanded.
    pub interpreter: Option<String>,
    /// Set to false to turn checking off for the workspace.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Apply `.mypy/baseline.json` when present.
    #[serde(default = "default_true")]
    pub baseline: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            interpreter: None,
            enabled: true,
            baseline: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: TomlError,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Replace `${NAME}` with the value of the environment variable `NAME`.
///
/// Unset variables expand to nothing. `${}` and an unclosed `${` are kept
/// literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find('}') {
            Some(0) => {
                out.push_str("${}");
                rest = &after[1..];
            }
            Some(close) => {
                out.push_str(&env::var(&after[..close]).unwrap_or_default());
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Candidate config files for `root`, in lookup order.
#[must_use]
pub fn config_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![root.join(WORKSPACE_CONFIG)];
    if let Some(user) = user_config_path() {
        paths.push(user);
    }
    paths
}

#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tycheck").join("config.toml"))
}

impl TycheckConfig {
    /// Load the first config file that exists for `root`.
    ///
    /// `Ok(None)` when there is none; a file that exists but can't be read
    /// or parsed is an error.
    pub fn load(root: &Path) -> Result<Option<(Self, PathBuf)>, ConfigError> {
        for path in config_paths(root) {
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|source| {
                tracing::warn!(path = %path.display(), "Failed to read config: {source}");
                ConfigError::Read {
                    path: path.clone(),
                    source,
                }
            })?;
            let config = Self::parse(&path, &content)?;
            tracing::debug!(path = %path.display(), "Loaded config");
            return Ok(Some((config, path)));
        }
        Ok(None)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| {
            tracing::warn!(path = %path.display(), "Failed to parse config: {source}");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[must_use]
    pub fn checker(&self) -> CheckerConfig {
        self.checker.clone().unwrap_or_default()
    }

    /// Interpreter to run the checker with, or `None` if checking is off or
    /// nothing is configured. `TYCHECK_INTERPRETER` takes precedence.
    #[must_use]
    pub fn interpreter(&self) -> Option<PathBuf> {
        self.resolve_interpreter(env::var(INTERPRETER_ENV).ok())
    }

    fn resolve_interpreter(&self, env_override: Option<String>) -> Option<PathBuf> {
        let checker = self.checker();
        if !checker.enabled {
            return None;
        }
        env_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| checker.interpreter.map(|raw| expand_env_vars(&raw)))
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    }

    #[must_use]
    pub fn baseline_enabled(&self) -> bool {
        self.checker().baseline
    }
}
