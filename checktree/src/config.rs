//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/checktree/checktree.toml`
//! 3. Local config: `<dir>/.checktree.toml` (directory of the forest document)
//! 4. Environment variables: `CHECKTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// What to do when an operation names a node that is not in the forest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundPolicy {
    /// Return the forest unchanged
    #[default]
    Ignore,
    /// Surface the unknown id as an error
    Error,
}

impl std::str::FromStr for NotFoundPolicy {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "error" => Ok(Self::Error),
            other => Err(ApplicationError::Config {
                message: format!("invalid not_found policy: {other} (expected ignore|error)"),
            }),
        }
    }
}

/// Tree display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub checked_marker: String,
    pub unchecked_marker: String,
    /// Append node ids to labels
    pub show_ids: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            checked_marker: "[x]".into(),
            unchecked_marker: "[ ]".into(),
            show_ids: false,
        }
    }
}

/// Raw display config for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDisplayConfig {
    pub checked_marker: Option<String>,
    pub unchecked_marker: Option<String>,
    pub show_ids: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub forest_file: Option<PathBuf>,
    pub not_found: Option<NotFoundPolicy>,
    pub normalize_on_load: Option<bool>,
    pub display: RawDisplayConfig,
}

impl DisplayConfig {
    fn merge(&self, overlay: &RawDisplayConfig) -> Self {
        Self {
            checked_marker: overlay
                .checked_marker
                .clone()
                .unwrap_or_else(|| self.checked_marker.clone()),
            unchecked_marker: overlay
                .unchecked_marker
                .clone()
                .unwrap_or_else(|| self.unchecked_marker.clone()),
            show_ids: overlay.show_ids.unwrap_or(self.show_ids),
        }
    }
}

/// Unified configuration for checktree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Forest document used when none is given on the command line
    pub forest_file: Option<PathBuf>,
    /// Behavior for unknown node ids
    pub not_found: NotFoundPolicy,
    /// Re-derive parents from leaves when loading a document
    pub normalize_on_load: bool,
    pub display: DisplayConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forest_file: None,
            not_found: NotFoundPolicy::default(),
            normalize_on_load: true,
            display: DisplayConfig::default(),
        }
    }
}

/// Get the XDG config directory for checktree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "checktree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("checktree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".checktree.toml")
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn expand_paths(&mut self) {
        if let Some(file) = &self.forest_file {
            self.forest_file = Some(PathBuf::from(expand_env_vars(&file.to_string_lossy())));
        }
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            forest_file: overlay
                .forest_file
                .clone()
                .or_else(|| self.forest_file.clone()),
            not_found: overlay.not_found.unwrap_or(self.not_found),
            normalize_on_load: overlay.normalize_on_load.unwrap_or(self.normalize_on_load),
            display: self.display.merge(&overlay.display),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.checktree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir)
    }

    /// Load settings from an explicit global config path.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply CHECKTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CHECKTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("forest_file") {
            settings.forest_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("not_found") {
            settings.not_found = val.parse()?;
        }
        if let Ok(val) = config.get_bool("normalize_on_load") {
            settings.normalize_on_load = val;
        }
        if let Ok(val) = config.get_string("display.checked_marker") {
            settings.display.checked_marker = val;
        }
        if let Ok(val) = config.get_string("display.unchecked_marker") {
            settings.display.unchecked_marker = val;
        }
        if let Ok(val) = config.get_bool("display.show_ids") {
            settings.display.show_ids = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# checktree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/checktree/checktree.toml
#   Local:  <document dir>/.checktree.toml
#   Env:    CHECKTREE_* environment variables (nested keys use __, e.g. CHECKTREE_DISPLAY__SHOW_IDS)

# Forest document used when --file is not given
# forest_file = "~/trees/permissions.toml"

# Unknown node ids: "ignore" leaves the forest unchanged, "error" fails the command
# not_found = "ignore"

# Re-derive parent selections from leaves when loading a document
# normalize_on_load = true

[display]
# checked_marker = "[x]"
# unchecked_marker = "[ ]"
# show_ids = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
