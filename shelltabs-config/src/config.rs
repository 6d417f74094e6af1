//! The `Config` struct plus YAML persistence and path resolution.
//!
//! Covers:
//! - `load` / `load_from` / `save_to` (YAML file I/O with atomic write)
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - Shell and working-directory resolution used when a new tab is created
//! - `validate` for field values serde cannot check

use crate::defaults;
use crate::error::ConfigError;
use crate::types::{LogLevel, ShellType};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings that shape how a session creates, spawns, and retires tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========================================================================
    // Shell
    // ========================================================================
    /// Shell program to launch (`None` = `$SHELL`, then `/bin/sh`)
    #[serde(default)]
    pub shell: Option<String>,

    /// Argument string handed to the supervisor unchanged
    #[serde(default)]
    pub shell_args: Option<String>,

    /// Extra environment variables for spawned shells
    #[serde(default = "defaults::shell_env")]
    pub shell_env: HashMap<String, String>,

    /// Default working directory for new tabs (`None` = home directory)
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    // ========================================================================
    // Tabs
    // ========================================================================
    /// Maximum number of tabs per session (0 = unlimited)
    #[serde(default = "defaults::zero")]
    pub max_tabs: usize,

    /// Write an exit banner to the tab's display when its shell exits
    #[serde(default = "defaults::bool_true")]
    pub show_exit_notice: bool,

    /// After a shell exits, the next key pressed in that tab closes it
    #[serde(default = "defaults::bool_true")]
    pub close_on_key_after_exit: bool,

    // ========================================================================
    // Debug Logging
    // ========================================================================
    /// Level written to the debug log file
    #[serde(default = "defaults::log_level")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            shell_args: None,
            shell_env: defaults::shell_env(),
            working_directory: None,
            max_tabs: defaults::zero(),
            show_exit_notice: defaults::bool_true(),
            close_on_key_after_exit: defaults::bool_true(),
            log_level: defaults::log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, or defaults if no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            log::info!("Config file not found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Config = serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;

        Ok(())
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir()
                .map(|dir| dir.join("shelltabs"))
                .unwrap_or_else(|| PathBuf::from("."))
        }
        #[cfg(not(target_os = "windows"))]
        {
            dirs::home_dir()
                .map(|home| home.join(".config").join("shelltabs"))
                .unwrap_or_else(|| PathBuf::from("."))
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Check field values that serde alone cannot validate
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(shell) = &self.shell
            && shell.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "shell must not be empty (omit it to use $SHELL)".to_string(),
            ));
        }
        if let Some(key) = self
            .shell_env
            .keys()
            .find(|key| key.is_empty() || key.contains('='))
        {
            return Err(ConfigError::Validation(format!(
                "shell_env key '{key}' is not a valid environment variable name"
            )));
        }
        Ok(())
    }

    /// Shell program for new tabs: config, then `$SHELL`, then `/bin/sh`
    pub fn resolved_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| defaults::FALLBACK_SHELL.to_string())
    }

    /// Shell family of [`Self::resolved_shell`]
    pub fn resolved_shell_type(&self) -> ShellType {
        ShellType::from_path(&self.resolved_shell())
    }

    /// Working directory for new tabs: config, then home, then `.`
    pub fn resolved_working_directory(&self) -> PathBuf {
        self.working_directory
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Environment for spawned shells, or `None` when nothing extra is set
    pub fn shell_env_or_none(&self) -> Option<HashMap<String, String>> {
        if self.shell_env.is_empty() {
            None
        } else {
            Some(self.shell_env.clone())
        }
    }
}
