//! Shell detection and logging configuration types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Shell Types
// ============================================================================

/// Which shell family a tab launches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    Sh,
    #[default]
    Unknown,
}

impl ShellType {
    /// Classify a shell path string into a `ShellType`.
    pub fn from_path(path: &str) -> Self {
        let program = std::path::Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);
        if program.contains("zsh") {
            Self::Zsh
        } else if program.contains("bash") {
            Self::Bash
        } else if program.contains("fish") {
            Self::Fish
        } else if program == "sh" || program == "dash" {
            Self::Sh
        } else {
            Self::Unknown
        }
    }

    /// Detect the user's shell from `$SHELL`.
    pub fn detect() -> Self {
        std::env::var("SHELL")
            .map(|shell| Self::from_path(&shell))
            .unwrap_or(Self::Unknown)
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bash => "Bash",
            Self::Zsh => "Zsh",
            Self::Fish => "Fish",
            Self::Sh => "sh",
            Self::Unknown => "Unknown",
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Log level written to the debug log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    Off,
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    /// Parse a level name as accepted by `--log-level` and `RUST_LOG`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
