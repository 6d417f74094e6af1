//! Configuration system for shelltabs.
//!
//! This crate provides configuration loading, saving, and default values
//! for the tab coordinator. It includes:
//!
//! - The `Config` struct (shell program, arguments, environment, working
//!   directory, tab limits, exit behaviour, log level)
//! - Shell detection (`ShellType`)
//! - Typed `ConfigError` variants for load/save/validation failures

pub mod config;
pub mod defaults;
pub mod error;
mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{LogLevel, ShellType};
