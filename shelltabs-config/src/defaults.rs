//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes on
//! `Config` fields so partial YAML files keep working.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

pub fn zero() -> usize {
    0
}

// ── Shell ──────────────────────────────────────────────────────────────────

/// Shell used when neither the config nor `$SHELL` names one.
pub const FALLBACK_SHELL: &str = "/bin/sh";

pub fn shell_env() -> std::collections::HashMap<String, String> {
    std::collections::HashMap::new()
}

// ── Logging ────────────────────────────────────────────────────────────────

pub fn log_level() -> crate::types::LogLevel {
    crate::types::LogLevel::Info
}
