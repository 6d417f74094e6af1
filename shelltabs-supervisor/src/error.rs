//! Typed errors reported by process supervisors.

use thiserror::Error;

/// Failures crossing the supervisor boundary.
///
/// The tab coordinator never propagates these; it turns them into tab state
/// (spawn failures) or log lines (kill and write failures).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// The shell could not be started.
    #[error("failed to spawn shell: {0}")]
    Spawn(String),

    /// The `shell_args` string could not be split into arguments.
    #[error("invalid shell arguments '{args}': {reason}")]
    InvalidArgs { args: String, reason: String },

    /// The process could not be signalled.
    #[error("failed to kill process '{key}': {reason}")]
    Kill { key: String, reason: String },

    /// Input could not be delivered to the process.
    #[error("failed to write to process '{key}': {reason}")]
    Write { key: String, reason: String },

    /// No live process is registered under the key.
    #[error("no process registered for '{0}'")]
    UnknownProcess(String),

    /// The task driving the request panicked or was cancelled.
    #[error("supervisor task aborted: {0}")]
    Aborted(String),
}
