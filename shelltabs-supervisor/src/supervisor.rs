//! The process supervisor contract.
//!
//! A supervisor owns real OS processes. Callers address a process only by
//! its correlation key, a string chosen by the caller at spawn time. Every
//! request returns a boxed future so that the *issue* of a request happens
//! synchronously at the call site while its completion is awaited elsewhere.

use crate::error::SupervisorError;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Future returned by every supervisor request.
pub type SupervisorFuture<T> = Pin<Box<dyn Future<Output = Result<T, SupervisorError>> + Send>>;

/// Everything needed to launch one shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Correlation key the process will be known by
    pub key: String,
    /// Working directory for the shell
    pub cwd: PathBuf,
    /// Shell program
    pub shell: String,
    /// Argument string, split by the supervisor
    pub shell_args: Option<String>,
    /// Extra environment variables
    pub shell_env: Option<HashMap<String, String>>,
}

/// Supervisor response to a spawn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnReply {
    pub success: bool,
    /// OS process id; meaningful only when `success` is true
    pub pid: u32,
}

impl SpawnReply {
    /// A successful spawn of `pid`
    pub fn started(pid: u32) -> Self {
        Self { success: true, pid }
    }

    /// A spawn the supervisor reports as failed
    pub fn failed() -> Self {
        Self {
            success: false,
            pid: 0,
        }
    }
}

/// A supervised process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent {
    pub key: String,
    pub exit_code: i32,
}

/// Contract to an out-of-process (or out-of-thread) OS process layer.
pub trait ProcessSupervisor: Send + Sync {
    /// Launch a shell under `request.key`.
    fn spawn(&self, request: SpawnRequest) -> SupervisorFuture<SpawnReply>;

    /// Kill the process registered under `key`.
    ///
    /// Resolves to `Ok(false)` when no such process is live.
    fn kill(&self, key: &str) -> SupervisorFuture<bool>;

    /// Deliver input bytes to the process registered under `key`.
    fn write(&self, key: &str, data: &[u8]) -> SupervisorFuture<()>;

    /// Subscribe to exit notifications for every supervised process.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe_exits(&self) -> mpsc::UnboundedReceiver<ExitEvent>;
}
