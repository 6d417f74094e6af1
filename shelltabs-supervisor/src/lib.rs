//! Process supervisor layer for shelltabs.
//!
//! This crate provides:
//!
//! - [`ProcessSupervisor`]: the contract the tab coordinator uses to spawn a
//!   shell, kill it by correlation key, write input to it, and hear about
//!   its exit
//! - [`LocalSupervisor`]: an implementation that runs shells in local PTYs
//! - The request/reply/event types that cross that boundary

pub mod error;
pub mod local;
pub mod supervisor;

pub use error::SupervisorError;
pub use local::{LocalSupervisor, OutputChunk};
pub use supervisor::{ExitEvent, ProcessSupervisor, SpawnReply, SpawnRequest, SupervisorFuture};
