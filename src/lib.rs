// Library exports for testing and for hosts embedding the tab coordinator
//
// The session core is single-owner: `TerminalSession` is mutated only through
// `&mut self` on the task that owns it. Async work (spawn, kill, write) runs on
// tokio and comes back as events, never by locking session state.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod console;
pub mod debug;
pub mod session;
pub mod tab;
pub mod tab_strip;
pub mod traits;

pub use session::{TabNotification, TerminalSession};
pub use tab::{TabId, TabRegistry, TabState, TerminalTab};
pub use tab_strip::{TabContextMenu, TabStripAction};
pub use traits::DisplayHandle;
