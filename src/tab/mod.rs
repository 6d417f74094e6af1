//! Tab records for a session's terminal view
//!
//! This module provides the core tab data model:
//! - `TerminalTab`: one shell slot (its shell, working directory, and lifecycle state)
//! - `TabState`: idle / busy / exited, with the pid or exit code carried by the variant
//! - `TabRegistry`: the ordered tab list plus the active-tab pointer
//! - `TabId`: unique identifier for each tab, never reused within a session

mod manager;

pub use manager::TabRegistry;

use chrono::{DateTime, Utc};
use shelltabs_config::ShellType;
use std::fmt;
use std::path::PathBuf;

/// Unique identifier for a tab
pub type TabId = u64;

/// Lifecycle state of a tab's shell process.
///
/// The pid lives inside `Busy` and the exit code inside `Exited`, so a tab
/// can never be busy without a process or carry a pid after its process is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    /// No process attached yet
    Idle,
    /// A live process is attached
    Busy { pid: u32 },
    /// The process terminated or never started
    Exited { exit_code: i32 },
}

impl TabState {
    /// OS process id, `0` when no process is live
    pub fn pid(&self) -> u32 {
        match self {
            TabState::Busy { pid } => *pid,
            TabState::Idle | TabState::Exited { .. } => 0,
        }
    }

    /// Exit code, present only for `Exited`
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TabState::Exited { exit_code } => Some(*exit_code),
            TabState::Idle | TabState::Busy { .. } => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TabState::Idle)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, TabState::Busy { .. })
    }

    pub fn is_exited(&self) -> bool {
        matches!(self, TabState::Exited { .. })
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabState::Idle => write!(f, "idle"),
            TabState::Busy { pid } => write!(f, "busy (pid {pid})"),
            TabState::Exited { exit_code } => write!(f, "exited ({exit_code})"),
        }
    }
}

/// One shell instance slot in the tab strip
#[derive(Debug, Clone)]
pub struct TerminalTab {
    /// Unique tab identifier
    pub id: TabId,
    /// User label; `None` until renamed
    pub name: Option<String>,
    /// Shell family of `shell`
    pub shell_type: ShellType,
    /// Shell program to launch
    pub shell: String,
    /// Working directory used at spawn time
    pub cwd: PathBuf,
    /// When the tab was created
    pub created_at: DateTime<Utc>,
    /// Current process state
    state: TabState,
    /// Next input routed to this exited tab closes it
    pub(crate) close_on_input: bool,
}

impl TerminalTab {
    /// Create a new idle tab
    pub fn new(id: TabId, shell: String, cwd: PathBuf) -> Self {
        Self {
            id,
            name: None,
            shell_type: ShellType::from_path(&shell),
            shell,
            cwd,
            created_at: Utc::now(),
            state: TabState::Idle,
            close_on_input: false,
        }
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    /// OS process id, `0` when no process is live
    pub fn pid(&self) -> u32 {
        self.state.pid()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.state.exit_code()
    }

    /// Whether the next key pressed in this tab will close it
    pub fn closes_on_input(&self) -> bool {
        self.close_on_input && self.state.is_exited()
    }

    /// Label for the tab strip: the user's name, or the shell name and position
    pub fn title(&self, position: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.shell_type.display_name(), position),
        }
    }

    pub(crate) fn set_state(&mut self, state: TabState) {
        if !state.is_exited() {
            self.close_on_input = false;
        }
        self.state = state;
    }
}

/// Correlation key a tab's process is known by to the supervisor
pub fn correlation_key(parent_session_id: &str, tab_id: TabId) -> String {
    format!("{parent_session_id}-terminal-{tab_id}")
}

/// Recover the tab id from a correlation key issued for `parent_session_id`
pub fn parse_correlation_key(parent_session_id: &str, key: &str) -> Option<TabId> {
    key.strip_prefix(parent_session_id)?
        .strip_prefix("-terminal-")?
        .parse()
        .ok()
}
