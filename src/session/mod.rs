//! Terminal session: one tab strip and the shells behind it
//!
//! `TerminalSession` owns the [`TabRegistry`] and is driven from a single
//! task (the UI loop). Asynchronous work, spawning and killing shells, runs
//! on a tokio runtime and reports back through the session's event channel,
//! so every registry mutation happens through `&mut self` on the owning task.
//!
//! - `spawn`: issuing spawns and discarding stale results
//! - `exit_router`: the exit subscription and input routing for exited tabs
//! - `close_ops`: close, close-others/left/right, reorder, dispose
//! - `delegator`: focus/clear/search forwarded to the active tab's display
//!
//! Spawn results travel over the session's own channel and are not public:
//!
//! ```compile_fail
//! use shelltabs::session::SessionEvent;
//! ```

mod close_ops;
mod delegator;
mod exit_router;
mod spawn;

pub use spawn::SPAWN_FAILURE_EXIT_CODE;

use crate::tab::{TabId, TabRegistry, TabState, TerminalTab};
use crate::traits::DisplayHandle;
use shelltabs_config::Config;
use shelltabs_supervisor::{ExitEvent, ProcessSupervisor, SpawnReply, SupervisorError};
use spawn::SpawnCoordinator;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Results of asynchronous work, delivered back to the owning task
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// A spawn request finished
    SpawnResolved {
        tab_id: TabId,
        generation: u64,
        result: Result<SpawnReply, SupervisorError>,
    },
}

/// Observable changes, sent to whoever renders the tab strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabNotification {
    TabAdded { tab_id: TabId, index: usize },
    ActiveTabChanged { tab_id: Option<TabId> },
    TabPidChanged { tab_id: TabId, pid: u32 },
    TabStateChanged { tab_id: TabId, state: TabState },
    /// The shell could not be started; the tab can be retried
    SpawnFailed { tab_id: TabId, reason: String },
    TabClosed { tab_id: TabId },
    TabsReordered { order: Vec<TabId> },
    TabRenamed { tab_id: TabId, name: Option<String> },
}

/// Coordinates the shells behind one session's terminal tabs.
pub struct TerminalSession {
    /// Parent session id, the prefix of every correlation key
    session_id: String,
    config: Config,
    registry: TabRegistry,
    spawner: SpawnCoordinator,
    supervisor: Arc<dyn ProcessSupervisor>,
    runtime: Handle,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    /// The session's only exit subscription; `None` once disposed
    exit_rx: Option<mpsc::UnboundedReceiver<ExitEvent>>,
    displays: HashMap<TabId, Box<dyn DisplayHandle>>,
    notify_tx: mpsc::UnboundedSender<TabNotification>,
    disposed: bool,
}

impl TerminalSession {
    /// Create a session and subscribe to the supervisor's exit stream.
    ///
    /// # Arguments
    /// * `session_id` - Parent session id used to build correlation keys
    /// * `config` - Shell, working directory, and exit behaviour settings
    /// * `supervisor` - Owner of the real shell processes
    /// * `runtime` - Runtime that spawn and kill requests are driven on
    /// * `notify_tx` - Channel receiving [`TabNotification`]s
    pub fn new(
        session_id: impl Into<String>,
        config: Config,
        supervisor: Arc<dyn ProcessSupervisor>,
        runtime: Handle,
        notify_tx: mpsc::UnboundedSender<TabNotification>,
    ) -> Self {
        let session_id = session_id.into();
        let exit_rx = supervisor.subscribe_exits();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        log::info!("Opened terminal session '{}'", session_id);

        Self {
            session_id,
            config,
            registry: TabRegistry::new(),
            spawner: SpawnCoordinator::new(),
            supervisor,
            runtime,
            events_tx,
            events_rx,
            exit_rx: Some(exit_rx),
            displays: HashMap::new(),
            notify_tx,
            disposed: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn tabs(&self) -> &[TerminalTab] {
        self.registry.tabs()
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&TerminalTab> {
        self.registry.get(tab_id)
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.registry.active_tab_id()
    }

    /// Whether a spawn is outstanding for `tab_id`
    pub fn is_spawn_pending(&self, tab_id: TabId) -> bool {
        self.spawner.is_pending(tab_id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Open a tab with the configured shell and working directory
    pub fn add_tab(&mut self) -> Option<TabId> {
        let shell = self.config.resolved_shell();
        let cwd = self.config.resolved_working_directory();
        self.add_tab_with(shell, cwd)
    }

    /// Open a tab with an explicit shell and working directory and spawn it.
    ///
    /// Returns `None` when the session is disposed or at `max_tabs`.
    pub fn add_tab_with(&mut self, shell: String, cwd: PathBuf) -> Option<TabId> {
        if self.disposed {
            return None;
        }
        if self.config.max_tabs > 0 && self.registry.tab_count() >= self.config.max_tabs {
            log::warn!(
                "Tab limit of {} reached, not opening another",
                self.config.max_tabs
            );
            return None;
        }

        let tab_id = self.registry.add_tab(shell, cwd);
        let index = self.registry.tab_count() - 1;
        self.notify(TabNotification::TabAdded { tab_id, index });
        self.notify(TabNotification::ActiveTabChanged {
            tab_id: Some(tab_id),
        });
        self.reconcile();
        Some(tab_id)
    }

    /// Make a tab active
    pub fn select_tab(&mut self, tab_id: TabId) -> bool {
        let changed = self.registry.set_active(tab_id);
        if changed {
            self.notify_active_changed();
        }
        changed
    }

    pub fn select_next_tab(&mut self) -> bool {
        let changed = self.registry.select_next();
        if changed {
            self.notify_active_changed();
        }
        changed
    }

    pub fn select_previous_tab(&mut self) -> bool {
        let changed = self.registry.select_previous();
        if changed {
            self.notify_active_changed();
        }
        changed
    }

    /// Set or clear a tab's label
    pub fn rename_tab(&mut self, tab_id: TabId, name: Option<String>) -> bool {
        let changed = self.registry.rename(tab_id, name);
        if changed {
            let name = self.registry.get(tab_id).and_then(|t| t.name.clone());
            self.notify(TabNotification::TabRenamed { tab_id, name });
        }
        changed
    }

    /// Attach the renderer's surface for a tab, replacing any previous one
    pub fn attach_display(&mut self, tab_id: TabId, display: Box<dyn DisplayHandle>) -> bool {
        if self.disposed || self.registry.get(tab_id).is_none() {
            return false;
        }
        self.displays.insert(tab_id, display);
        true
    }

    /// Detach a tab's surface; it will not be called again
    pub fn detach_display(&mut self, tab_id: TabId) -> Option<Box<dyn DisplayHandle>> {
        self.displays.remove(&tab_id)
    }

    pub fn has_display(&self, tab_id: TabId) -> bool {
        self.displays.contains_key(&tab_id)
    }

    /// Apply every event that is already queued, without waiting.
    ///
    /// Exit notifications are applied before spawn results. Returns the
    /// number of events applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(exit) = self.exit_rx.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.on_exit(exit);
            applied += 1;
        }
        while let Ok(event) = self.events_rx.try_recv() {
            self.on_session_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it
    pub async fn next_event(&mut self) {
        let exit_rx = &mut self.exit_rx;
        let incoming = tokio::select! {
            biased;
            Some(exit) = recv_exit(exit_rx) => Incoming::Exit(exit),
            Some(event) = self.events_rx.recv() => Incoming::Session(event),
        };
        match incoming {
            Incoming::Exit(exit) => self.on_exit(exit),
            Incoming::Session(event) => self.on_session_event(event),
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SpawnResolved {
                tab_id,
                generation,
                result,
            } => self.on_spawn_resolved(tab_id, generation, result),
        }
    }

    pub(crate) fn notify(&self, notification: TabNotification) {
        let _ = self.notify_tx.send(notification);
    }

    fn notify_active_changed(&self) {
        self.notify(TabNotification::ActiveTabChanged {
            tab_id: self.registry.active_tab_id(),
        });
    }

    /// Change a tab's state, notifying observers when it actually changed
    pub(crate) fn set_tab_state(&mut self, tab_id: TabId, state: TabState) -> bool {
        let changed = self.registry.update_tab_state(tab_id, state);
        if changed {
            self.notify(TabNotification::TabStateChanged { tab_id, state });
        }
        changed
    }

    /// Fire-and-forget kill of the process registered under `key`
    pub(crate) fn issue_kill(&self, key: String) {
        log::info!("Killing process '{}'", key);
        let reply = self.supervisor.kill(&key);
        self.runtime.spawn(async move {
            match reply.await {
                Ok(true) => log::debug!("Kill of '{}' acknowledged", key),
                Ok(false) => log::warn!("Kill of '{}' found no live process", key),
                Err(e) => log::warn!("Kill of '{}' failed: {}", key, e),
            }
        });
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        // Live shells must not outlive their records
        self.dispose();
    }
}

enum Incoming {
    Exit(ExitEvent),
    Session(SessionEvent),
}

async fn recv_exit(exit_rx: &mut Option<mpsc::UnboundedReceiver<ExitEvent>>) -> Option<ExitEvent> {
    match exit_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
