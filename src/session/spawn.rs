//! Spawn coordination: issuing shell launches and judging their results
//!
//! Every spawn carries a generation number. A result is applied only when the
//! tab still exists, is still idle, and its outstanding generation matches the
//! one the result was issued under. Closing a tab, an exit notification, or a
//! resolution all retire the outstanding generation, so anything arriving
//! afterwards is recognised as stale.

use super::{SessionEvent, TabNotification, TerminalSession};
use crate::tab::{TabId, TabState, correlation_key};
use futures::FutureExt;
use shelltabs_supervisor::{SpawnReply, SpawnRequest, SupervisorError};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Exit code recorded for a tab whose shell never started
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

/// An in-flight spawn for one tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSpawn {
    generation: u64,
}

/// How a resolved spawn relates to current registry truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The result belongs to the tab's outstanding spawn
    Current,
    /// The tab moved on (exited, re-spawned) but still exists
    Stale,
    /// The tab no longer exists
    Orphaned,
}

/// Bookkeeping for outstanding spawns and the requests that launched each tab
#[derive(Debug, Default)]
pub(crate) struct SpawnCoordinator {
    pending: HashMap<TabId, PendingSpawn>,
    /// Last request issued per tab, reused verbatim by retry
    launches: HashMap<TabId, SpawnRequest>,
    next_generation: u64,
}

impl SpawnCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a spawn is outstanding for `tab_id`
    pub fn is_pending(&self, tab_id: TabId) -> bool {
        self.pending.contains_key(&tab_id)
    }

    /// Record a new outstanding spawn and return its generation
    pub fn begin(&mut self, tab_id: TabId, request: SpawnRequest) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(tab_id, PendingSpawn { generation });
        self.launches.insert(tab_id, request);
        generation
    }

    /// Retire the outstanding spawn for `tab_id` and classify a result.
    ///
    /// `tab_state` is the tab's current state, `None` when the tab is gone.
    pub fn resolve(&mut self, tab_id: TabId, generation: u64, tab_state: Option<TabState>) -> Verdict {
        let Some(state) = tab_state else {
            self.pending.remove(&tab_id);
            return Verdict::Orphaned;
        };
        let matches = self
            .pending
            .get(&tab_id)
            .is_some_and(|p| p.generation == generation);
        if !matches {
            return Verdict::Stale;
        }
        self.pending.remove(&tab_id);
        if state.is_idle() {
            Verdict::Current
        } else {
            Verdict::Stale
        }
    }

    /// Drop the outstanding spawn for a tab that exited
    pub fn forget_pending(&mut self, tab_id: TabId) {
        self.pending.remove(&tab_id);
    }

    /// Drop everything known about a tab that closed
    pub fn forget(&mut self, tab_id: TabId) {
        self.pending.remove(&tab_id);
        self.launches.remove(&tab_id);
    }

    /// The request that last launched `tab_id`
    pub fn launch_for(&self, tab_id: TabId) -> Option<&SpawnRequest> {
        self.launches.get(&tab_id)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.launches.clear();
    }
}

impl TerminalSession {
    /// Issue exactly one spawn for every idle tab that has none outstanding.
    ///
    /// Idempotent: calling it again before results arrive issues nothing.
    /// Returns the number of spawns issued.
    pub fn reconcile(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let needing: Vec<(TabId, SpawnRequest)> = self
            .registry
            .tabs()
            .iter()
            .filter(|tab| tab.state().is_idle() && !self.spawner.is_pending(tab.id))
            .map(|tab| (tab.id, self.request_for(tab.id, tab.shell.clone(), tab.cwd.clone())))
            .collect();

        let issued = needing.len();
        for (tab_id, request) in needing {
            self.dispatch_spawn(tab_id, request);
        }
        issued
    }

    /// Re-issue the original spawn request for a tab whose shell failed to start.
    ///
    /// Only permitted while the tab is exited. Returns true if a spawn was issued.
    pub fn retry_tab(&mut self, tab_id: TabId) -> bool {
        if self.disposed {
            return false;
        }
        let Some(tab) = self.registry.get(tab_id) else {
            return false;
        };
        if !tab.state().is_exited() {
            log::debug!("Retry ignored for tab {} in state {}", tab_id, tab.state());
            return false;
        }
        let request = match self.spawner.launch_for(tab_id) {
            Some(request) => request.clone(),
            None => self.request_for(tab_id, tab.shell.clone(), tab.cwd.clone()),
        };

        log::info!("Retrying spawn for tab {}", tab_id);
        self.set_tab_state(tab_id, TabState::Idle);
        self.dispatch_spawn(tab_id, request);
        true
    }

    fn request_for(&self, tab_id: TabId, shell: String, cwd: std::path::PathBuf) -> SpawnRequest {
        SpawnRequest {
            key: correlation_key(&self.session_id, tab_id),
            cwd,
            shell,
            shell_args: self.config.shell_args.clone(),
            shell_env: self.config.shell_env_or_none(),
        }
    }

    /// Hand a request to the supervisor and route its result back as an event
    fn dispatch_spawn(&mut self, tab_id: TabId, request: SpawnRequest) {
        log::info!("Spawning shell for tab {} as '{}'", tab_id, request.key);
        let generation = self.spawner.begin(tab_id, request.clone());

        let key = request.key.clone();
        let reply = self.supervisor.spawn(request);
        let supervisor = Arc::clone(&self.supervisor);
        let events_tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = match AssertUnwindSafe(reply).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(SupervisorError::Aborted(
                    "spawn request panicked".to_string(),
                )),
            };
            let reclaim = matches!(&result, Ok(reply) if reply.success && reply.pid != 0);
            let sent = events_tx.send(SessionEvent::SpawnResolved {
                tab_id,
                generation,
                result,
            });
            // The session is gone, so nobody else can reclaim this shell
            if sent.is_err() && reclaim {
                log::info!("Reclaiming '{}' spawned after its session was dropped", key);
                if let Err(e) = supervisor.kill(&key).await {
                    log::warn!("Kill of '{}' failed: {}", key, e);
                }
            }
        });
    }

    /// Apply or discard a resolved spawn
    pub(super) fn on_spawn_resolved(
        &mut self,
        tab_id: TabId,
        generation: u64,
        result: Result<SpawnReply, SupervisorError>,
    ) {
        let state = self.registry.get(tab_id).map(|tab| tab.state());
        match self.spawner.resolve(tab_id, generation, state) {
            Verdict::Current => {}
            Verdict::Stale => {
                log::debug!(
                    "Discarding stale spawn result for tab {} (generation {})",
                    tab_id,
                    generation
                );
                return;
            }
            Verdict::Orphaned => {
                log::debug!("Spawn resolved for closed tab {}", tab_id);
                if let Ok(reply) = &result
                    && reply.success
                    && reply.pid != 0
                {
                    log::info!(
                        "Reclaiming orphaned process {} of closed tab {}",
                        reply.pid,
                        tab_id
                    );
                    self.issue_kill(correlation_key(&self.session_id, tab_id));
                }
                return;
            }
        }

        match result {
            Ok(reply) if reply.success && reply.pid != 0 => {
                log::info!("Tab {} attached to pid {}", tab_id, reply.pid);
                if self.registry.update_pid(tab_id, reply.pid) {
                    self.notify(TabNotification::TabPidChanged {
                        tab_id,
                        pid: reply.pid,
                    });
                    self.notify(TabNotification::TabStateChanged {
                        tab_id,
                        state: TabState::Busy { pid: reply.pid },
                    });
                }
            }
            Ok(_) => self.fail_spawn(tab_id, "supervisor reported failure".to_string()),
            Err(e) => self.fail_spawn(tab_id, e.to_string()),
        }
    }

    fn fail_spawn(&mut self, tab_id: TabId, reason: String) {
        log::error!("Failed to start shell for tab {}: {}", tab_id, reason);
        self.set_tab_state(
            tab_id,
            TabState::Exited {
                exit_code: SPAWN_FAILURE_EXIT_CODE,
            },
        );
        self.notify(TabNotification::SpawnFailed { tab_id, reason });
    }
}
