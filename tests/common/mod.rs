//! Shared integration test helpers for shelltabs.
//!
//! This module provides a scripted process supervisor, a recording display
//! handle, and a session factory used across the `tests/` suite.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{Harness, FakeSupervisor};
//! ```
//!
//! Every request made to [`FakeSupervisor`] is recorded synchronously at
//! call time, so a test can assert on what was *issued* before anything is
//! resolved. Spawns stay pending until the test resolves them.

#![allow(dead_code)]

use parking_lot::Mutex;
use shelltabs::{DisplayHandle, TabId, TabNotification, TerminalSession};
use shelltabs_config::Config;
use shelltabs_supervisor::{
    ExitEvent, ProcessSupervisor, SpawnReply, SpawnRequest, SupervisorError, SupervisorFuture,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Session id used by every harness
pub const SESSION_ID: &str = "s";

/// How long a test waits for a session event before failing
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

type SpawnResult = Result<SpawnReply, SupervisorError>;
type KillResult = Result<bool, SupervisorError>;

/// What a pending spawn future does once the test answers it
enum Scripted {
    Reply(SpawnResult),
    Panic,
}

#[derive(Default)]
struct FakeState {
    spawns: Vec<SpawnRequest>,
    pending: Vec<Option<oneshot::Sender<Scripted>>>,
    kills: Vec<String>,
    kill_result: Option<KillResult>,
    writes: Vec<(String, Vec<u8>)>,
    exit_subscribers: Vec<mpsc::UnboundedSender<ExitEvent>>,
    subscriptions: usize,
}

/// A supervisor whose every answer is scripted by the test
#[derive(Default)]
pub struct FakeSupervisor {
    state: Mutex<FakeState>,
}

impl FakeSupervisor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every spawn request issued so far, in order
    pub fn spawns(&self) -> Vec<SpawnRequest> {
        self.state.lock().spawns.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.state.lock().spawns.len()
    }

    /// Complete the `index`-th spawn request
    pub fn resolve_spawn(&self, index: usize, result: SpawnResult) {
        self.answer(index, Scripted::Reply(result));
    }

    /// Make the `index`-th spawn future panic instead of answering
    pub fn panic_spawn(&self, index: usize) {
        self.answer(index, Scripted::Panic);
    }

    fn answer(&self, index: usize, scripted: Scripted) {
        let sender = self.state.lock().pending[index]
            .take()
            .expect("spawn already resolved");
        let _ = sender.send(scripted);
    }

    /// Complete the `index`-th spawn successfully with `pid`
    pub fn spawn_succeeds(&self, index: usize, pid: u32) {
        self.resolve_spawn(index, Ok(SpawnReply::started(pid)));
    }

    /// Abandon the `index`-th spawn without answering it
    pub fn drop_spawn(&self, index: usize) {
        self.state.lock().pending[index] = None;
    }

    /// Correlation keys passed to `kill`, in order
    pub fn kills(&self) -> Vec<String> {
        self.state.lock().kills.clone()
    }

    /// Make every later kill resolve to `result`
    pub fn set_kill_result(&self, result: KillResult) {
        self.state.lock().kill_result = Some(result);
    }

    pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    /// Broadcast an exit to every subscriber still listening
    pub fn emit_exit(&self, key: &str, exit_code: i32) {
        let mut state = self.state.lock();
        state.exit_subscribers.retain(|tx| {
            tx.send(ExitEvent {
                key: key.to_string(),
                exit_code,
            })
            .is_ok()
        });
    }

    /// Number of times `subscribe_exits` was called
    pub fn subscriptions(&self) -> usize {
        self.state.lock().subscriptions
    }

    /// Number of exit subscribers whose receiver is still alive
    pub fn live_subscribers(&self) -> usize {
        let mut state = self.state.lock();
        state.exit_subscribers.retain(|tx| !tx.is_closed());
        state.exit_subscribers.len()
    }
}

impl ProcessSupervisor for FakeSupervisor {
    fn spawn(&self, request: SpawnRequest) -> SupervisorFuture<SpawnReply> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        state.spawns.push(request);
        state.pending.push(Some(tx));
        Box::pin(async move {
            match rx.await {
                Ok(Scripted::Reply(result)) => result,
                Ok(Scripted::Panic) => panic!("supervisor spawn crashed"),
                Err(_) => Err(SupervisorError::Aborted("spawn abandoned".to_string())),
            }
        })
    }

    fn kill(&self, key: &str) -> SupervisorFuture<bool> {
        let mut state = self.state.lock();
        state.kills.push(key.to_string());
        let result = state.kill_result.clone().unwrap_or(Ok(true));
        Box::pin(async move { result })
    }

    fn write(&self, key: &str, data: &[u8]) -> SupervisorFuture<()> {
        self.state
            .lock()
            .writes
            .push((key.to_string(), data.to_vec()));
        Box::pin(async { Ok(()) })
    }

    fn subscribe_exits(&self) -> mpsc::UnboundedReceiver<ExitEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.exit_subscribers.push(tx);
        state.subscriptions += 1;
        rx
    }
}

/// What a [`RecordingDisplay`] has been asked to do
#[derive(Debug, Default)]
pub struct DisplayLog {
    pub written: Vec<u8>,
    pub focus_count: usize,
    pub clear_count: usize,
    pub searches: Vec<String>,
    pub search_steps: Vec<&'static str>,
}

impl DisplayLog {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

/// Display handle that records every call into a shared log
pub struct RecordingDisplay {
    log: Arc<Mutex<DisplayLog>>,
    search_result: bool,
}

impl RecordingDisplay {
    /// A display whose searches report `search_result`, plus its log
    pub fn new(search_result: bool) -> (Box<dyn DisplayHandle>, Arc<Mutex<DisplayLog>>) {
        let log = Arc::new(Mutex::new(DisplayLog::default()));
        let display = Self {
            log: Arc::clone(&log),
            search_result,
        };
        (Box::new(display), log)
    }
}

impl DisplayHandle for RecordingDisplay {
    fn write(&mut self, data: &[u8]) {
        self.log.lock().written.extend_from_slice(data);
    }

    fn focus(&mut self) {
        self.log.lock().focus_count += 1;
    }

    fn clear(&mut self) {
        self.log.lock().clear_count += 1;
    }

    fn search(&mut self, query: &str) -> bool {
        self.log.lock().searches.push(query.to_string());
        self.search_result
    }

    fn search_next(&mut self) -> bool {
        self.log.lock().search_steps.push("next");
        self.search_result
    }

    fn search_previous(&mut self) -> bool {
        self.log.lock().search_steps.push("previous");
        self.search_result
    }
}

/// A session wired to a [`FakeSupervisor`], plus its notification stream
pub struct Harness {
    pub session: TerminalSession,
    pub supervisor: Arc<FakeSupervisor>,
    pub notifications: mpsc::UnboundedReceiver<TabNotification>,
}

/// Config with a fixed shell and working directory so requests are predictable
pub fn test_config() -> Config {
    Config {
        shell: Some("/bin/zsh".to_string()),
        shell_args: Some("-l".to_string()),
        working_directory: Some(PathBuf::from("/work")),
        ..Config::default()
    }
}

impl Harness {
    /// Must be called from inside a tokio runtime
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let supervisor = FakeSupervisor::new();
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let session = TerminalSession::new(
            SESSION_ID,
            config,
            Arc::clone(&supervisor) as Arc<dyn ProcessSupervisor>,
            tokio::runtime::Handle::current(),
            notify_tx,
        );
        Self {
            session,
            supervisor,
            notifications,
        }
    }

    /// Open a tab and return its id
    pub fn add_tab(&mut self) -> TabId {
        self.session.add_tab().expect("tab should open")
    }

    /// Wait for the next session event and apply it
    pub async fn settle(&mut self) {
        tokio::time::timeout(EVENT_TIMEOUT, self.session.next_event())
            .await
            .expect("timed out waiting for a session event");
    }

    /// Open a tab and bring it to busy with `pid`
    pub async fn add_busy_tab(&mut self, pid: u32) -> TabId {
        let tab_id = self.add_tab();
        let index = self.supervisor.spawn_count() - 1;
        self.supervisor.spawn_succeeds(index, pid);
        self.settle().await;
        tab_id
    }

    /// Notifications received since the last drain
    pub fn drain(&mut self) -> Vec<TabNotification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            out.push(notification);
        }
        out
    }

    /// Let fire-and-forget tasks (kills, writes) run to completion
    pub async fn yield_tasks(&self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }
}

/// Correlation key for a tab in the harness session
pub fn key(tab_id: TabId) -> String {
    format!("{SESSION_ID}-terminal-{tab_id}")
}

/// Whether any notification mentions `tab_id` as changing pid or state
pub fn touches_process_state(notifications: &[TabNotification], tab_id: TabId) -> bool {
    notifications.iter().any(|n| {
        matches!(n,
            TabNotification::TabPidChanged { tab_id: id, .. }
            | TabNotification::TabStateChanged { tab_id: id, .. } if *id == tab_id)
    })
}
