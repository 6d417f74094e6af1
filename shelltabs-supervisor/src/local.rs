//! Local PTY-backed process supervisor.
//!
//! Each spawned shell gets its own pseudo-terminal. Two named threads are
//! started per process: one pumps PTY output into an optional channel, the
//! other blocks in `wait()` and broadcasts an [`ExitEvent`] to every live
//! subscriber once the shell terminates.

use crate::error::SupervisorError;
use crate::supervisor::{ExitEvent, ProcessSupervisor, SpawnReply, SpawnRequest, SupervisorFuture};
use parking_lot::Mutex;
use portable_pty::{ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Default PTY dimensions (cols, rows)
const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Bytes read from a shell's PTY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub key: String,
    pub data: Vec<u8>,
}

/// A shell the supervisor currently owns
struct LiveProcess {
    pid: u32,
    killer: Box<dyn ChildKiller + Send + Sync>,
    writer: Box<dyn Write + Send>,
    /// Held so the PTY stays open for the lifetime of the process
    _master: Box<dyn MasterPty + Send>,
}

struct Shared {
    processes: Mutex<HashMap<String, LiveProcess>>,
    exit_subscribers: Mutex<Vec<mpsc::UnboundedSender<ExitEvent>>>,
    output_tx: Option<mpsc::UnboundedSender<OutputChunk>>,
    size: (u16, u16),
}

impl Shared {
    fn broadcast_exit(&self, event: ExitEvent) {
        let mut subscribers = self.exit_subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        log::debug!(
            "Broadcast exit of '{}' (code {}) to {} subscriber(s)",
            event.key,
            event.exit_code,
            subscribers.len()
        );
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        for (key, process) in self.processes.get_mut().iter_mut() {
            log::info!("Supervisor shutting down, killing '{}' (pid {})", key, process.pid);
            if let Err(e) = process.killer.kill() {
                log::warn!("Failed to kill '{}' during shutdown: {}", key, e);
            }
        }
    }
}

/// Runs shells in local pseudo-terminals.
#[derive(Clone)]
pub struct LocalSupervisor {
    shared: Arc<Shared>,
}

impl LocalSupervisor {
    /// Create a supervisor that discards shell output
    pub fn new() -> Self {
        Self::build(None, DEFAULT_SIZE)
    }

    /// Create a supervisor that forwards shell output to `output_tx`
    ///
    /// # Arguments
    /// * `output_tx` - Receives every chunk read from any supervised PTY
    /// * `cols` / `rows` - Initial PTY dimensions
    pub fn with_output(output_tx: mpsc::UnboundedSender<OutputChunk>, cols: u16, rows: u16) -> Self {
        Self::build(Some(output_tx), (cols, rows))
    }

    fn build(output_tx: Option<mpsc::UnboundedSender<OutputChunk>>, size: (u16, u16)) -> Self {
        Self {
            shared: Arc::new(Shared {
                processes: Mutex::new(HashMap::new()),
                exit_subscribers: Mutex::new(Vec::new()),
                output_tx,
                size,
            }),
        }
    }

    /// Number of processes currently alive under this supervisor
    pub fn live_count(&self) -> usize {
        self.shared.processes.lock().len()
    }

    /// Number of exit subscribers still listening
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.shared.exit_subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl Default for LocalSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor for LocalSupervisor {
    fn spawn(&self, request: SpawnRequest) -> SupervisorFuture<SpawnReply> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || spawn_in_pty(&shared, request))
                .await
                .map_err(|e| SupervisorError::Aborted(e.to_string()))?
        })
    }

    fn kill(&self, key: &str) -> SupervisorFuture<bool> {
        let shared = Arc::clone(&self.shared);
        let key = key.to_string();
        Box::pin(async move {
            let mut processes = shared.processes.lock();
            let Some(process) = processes.get_mut(&key) else {
                log::debug!("Kill requested for '{}' but no process is live", key);
                return Ok(false);
            };
            log::info!("Killing '{}' (pid {})", key, process.pid);
            process
                .killer
                .kill()
                .map_err(|e| SupervisorError::Kill {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            Ok(true)
        })
    }

    fn write(&self, key: &str, data: &[u8]) -> SupervisorFuture<()> {
        let shared = Arc::clone(&self.shared);
        let key = key.to_string();
        let data = data.to_vec();
        Box::pin(async move {
            let mut processes = shared.processes.lock();
            let process = processes
                .get_mut(&key)
                .ok_or_else(|| SupervisorError::UnknownProcess(key.clone()))?;
            process
                .writer
                .write_all(&data)
                .and_then(|_| process.writer.flush())
                .map_err(|e| SupervisorError::Write {
                    key: key.clone(),
                    reason: e.to_string(),
                })
        })
    }

    fn subscribe_exits(&self) -> mpsc::UnboundedReceiver<ExitEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.exit_subscribers.lock().push(tx);
        rx
    }
}

/// Blocking half of [`LocalSupervisor::spawn`]
fn spawn_in_pty(shared: &Arc<Shared>, request: SpawnRequest) -> Result<SpawnReply, SupervisorError> {
    let args = match request.shell_args.as_deref() {
        Some(raw) => shell_words::split(raw).map_err(|e| SupervisorError::InvalidArgs {
            args: raw.to_string(),
            reason: e.to_string(),
        })?,
        None => Vec::new(),
    };

    log::info!(
        "Spawning '{}' for '{}' in {:?} with args {:?}",
        request.shell,
        request.key,
        request.cwd,
        args
    );

    let (cols, rows) = shared.size;
    let pair = native_pty_system()
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| SupervisorError::Spawn(format!("failed to open PTY: {e}")))?;

    let mut cmd = CommandBuilder::new(&request.shell);
    cmd.args(&args);
    cmd.cwd(&request.cwd);
    if let Some(env) = &request.shell_env {
        for (name, value) in env {
            cmd.env(name, value);
        }
    }

    let mut child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| SupervisorError::Spawn(e.to_string()))?;
    // The child holds its own copy; ours must close so the reader sees EOF on exit
    drop(pair.slave);

    let Some(pid) = child.process_id() else {
        let _ = child.kill();
        return Err(SupervisorError::Spawn(
            "spawned process reported no pid".to_string(),
        ));
    };

    let reader = match pair.master.try_clone_reader() {
        Ok(reader) => reader,
        Err(e) => {
            abandon_child(&request.key, pid, child.as_mut());
            return Err(SupervisorError::Spawn(format!(
                "failed to clone PTY reader: {e}"
            )));
        }
    };
    let writer = match pair.master.take_writer() {
        Ok(writer) => writer,
        Err(e) => {
            abandon_child(&request.key, pid, child.as_mut());
            return Err(SupervisorError::Spawn(format!(
                "failed to take PTY writer: {e}"
            )));
        }
    };

    {
        let mut processes = shared.processes.lock();
        let previous = processes.insert(
            request.key.clone(),
            LiveProcess {
                pid,
                killer: child.clone_killer(),
                writer,
                _master: pair.master,
            },
        );
        if let Some(mut previous) = previous {
            log::warn!(
                "'{}' was re-spawned while pid {} was still live; killing the old process",
                request.key,
                previous.pid
            );
            let _ = previous.killer.kill();
        }
    }

    if let Some(output_tx) = shared.output_tx.clone() {
        start_reader(request.key.clone(), reader, output_tx);
    }

    let weak = Arc::downgrade(shared);
    let key = request.key.clone();
    let waiter = std::thread::Builder::new()
        .name(format!("pty-wait-{key}"))
        .spawn(move || wait_for_exit(weak, key, pid, child));
    if let Err(e) = waiter {
        if let Some(mut process) = shared.processes.lock().remove(&request.key) {
            let _ = process.killer.kill();
        }
        return Err(SupervisorError::Spawn(format!(
            "failed to start exit watcher: {e}"
        )));
    }

    log::info!("Spawned '{}' with pid {}", request.key, pid);
    Ok(SpawnReply::started(pid))
}

/// Kill a shell that started but could not be wired up, so it never runs unowned
fn abandon_child(key: &str, pid: u32, child: &mut (dyn portable_pty::Child + Send + Sync)) {
    match child.kill() {
        Ok(()) => log::warn!("Killed half-started '{}' (pid {})", key, pid),
        Err(e) => log::error!("Failed to kill half-started '{}' (pid {}): {}", key, pid, e),
    }
}

fn start_reader(
    key: String,
    mut reader: Box<dyn Read + Send>,
    output_tx: mpsc::UnboundedSender<OutputChunk>,
) {
    let thread_name = format!("pty-read-{key}");
    let result = std::thread::Builder::new().name(thread_name).spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = OutputChunk {
                        key: key.clone(),
                        data: buf[..n].to_vec(),
                    };
                    if output_tx.send(chunk).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("PTY read for '{}' ended: {}", key, e);
                    break;
                }
            }
        }
    });
    if let Err(e) = result {
        log::warn!("Failed to start PTY reader thread: {}", e);
    }
}

fn wait_for_exit(
    shared: Weak<Shared>,
    key: String,
    pid: u32,
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
) {
    let exit_code = match child.wait() {
        Ok(status) => status.exit_code() as i32,
        Err(e) => {
            log::warn!("Waiting on '{}' (pid {}) failed: {}", key, pid, e);
            1
        }
    };
    log::info!("'{}' (pid {}) exited with code {}", key, pid, exit_code);

    let Some(shared) = shared.upgrade() else {
        return;
    };
    {
        let mut processes = shared.processes.lock();
        // A re-spawn may already have replaced this entry
        if processes.get(&key).is_some_and(|p| p.pid == pid) {
            processes.remove(&key);
        }
    }
    shared.broadcast_exit(ExitEvent { key, exit_code });
}
