//! Debug log bridge for shelltabs
//!
//! Routes the `log` facade into a debug file so diagnostics never interleave
//! with shell output on the controlling terminal.
//!
//! All output goes to /tmp/shelltabs_debug.log on Unix/macOS,
//! or %TEMP%\shelltabs_debug.log on Windows.
//! When `RUST_LOG` is set, records are mirrored to stderr as well.
//!
//! Level precedence: explicit CLI level, then `RUST_LOG`, then the config file.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use shelltabs_config::LogLevel;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// File name of the debug log inside the temp directory
const LOG_FILE_NAME: &str = "shelltabs_debug.log";

/// Path the debug log is written to
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    let path = PathBuf::from("/tmp").join(LOG_FILE_NAME);
    #[cfg(not(unix))]
    let path = std::env::temp_dir().join(LOG_FILE_NAME);
    path
}

struct DebugLogger {
    level: LevelFilter,
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn write_line(&self, line: &str) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_line(&format!(
            "[{}] [{:<5}] [{}] {}\n",
            Local::now().format("%H:%M:%S%.6f"),
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Pick the effective level: CLI override, then `RUST_LOG`, then config
pub fn resolve_level(cli: Option<LogLevel>, config: LogLevel) -> LevelFilter {
    if let Some(level) = cli {
        return level.to_level_filter();
    }
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| LogLevel::from_name(raw.trim()))
        .unwrap_or(config)
        .to_level_filter()
}

static LOGGER: OnceLock<DebugLogger> = OnceLock::new();

/// Install the debug logger as the global `log` backend.
///
/// Only the first call installs anything. A log file that cannot be opened
/// leaves only the stderr mirror active.
pub fn init_log_bridge(level: LevelFilter) {
    if LOGGER.get().is_some() {
        return;
    }
    let logger = LOGGER.get_or_init(|| {
        let file = if level == LevelFilter::Off {
            None
        } else {
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .create(true)
                .open(log_path())
                .ok()
        };
        DebugLogger {
            level,
            file: Mutex::new(file),
            mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
        }
    });
    logger.write_line(&format!(
        "{}\nshelltabs debug session started at {} (level={})\n{}\n",
        "=".repeat(80),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        logger.level,
        "=".repeat(80)
    ));

    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.level);
    }
}
