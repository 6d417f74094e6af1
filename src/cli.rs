//! Command-line interface for shelltabs.
//!
//! Two layers: process arguments parsed with clap, and the line commands the
//! interactive driver reads from stdin.

use clap::Parser;
use shelltabs_config::LogLevel;
use std::path::PathBuf;

/// shelltabs - drive a set of shell tabs from the command line
#[derive(Parser, Debug)]
#[command(name = "shelltabs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Shell program for new tabs (overrides config)
    #[arg(long, value_name = "SHELL")]
    pub shell: Option<String>,

    /// Working directory for new tabs (overrides config)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Number of tabs to open at startup
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub tabs: usize,

    /// Session id used to build process correlation keys (default: random)
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// Debug log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

fn parse_log_level(raw: &str) -> Result<LogLevel, String> {
    LogLevel::from_name(raw).ok_or_else(|| format!("unknown log level '{raw}'"))
}

/// One line typed into the interactive driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    New,
    Close(u64),
    CloseOthers(u64),
    CloseLeft(u64),
    CloseRight(u64),
    Select(u64),
    Next,
    Previous,
    Move { from: usize, to: usize },
    Retry(u64),
    Rename(u64, String),
    Send(u64, String),
    Search(String),
    SearchNext,
    SearchPrevious,
    Clear,
    Menu(u64),
    List,
    Help,
    Quit,
}

/// Help text printed by the `help` command
pub const HELP: &str = "\
commands:
  new                     open a tab
  close N                 close tab N
  close-others N          close every tab except N
  close-left N            close tabs left of N
  close-right N           close tabs right of N
  select N | next | prev  change the active tab
  move FROM TO            move the tab at index FROM to index TO
  retry N                 relaunch a tab whose shell failed to start
  rename N [NAME]         label tab N (no name resets it)
  send N TEXT             type TEXT plus Enter into tab N
  search TEXT | sn | sp   search the active tab's output
  clear                   clear the active tab's output
  menu N                  show which close actions apply to tab N
  list                    show all tabs
  quit                    close everything and exit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "new" => LineCommand::New,
        "close" => LineCommand::Close(tab_arg(rest)?),
        "close-others" => LineCommand::CloseOthers(tab_arg(rest)?),
        "close-left" => LineCommand::CloseLeft(tab_arg(rest)?),
        "close-right" => LineCommand::CloseRight(tab_arg(rest)?),
        "select" => LineCommand::Select(tab_arg(rest)?),
        "next" => LineCommand::Next,
        "prev" => LineCommand::Previous,
        "move" => {
            let mut parts = rest.split_whitespace();
            let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err("usage: move FROM TO".to_string());
            };
            LineCommand::Move {
                from: index_arg(from)?,
                to: index_arg(to)?,
            }
        }
        "retry" => LineCommand::Retry(tab_arg(rest)?),
        "rename" => {
            let (id, name) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            LineCommand::Rename(tab_arg(id)?, name.trim().to_string())
        }
        "send" => {
            let Some((id, text)) = rest.split_once(char::is_whitespace) else {
                return Err("usage: send N TEXT".to_string());
            };
            LineCommand::Send(tab_arg(id)?, text.to_string())
        }
        "search" if !rest.is_empty() => LineCommand::Search(rest.to_string()),
        "search" => return Err("usage: search TEXT".to_string()),
        "sn" => LineCommand::SearchNext,
        "sp" => LineCommand::SearchPrevious,
        "clear" => LineCommand::Clear,
        "menu" => LineCommand::Menu(tab_arg(rest)?),
        "list" | "ls" => LineCommand::List,
        "help" | "?" => LineCommand::Help,
        "quit" | "exit" => LineCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn tab_arg(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("expected a tab id, got '{}'", raw.trim()))
}

fn index_arg(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("expected an index, got '{raw}'"))
}
