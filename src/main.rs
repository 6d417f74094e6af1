use anyhow::Result;
use clap::Parser;
use shelltabs::cli::{self, Cli, LineCommand};
use shelltabs::console::ConsoleDisplay;
use shelltabs::{TabNotification, TerminalSession};
use shelltabs_config::Config;
use shelltabs_supervisor::{LocalSupervisor, OutputChunk};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc;

/// PTY size handed to every shell (cols, rows)
const PTY_SIZE: (u16, u16) = (120, 40);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(shell) = &cli.shell {
        config.shell = Some(shell.clone());
    }
    if let Some(cwd) = &cli.cwd {
        config.working_directory = Some(cwd.clone());
    }
    config.validate()?;

    // CLI --log-level takes highest precedence, then RUST_LOG, then config
    shelltabs::debug::init_log_bridge(shelltabs::debug::resolve_level(
        cli.log_level,
        config.log_level,
    ));
    log::info!("Starting shelltabs {}", shelltabs::VERSION);

    let runtime = Runtime::new()?;
    let result = runtime.block_on(run(cli, config));

    log::info!("Driver exited, shutting down runtime");
    runtime.shutdown_timeout(Duration::from_secs(2));

    if let Err(ref e) = result {
        eprintln!("shelltabs: error: {e:#}");
    }
    result
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let session_id = cli
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<OutputChunk>();
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(LocalSupervisor::with_output(output_tx, PTY_SIZE.0, PTY_SIZE.1));
    let mut session =
        TerminalSession::new(session_id, config, supervisor, Handle::current(), notify_tx);

    for _ in 0..cli.tabs {
        open_tab(&mut session);
    }
    println!("shelltabs {} (type 'help' for commands)", shelltabs::VERSION);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match cli::parse_line(&line) {
                    Ok(Some(LineCommand::Quit)) => break,
                    Ok(Some(command)) => execute(&mut session, command),
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                }
            }
            _ = session.next_event() => {}
            Some(chunk) = output_rx.recv() => {
                session.deliver_output(&chunk.key, &chunk.data);
            }
            Some(notification) = notify_rx.recv() => report(notification),
        }
    }

    session.dispose();
    // Give the fire-and-forget kills a moment to reach the shells
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}

fn open_tab(session: &mut TerminalSession) {
    match session.add_tab() {
        Some(tab_id) => {
            session.attach_display(tab_id, Box::new(ConsoleDisplay::new(tab_id)));
        }
        None => eprintln!("tab limit reached"),
    }
}

fn execute(session: &mut TerminalSession, command: LineCommand) {
    match command {
        LineCommand::New => open_tab(session),
        LineCommand::Close(id) => {
            if !session.close_tab(id) {
                eprintln!("no tab {id}");
            }
        }
        LineCommand::CloseOthers(id) => {
            println!("closed {} tab(s)", session.close_other_tabs(id));
        }
        LineCommand::CloseLeft(id) => match session.context_menu(id) {
            Some(menu) if menu.close_left => {
                println!("closed {} tab(s)", session.close_tabs_to_left(id));
            }
            Some(_) => eprintln!("close-left is disabled for tab {id}"),
            None => eprintln!("no tab {id}"),
        },
        LineCommand::CloseRight(id) => match session.context_menu(id) {
            Some(menu) if menu.close_right => {
                println!("closed {} tab(s)", session.close_tabs_to_right(id));
            }
            Some(_) => eprintln!("close-right is disabled for tab {id}"),
            None => eprintln!("no tab {id}"),
        },
        LineCommand::Select(id) => {
            if session.tab(id).is_none() {
                eprintln!("no tab {id}");
            } else {
                session.select_tab(id);
                session.focus_active();
            }
        }
        LineCommand::Next => {
            session.select_next_tab();
        }
        LineCommand::Previous => {
            session.select_previous_tab();
        }
        LineCommand::Move { from, to } => {
            if !session.reorder_tabs(from, to) {
                eprintln!("cannot move {from} -> {to}");
            }
        }
        LineCommand::Retry(id) => {
            if !session.retry_tab(id) {
                eprintln!("tab {id} is not waiting for a retry");
            }
        }
        LineCommand::Rename(id, name) => {
            session.rename_tab(id, Some(name));
        }
        LineCommand::Send(id, text) => {
            let mut input = text.into_bytes();
            input.push(b'\r');
            session.handle_input(id, &input);
        }
        LineCommand::Search(query) => print_search(session.search_active(&query)),
        LineCommand::SearchNext => print_search(session.search_next()),
        LineCommand::SearchPrevious => print_search(session.search_previous()),
        LineCommand::Clear => session.clear_active(),
        LineCommand::Menu(id) => match session.context_menu(id) {
            Some(menu) => println!(
                "tab {}: close-others={} close-left={} close-right={} retry={}",
                menu.tab_id, menu.close_others, menu.close_left, menu.close_right, menu.retry
            ),
            None => eprintln!("no tab {id}"),
        },
        LineCommand::List => list_tabs(session),
        LineCommand::Help => println!("{}", cli::HELP),
        LineCommand::Quit => {}
    }
}

fn print_search(found: bool) {
    println!("{}", if found { "match" } else { "no match" });
}

fn list_tabs(session: &TerminalSession) {
    let active = session.active_tab_id();
    for (index, tab) in session.tabs().iter().enumerate() {
        let marker = if Some(tab.id) == active { '*' } else { ' ' };
        println!(
            "{marker} {index}: tab {} '{}' {} in {}",
            tab.id,
            tab.title(index + 1),
            tab.state(),
            tab.cwd.display()
        );
    }
}

fn report(notification: TabNotification) {
    match notification {
        TabNotification::SpawnFailed { tab_id, reason } => {
            eprintln!("tab {tab_id}: failed to start ({reason}); 'retry {tab_id}' to try again");
        }
        TabNotification::TabClosed { tab_id } => println!("tab {tab_id} closed"),
        other => log::debug!("{:?}", other),
    }
}
