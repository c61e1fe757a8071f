mod admin;
mod config;
mod events;
mod server;
mod telnet;
mod tracker;
mod tui;

use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use fgms::BROADCAST;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use admin::AdminHandle;
use config::ServerConfig;
use events::ServerEvent;
use server::{RelayServer, StartupError};
use tui::TuiState;

#[derive(Parser)]
#[command(name = "fgms")]
#[command(about = "FlightGear multiplayer relay server")]
struct Args {
    #[arg(short, long, help = "Read settings from an fgms.conf style file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Address to listen on")]
    bind: Option<String>,

    #[arg(short, long, help = "UDP port for pilot and relay traffic")]
    port: Option<u16>,

    #[arg(short = 'a', long, help = "TCP port of the status listing, 0 disables it")]
    telnet_port: Option<u16>,

    #[arg(short, long, help = "Out-of-reach distance in nautical miles")]
    out_of_reach: Option<f64>,

    #[arg(short = 't', long, help = "Seconds of silence before a pilot is dropped")]
    player_expires: Option<u64>,

    #[arg(long, help = "Seconds of silence before a relay is marked inactive")]
    relay_ttl: Option<u64>,

    #[arg(long, help = "Forward relay traffic to every other relay")]
    hub: bool,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = load_config(&args).unwrap_or_else(|e| fail(e));

    let runtime = tokio::runtime::Runtime::new()?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (server, admin) = runtime
        .block_on(RelayServer::start(config.clone(), events_tx))
        .unwrap_or_else(|e| fail(e));

    if args.headless {
        drop(events_rx);
        runtime.block_on(server.run());
        drop(admin);
    } else {
        let title = match server.local_addr() {
            Ok(addr) => format!("{} on {}", config.name, addr),
            Err(_) => config.name.clone(),
        };
        let task = runtime.spawn(server.run());
        run_with_tui(&admin, events_rx, &title)?;
        admin.shutdown();
        runtime.block_on(task)?;
    }

    Ok(())
}

fn fail(err: StartupError) -> ! {
    log::error!("{}", err);
    eprintln!("fgms: {}", err);
    process::exit(err.exit_code());
}

fn load_config(args: &Args) -> Result<ServerConfig, StartupError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(port) = args.telnet_port {
        config.telnet_port = port;
    }
    if let Some(nm) = args.out_of_reach {
        config.out_of_reach_nm = nm;
    }
    if let Some(secs) = args.player_expires {
        config.player_expires = Duration::from_secs(secs);
    }
    if let Some(secs) = args.relay_ttl {
        config.relay_ttl = Duration::from_secs(secs);
    }
    if args.hub {
        config.hub = true;
    }

    Ok(config)
}

fn run_with_tui(
    admin: &AdminHandle,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    name: &str,
) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut tui_state = TuiState::new();
    let mut running = true;

    while running {
        while let Ok(event) = events.try_recv() {
            tui_state.log(event.severity(), event.to_string());
        }

        let Ok(snapshot) = admin.blocking_snapshot() else {
            break;
        };
        tui_state.clamp_selection(&snapshot);

        if let Some(selector) = tui_state.take_pending_delete() {
            match admin.blocking_delete_blacklist(selector) {
                Ok(Some(entry)) => {
                    tui_state.log_info(format!("Removed {} from blacklist", entry.addr))
                }
                Ok(None) => tui_state.log_warn(format!("No blacklist entry {}", selector)),
                Err(e) => tui_state.log_error(e.to_string()),
            }
        }

        terminal.draw(|frame| {
            tui::render(frame, &tui_state, name, &snapshot);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && tui_state.is_typing() {
                    match key.code {
                        KeyCode::Esc => tui_state.cancel_message(),
                        KeyCode::Enter => {
                            if let Some(text) = tui_state.submit_message() {
                                match admin.say(BROADCAST, text.clone()) {
                                    Ok(()) => tui_state.log_info(format!("Broadcast: {}", text)),
                                    Err(e) => tui_state.log_error(e.to_string()),
                                }
                            }
                        }
                        KeyCode::Backspace => tui_state.backspace(),
                        KeyCode::Char(c) => tui_state.type_char(c),
                        _ => {}
                    }
                } else if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => running = false,
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            running = false
                        }
                        KeyCode::Tab => tui_state.next_tab(),
                        KeyCode::BackTab => tui_state.prev_tab(),
                        KeyCode::PageUp => tui_state.scroll_up(),
                        KeyCode::PageDown => tui_state.scroll_down(),
                        KeyCode::End => tui_state.scroll_to_bottom(),
                        KeyCode::Up => tui_state.select_prev(),
                        KeyCode::Down => tui_state.select_next(tui_state.list_len(&snapshot)),
                        KeyCode::Char('d') | KeyCode::Char('D') => {
                            if tui_state.active_tab() == tui::Tab::Blacklist {
                                tui_state.request_delete(&snapshot);
                            }
                        }
                        KeyCode::Char('m') | KeyCode::Char('M') => tui_state.open_message(),
                        _ => {}
                    }
                }
            }
        }
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
