//! splitterm - split-pane terminal multiplexer
//!
//! splitterm runs one shell per pane on a Unix pseudo-terminal and lays the
//! panes out side by side or stacked inside a single host terminal.
//!
//! # Quick Start
//!
//! ```text
//! splitterm                 # Start with $SHELL (or /bin/sh)
//! splitterm -s /bin/zsh     # Start with a specific shell
//! ```
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+] | Split vertically (new pane on the right) |
//! | Ctrl+\ | Split horizontally (new pane below) |
//! | Ctrl+T | Focus next pane |
//! | Ctrl+G | Open the command console |

mod commands;
mod config;
mod core;
mod ui;
mod wm;

#[cfg(test)]
mod test_utils;

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{Config, Hotkeys};
use crate::core::pty::{resolve_shell, PtySpawner};
use crate::ui::{CrosstermInput, LineConsole, TermSurface};
use crate::wm::Multiplexer;

/// Command line options
#[derive(Debug, Default)]
struct Args {
    /// Shell command, overrides the config file
    shell: Option<String>,
    /// Alternate config file
    config: Option<PathBuf>,
    /// Alternate log file
    log: Option<PathBuf>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter
const LOG_ENV: &str = "SPLITTERM_LOG";

fn print_version() {
    eprintln!("splitterm {}", VERSION);
}

fn print_help() {
    eprintln!("splitterm {} - split-pane terminal multiplexer", VERSION);
    eprintln!();
    eprintln!("Usage: splitterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --shell <CMD>     Shell for new panes (default: $SHELL, else /bin/sh)");
    eprintln!("  -c, --config <FILE>   Config file (default: ~/.splitterm/config.toml)");
    eprintln!("      --log <FILE>      Log file (default: ~/.splitterm/splitterm.log)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keybindings (configurable under [keys]):");
    eprintln!("  Ctrl+]                Split vertically (new pane on the right)");
    eprintln!("  Ctrl+\\                Split horizontally (new pane below)");
    eprintln!("  Ctrl+T                Focus next pane");
    eprintln!("  Ctrl+G                Open the command console");
    eprintln!();
    eprintln!("Console commands: quit, hsplit, vsplit, help, cycle [index]");
    eprintln!();
    eprintln!("Log level: {}=debug|info|warn|error", LOG_ENV);
    eprintln!();
    eprintln!("Exit: type 'exit' in every pane, or 'quit' in the console");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing argument for {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--shell" => {
                i += 1;
                parsed.shell = Some(value(i, "--shell")?);
            }
            "-c" | "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(value(i, "--config")?));
            }
            "--log" => {
                i += 1;
                parsed.log = Some(PathBuf::from(value(i, "--log")?));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Install the file logger. The file is truncated on every start.
fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
            return;
        }
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let (config, config_error) = match Config::load(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let log_path = args.log.clone().unwrap_or_else(|| config.log_path());
    init_logging(&log_path);
    info!("splitterm {} starting...", VERSION);
    if let Some(e) = config_error {
        warn!(error = %e, "config not loaded, using defaults");
    }

    // Command line overrides the config file
    let shell = resolve_shell(args.shell.as_deref().or(config.shell.as_deref()));
    info!(%shell, "shell selected");

    let hotkeys = Hotkeys::from_config(&config.keys).context("invalid [keys] configuration")?;

    if let Err(e) = run(&config, &shell, hotkeys) {
        error!(error = ?e, "splitterm failed");
        return Err(e);
    }
    info!("splitterm exited");
    Ok(())
}

/// Set up the host terminal and drive the multiplexer until it stops
fn run(config: &Config, shell: &str, hotkeys: Hotkeys) -> anyhow::Result<()> {
    let (cols, rows) = TermSurface::<io::Stdout>::size().context("cannot query terminal size")?;
    info!(cols, rows, "host terminal");

    let mut surface = TermSurface::new(
        io::stdout(),
        config.pane.border_inactive,
        config.pane.border_active,
    );
    surface.init().context("cannot initialize terminal")?;

    let spawner = PtySpawner::new(Some(shell));
    let mut mux = Multiplexer::new(
        Box::new(spawner),
        surface,
        (cols, rows),
        hotkeys,
        config.read_chunk,
    )
    .context("cannot start first pane")?;

    let mut keys = CrosstermInput::new(config.poll_timeout());
    let mut console = LineConsole::new(io::stdout(), rows.saturating_sub(1), cols);

    while mux.is_running() {
        mux.tick(&mut keys, &mut console)?;
    }
    info!("session ended");
    Ok(())
}
