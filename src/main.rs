//! termguard - interactive demo of the session-safe terminal protocol
//!
//! Opens a session on the real terminal, draws a bordered window and echoes
//! decoded keys until `q` is pressed. With `--dry-run` a fixed program is
//! validated and run against the recording terminal instead, and the
//! resulting terminal calls are printed.
//!
//! # Quick Start
//!
//! ```text
//! termguard              # Interactive demo
//! termguard --strict     # Reject duplicate window/color names
//! termguard --dry-run    # Print the terminal calls of the demo program
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use termguard::backend::{Console, MockTerminal};
use termguard::config::Config;
use termguard::core::input::{Key, PollKeys};
use termguard::core::program::{Program, ProgramBuilder};
use termguard::core::types::{Attribute, Border, Color, Position, Size};
use termguard::runtime::{Interpreter, Session};

/// Command line options
#[derive(Default)]
struct Options {
    /// Config file given with --config
    config_path: Option<PathBuf>,
    /// Force the unique-name policy
    strict: bool,
    /// Run against the recording terminal
    dry_run: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("termguard {}", VERSION);
}

fn print_help() {
    eprintln!("termguard {} - Session-safe terminal command demo", VERSION);
    eprintln!();
    eprintln!("Usage: termguard [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>       Read settings from PATH");
    eprintln!("  --strict              Reject duplicate window and color names");
    eprintln!("  --dry-run             Print terminal calls instead of drawing");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Demo keys:");
    eprintln!("  q                     Quit");
    eprintln!("  (any other key)       Show its decoded value");
    eprintln!();
    eprintln!("Configuration: ~/.termguard/config.toml");
    eprintln!("Log file:      ~/.termguard/termguard.log");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

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
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config path".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            "--strict" => options.strict = true,
            "--dry-run" => options.dry_run = true,
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Send tracing output to the log file; stdout belongs to the demo.
fn init_logging(config: &Config) {
    let log_path = Config::config_dir()
        .map(|dir| dir.join("termguard.log"))
        .unwrap_or_else(|| PathBuf::from("termguard.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if options.strict {
        config.session.unique_names = true;
    }

    init_logging(&config);
    info!("termguard {} starting", VERSION);

    if options.dry_run {
        dry_run(&config)
    } else {
        run_demo(&config)
    }
}

/// The demo screen as a validated program.
fn demo_program(config: &Config) -> anyhow::Result<Program> {
    let builder = ProgramBuilder::new()
        .init_with(config.session_options())
        .set_cursor(config.session.cursor)
        .add_color("title", Color::Black, Color::Cyan)?
        .add_color("frame", Color::Cyan, Color::Black)?;
    let title = builder.color("title")?;
    let frame = builder.color("frame")?;

    let program = builder
        .set_attr(Attribute::Color(title))?
        .put_str(" termguard demo - press q to quit ")
        .set_attr(Attribute::Normal)?
        .add_window(
            "keys",
            Position::new(2, 2),
            Size::new(5, 40),
            Some(Border::colored(config.border_glyphs(), frame)),
        )?
        .set_window("keys")?
        .move_to(Position::new(1, 2))
        .put_str("Waiting for keys...")
        .refresh()
        .deinit()
        .build();
    Ok(program)
}

fn dry_run(config: &Config) -> anyhow::Result<()> {
    let program = demo_program(config)?;
    let mut interp = Interpreter::new(MockTerminal::default());
    interp
        .run(&program)
        .context("demo program failed on the recording terminal")?;

    for (i, call) in interp.terminal().calls().iter().enumerate() {
        println!("{:3}  {:?}", i, call);
    }
    Ok(())
}

fn describe(key: Key) -> String {
    match key {
        Key::Char(c) if c.is_control() => format!("control 0x{:02x}", c as u32),
        Key::Char(c) => format!("char '{}'", c),
        Key::Special(k) => format!("key {:?}", k),
    }
}

fn run_demo(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::init_with(Console::stdout(), config.session_options())
        .context("failed to start terminal session")?;

    session.set_cursor(config.session.cursor)?;
    let title = session.add_color("title", Color::Black, Color::Cyan)?;
    let frame = session.add_color("frame", Color::Cyan, Color::Black)?;

    session.set_attr(Attribute::Color(title))?;
    session.put_str(" termguard demo - press q to quit ")?;
    session.set_attr(Attribute::Normal)?;
    session.refresh()?;

    let screen = session.get_size()?;
    let size = Size::new(5, screen.cols.saturating_sub(4).clamp(10, 40));
    session.add_window(
        "keys",
        Position::new(2, 2),
        size,
        Some(Border::colored(config.border_glyphs(), frame)),
    )?;
    session.set_window("keys")?;
    session.set_no_delay(true)?;
    session.move_to(Position::new(1, 2))?;
    session.put_str("Waiting for keys...")?;
    session.refresh()?;

    let width = size.cols.saturating_sub(4) as usize;
    loop {
        match session.read::<PollKeys>()? {
            Some(Key::Char('q')) => break,
            Some(key) => {
                info!("Key: {:?}", key);
                let text: String = describe(key).chars().take(width).collect();
                session.move_to(Position::new(1, 2))?;
                session.put_str(&format!("{:<width$}", text, width = width))?;
                session.refresh()?;
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    if let Err(e) = session.deinit() {
        warn!("Session did not close cleanly: {}", e);
        return Err(e.into());
    }
    info!("termguard exiting");
    Ok(())
}
