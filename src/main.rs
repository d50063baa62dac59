//! Synheart Break Agent CLI
//!
//! Activity-aware break and blink reminders.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Sender};
use std::io::BufRead;
use std::thread;
use synheart_break_agent::{
    collector::check_permission,
    config::{Config, SourceConfig},
    hub::{MonitorHandle, MonitorService},
    OverlayMode, StressSnapshot, PRIVACY_DECLARATION, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-break")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Activity-aware break and blink reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring input activity
    Start {
        /// Input sources to capture (keyboard, mouse, or all)
        #[arg(long)]
        sources: Option<String>,

        /// Shortest gap between blink reminders, in minutes
        #[arg(long)]
        blink_min: Option<f64>,

        /// Longest gap between blink reminders, in minutes
        #[arg(long)]
        blink_max: Option<f64>,

        /// Disable blink reminders for this session
        #[arg(long)]
        no_blink: bool,
    },

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config {
        /// Overwrite the config file with defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Commands accepted on stdin while the agent runs.
#[derive(Debug, PartialEq)]
enum Console {
    Break,
    Skip,
    Snooze,
    Blink(bool),
    Status,
    Help,
    Quit,
}

impl Console {
    fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_lowercase);
        let command = words.next()?;
        match (command.as_str(), words.next().as_deref()) {
            ("break", None) => Some(Self::Break),
            ("skip", None) => Some(Self::Skip),
            ("snooze", None) => Some(Self::Snooze),
            ("blink", Some("on")) => Some(Self::Blink(true)),
            ("blink", Some("off")) => Some(Self::Blink(false)),
            ("status", None) => Some(Self::Status),
            ("help", None) | ("?", None) => Some(Self::Help),
            ("quit", None) | ("exit", None) => Some(Self::Quit),
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config, using defaults: {e}");
            Config::default()
        }
    };
    init_logging(&config.log_filter);

    match cli.command {
        Commands::Start {
            sources,
            blink_min,
            blink_max,
            no_blink,
        } => cmd_start(config, sources, blink_min, blink_max, no_blink),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config { reset } => cmd_config(config, reset),
    }
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_start(
    mut config: Config,
    sources: Option<String>,
    blink_min: Option<f64>,
    blink_max: Option<f64>,
    no_blink: bool,
) -> Result<()> {
    println!("Synheart Break Agent v{VERSION}");
    println!();

    if !check_permission() {
        eprintln!("To grant permission:");
        eprintln!("1. Open System Settings > Privacy & Security");
        eprintln!("2. Select 'Input Monitoring'");
        eprintln!("3. Add this application to the allowed list");
        eprintln!("4. Restart the application");
        bail!("Input Monitoring permission not granted");
    }

    if let Some(sources) = sources {
        config.sources = SourceConfig::from_csv(&sources);
    }
    if !config.sources.any_enabled() {
        bail!("At least one source must be enabled (keyboard or mouse)");
    }
    if let Some(min) = blink_min {
        config.blink.min_minutes = min;
    }
    if let Some(max) = blink_max {
        config.blink.max_minutes = max;
    }
    if no_blink {
        config.blink.enabled = false;
    }
    config.blink = config.blink.clamped();

    println!("Starting monitor...");
    println!("  Keyboard: {}", enabled_label(config.sources.keyboard));
    println!("  Mouse: {}", enabled_label(config.sources.mouse));
    println!("  Break length: {}s", config.break_duration.as_secs());
    if config.blink.enabled {
        println!(
            "  Blink reminders: every {}-{} min",
            config.blink.min_minutes, config.blink.max_minutes
        );
    } else {
        println!("  Blink reminders: disabled");
    }
    println!();
    println!("Commands: break, skip, snooze, blink on|off, status, quit");
    println!("Press Ctrl+C to stop");
    println!();

    let mut blink = config.blink;
    let mut service = MonitorService::new(config).with_collector();
    let handle = service.handle();
    spawn_printers(&handle);

    let (console_tx, console_rx) = unbounded();
    let quit = console_tx.clone();
    ctrlc::set_handler(move || {
        let _ = quit.send(Console::Quit);
    })
    .context("Error setting Ctrl+C handler")?;
    spawn_stdin_reader(console_tx);

    service.start().context("Error starting monitor")?;

    for command in console_rx.iter() {
        let result = match command {
            Console::Quit => break,
            Console::Break => handle.request_break(),
            Console::Skip => handle.skip_blink(),
            Console::Snooze => handle.snooze_blink(),
            Console::Blink(enabled) => {
                blink.enabled = enabled;
                handle.set_blink_config(blink).map(|effective| {
                    println!("Blink reminders {}", enabled_label(effective.enabled));
                    blink = effective;
                })
            }
            Console::Status => handle.snapshot().map(|snapshot| print_status(&snapshot)),
            Console::Help => {
                println!("Commands: break, skip, snooze, blink on|off, status, quit");
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("Error: {e}");
            break;
        }
    }

    println!();
    println!("Stopping monitor...");
    service.stop();

    println!();
    println!("{}", service.transparency().summary());
    Ok(())
}

/// Print overlay changes and toasts as they arrive; snapshots go to the log.
fn spawn_printers(handle: &MonitorHandle) {
    let overlays = handle.subscribe_overlay();
    thread::spawn(move || {
        let mut previous = OverlayMode::Normal;
        for overlay in overlays.receiver().iter() {
            if overlay.mode == previous {
                continue;
            }
            previous = overlay.mode;
            match overlay.mode {
                OverlayMode::Break => {
                    if let Some(ends) = overlay.break_ends_at {
                        println!(
                            "[{}] Break time. Breathe and rest until {}",
                            chrono::Utc::now().format("%H:%M:%S"),
                            ends.format("%H:%M:%S")
                        );
                    }
                }
                OverlayMode::Blink => {
                    println!(
                        "[{}] Blink slowly a few times (type 'skip' or 'snooze')",
                        chrono::Utc::now().format("%H:%M:%S")
                    );
                }
                OverlayMode::Normal => {
                    println!("[{}] Back to work", chrono::Utc::now().format("%H:%M:%S"));
                }
            }
        }
    });

    let toasts = handle.subscribe_toasts();
    thread::spawn(move || {
        for toast in toasts.receiver().iter() {
            println!(
                "[{}] {}",
                chrono::Utc::now().format("%H:%M:%S"),
                toast.message
            );
        }
    });

    let snapshots = handle.subscribe_snapshots();
    thread::spawn(move || {
        for snapshot in snapshots.receiver().iter() {
            tracing::debug!(
                kpm = snapshot.kpm,
                mouse = snapshot.mouse_distance_per_min,
                stress = snapshot.stress_level,
                energy = snapshot.energy,
                "snapshot"
            );
        }
    });
}

fn spawn_stdin_reader(commands: Sender<Console>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match Console::parse(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => eprintln!("Unknown command: {}", line.trim()),
            }
        }
    });
}

fn print_status(snapshot: &StressSnapshot) {
    println!("Status at {}", snapshot.taken_at.format("%H:%M:%S"));
    println!("  Keys/min: {}", snapshot.kpm);
    println!("  Mouse px/min: {:.0}", snapshot.mouse_distance_per_min);
    println!("  Stress: {:.2}", snapshot.stress_level);
    println!("  Energy: {:.1}", snapshot.energy);
    if snapshot.is_break_active {
        println!("  On break");
    }
    if snapshot.is_blink_active {
        println!("  Blink reminder showing");
    }
    println!("  Next break: {}", snapshot.next_break_at.format("%H:%M:%S"));
    println!("  Next blink: {}", snapshot.next_blink_at.format("%H:%M:%S"));
    if let Some(last) = snapshot.last_break_at {
        println!("  Last break: {}", last.format("%H:%M:%S"));
    }
}

fn cmd_config(config: Config, reset: bool) -> Result<()> {
    let config = if reset {
        let defaults = Config::default();
        defaults.save().context("Error saving config")?;
        println!("Configuration reset to defaults.");
        println!();
        defaults
    } else {
        config
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
