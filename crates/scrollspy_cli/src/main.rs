//! Scrollspy CLI
//!
//! Replay scroll scenarios and print the zone notifications they produce.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod runner;
mod scenario;

use runner::Replay;
use scenario::Scenario;
use scrollspy_core::{TrackerConfig, DEFAULT_NAMESPACE};

#[derive(Parser)]
#[command(name = "scrollspy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scroll zone tracking playground", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print every notification
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parse a scenario and show the resolved trackers
    Check {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },

    /// Show version and option defaults
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { scenario, format } => cmd_run(&scenario, format),
        Commands::Check { scenario } => cmd_check(&scenario),
        Commands::Info => cmd_info(),
    }
}

fn scenario_name(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario")
}

fn cmd_run(path: &Path, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!("Running {}", scenario.display_name(scenario_name(path)));

    let replay = Replay::prepare(&scenario)?;
    let records = replay.run(&scenario.steps)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            for (i, step) in scenario.steps.iter().enumerate() {
                println!("[{}] {}", i + 1, step);
                for record in records.iter().filter(|r| r.step == i + 1) {
                    println!("    {} {}", record.element, record.event);
                }
            }
        }
    }

    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let replay = Replay::prepare(&scenario)?;

    println!("Scenario: {}", scenario.display_name(scenario_name(path)));
    println!(
        "Viewport: {}x{}",
        scenario.viewport.width, scenario.viewport.height
    );
    println!("Elements: {}", replay.spy().with_document(|doc| doc.len()));
    println!();

    for (entry, attached) in scenario.trackers.iter().zip(replay.trackers()) {
        let config = entry.options.resolve();
        println!("Tracker '{}'", attached.targets);
        println!("  targets:   {} matched", attached.matched);
        println!("  container: {}", config.container());
        println!("  namespace: {}", config.namespace());
        println!("  mode:      {}", config.mode());
        println!("  buffer:    {}", config.buffer());
        println!("  min:       {}", config.min());
        println!("  max:       {}", config.max());
        match attached.subscription {
            Some(_) => println!("  status:    attached"),
            None => println!("  status:    not attached (no container or targets)"),
        }
    }

    println!();
    println!("Steps: {}", scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        println!("  [{}] {}", i + 1, step);
    }

    Ok(())
}

fn cmd_info() -> Result<()> {
    let defaults = TrackerConfig::default();

    println!("Scrollspy");
    println!("=========");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Option defaults:");
    println!("  buffer:    {}", defaults.buffer());
    println!("  container: {}", defaults.container());
    println!("  max:       {} (0 = container size)", defaults.max());
    println!("  min:       {}", defaults.min());
    println!("  mode:      {}", defaults.mode());
    println!("  namespace: {}", DEFAULT_NAMESPACE);
    println!();
    println!("Notifications:");
    for kind in scrollspy_core::ZoneEventKind::ALL {
        println!("  - {}", kind);
    }

    Ok(())
}
