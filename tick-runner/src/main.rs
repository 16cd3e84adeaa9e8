//! Tick runner CLI.
//!
//! Drives the reference hive module against an in-memory sandbox, one cycle
//! at a time, with the runner's fault isolation in between. Raw memory is kept
//! in `.tick-runner/raw_memory.json` so consecutive runs continue the same game.
//!
//! Console lines are printed as-is after each cycle, notifications with a
//! `notify: ` prefix.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tick_runner::exit_codes;
use tick_runner::hive::HiveLogic;
use tick_runner::host::SandboxHost;
use tick_runner::io::config::load_config;
use tick_runner::io::init::{InitOptions, RunnerPaths, init_runner};
use tick_runner::io::raw_memory::{load_raw_memory, write_raw_memory};
use tick_runner::logging;
use tick_runner::module::LogicModule;
use tick_runner::tick::{TickOptions, TickRunner};

#[derive(Parser)]
#[command(
    name = "tick-runner",
    version,
    about = "Fault-isolating tick runner for a turn-based game sandbox"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.tick-runner/config.toml` with defaults.
    Init {
        /// Overwrite an existing config and clear raw memory.
        #[arg(short, long)]
        force: bool,
    },
    /// Run cycles of the hive module against the sandbox world.
    Run {
        /// Number of cycles (defaults to `default_ticks` from config).
        #[arg(short, long)]
        ticks: Option<u32>,
        /// Make the first loaded module panic on this cycle.
        #[arg(long)]
        fail_on_tick: Option<u64>,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Init { force } => cmd_init(&root, force),
        Command::Run {
            ticks,
            fail_on_tick,
        } => cmd_run(&root, ticks, fail_on_tick),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = init_runner(root, &InitOptions { force })?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn cmd_run(root: &Path, ticks: Option<u32>, fail_on_tick: Option<u64>) -> Result<()> {
    let paths = RunnerPaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    let ticks = ticks.unwrap_or(cfg.default_ticks);
    let raw = load_raw_memory(&paths.raw_memory_path)?;
    let mut host = SandboxHost::from_config(&cfg.sandbox).with_raw_memory(raw);

    // The injected fault belongs to the first instance only; reloads run clean.
    let mut pending_fault = fail_on_tick;
    let loader = move || -> Result<Box<dyn LogicModule<SandboxHost>>> {
        let module = match pending_fault.take() {
            Some(tick) => HiveLogic::failing_on(tick),
            None => HiveLogic::new(),
        };
        Ok(Box::new(module))
    };

    let mut runner = TickRunner::new(loader, TickOptions::from(&cfg));
    let summary = runner.run_ticks(&mut host, ticks, |host, _| {
        for line in host.drain_console() {
            println!("{line}");
        }
        for line in host.drain_notifications() {
            println!("notify: {line}");
        }
    });

    write_raw_memory(&paths.raw_memory_path, host.raw_memory_str())?;
    println!(
        "ran {} tick(s), {} fault(s), module {}, stockpile {}",
        summary.ticks,
        summary.faults,
        summary.final_state,
        host.world_state().stockpile
    );
    Ok(())
}
