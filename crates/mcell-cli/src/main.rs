//! # mcell-cli
//!
//! Headless batch driver for the simulation core: load a model, run it to
//! a target time, report the recorded count observables. No interactive
//! mode and no wizard — `mcell-sim` is a reaction-diffusion engine meant
//! to run unattended in a batch job, not a menu of legacy simulators to
//! poke at, so this stays a single command rather than `oldies-cli`'s
//! subcommand-per-simulator shape.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mcell_core::McellError;
use mcell_sim::{Model, Simulation, Verbosity};

/// Run an mcell model to a target time and report count observables.
#[derive(Parser)]
#[command(name = "mcell")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Run a spatial stochastic reaction-diffusion model")]
struct Cli {
    /// Model file, as JSON (see mcell_sim::Model).
    model: PathBuf,

    /// Simulation end time, in seconds.
    #[arg(short = 't', long)]
    end_time: f64,

    /// Write recorded count observables to this path, as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output regardless of the model's notification level.
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), McellError> {
    let text = fs::read_to_string(&cli.model)
        .map_err(|e| McellError::Value(format!("reading {}: {e}", cli.model.display())))?;
    let model: Model = serde_json::from_str(&text)
        .map_err(|e| McellError::Value(format!("parsing {}: {e}", cli.model.display())))?;

    let verbose = cli.verbose || model.notifications.verbosity == Verbosity::Verbose;
    let quiet = !cli.verbose && model.notifications.verbosity == Verbosity::Quiet;

    if verbose {
        println!("{}", style("mcell").bold().cyan());
        println!("  model: {}", style(cli.model.display()).cyan());
        println!("  end time: {} s", cli.end_time);
    }

    let mut sim = Simulation::from_model(&model)?;

    let bar = if quiet {
        None
    } else {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
                .expect("valid progress template")
                .progress_chars("=> "),
        );
        bar.set_message("running");
        Some(bar)
    };

    sim.run_until(cli.end_time)?;

    if let Some(bar) = bar {
        bar.finish_with_message(format!(
            "{} {} molecules live at t={}",
            "done".green(),
            sim.molecule_count(),
            sim.now()
        ));
    }

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(sim.recorder().series())
            .map_err(|e| McellError::Internal(format!("serializing observables: {e}")))?;
        fs::write(path, json)
            .map_err(|e| McellError::Runtime(format!("writing {}: {e}", path.display())))?;
        if verbose {
            println!("  observables written to {}", style(path.display()).cyan());
        }
    } else if !quiet {
        for series in sim.recorder().series() {
            match series.last_value() {
                Some(v) => println!("{}: {}", series.name, v),
                None => println!("{}: (no samples)", series.name),
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::from(0),
        Err(e @ (McellError::Value(_) | McellError::Semantic(_))) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("{} {e}", "internal error:".red().bold());
            ExitCode::from(2)
        }
    }
}
