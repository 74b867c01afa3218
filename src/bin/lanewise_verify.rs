//! lanewise-verify - checks every kernel and access strategy against the
//! scalar reference.
//!
//! Exits with status 1 if any strategy disagrees with the reference.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use lanewise::debug::{self, Level};
use lanewise::fixtures::{KernelInputs, VERIFY_ITEMS};
use lanewise::verify::StrategyReport;
use lanewise::{Element, Executor, RunConfig, VerificationSuite};

/// Verify SIMD kernels against the scalar reference
#[derive(Parser, Debug)]
#[command(name = "lanewise-verify")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Check every kernel x strategy bit for bit", long_about = None)]
struct Cli {
    /// Elements per buffer (default 100000, or `items` from the config file)
    #[arg(short = 'n', long)]
    items: Option<usize>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend: auto, scalar, sse2, avx2, avx512, neon
    #[arg(short, long)]
    backend: Option<String>,

    /// Byte alignment for the aligned-buffer runs
    #[arg(short, long)]
    alignment: Option<usize>,

    /// Extra byte offset for the misaligned run
    #[arg(short, long)]
    offset: Option<usize>,

    /// Enable debug logging to stderr
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    if cli.debug {
        debug::enable_at(Level::Debug);
    } else {
        debug::init_from_env();
    }

    let (mut config, from_file) = load_config(&cli)?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(alignment) = cli.alignment {
        config.byte_alignment = Some(alignment);
    }
    if let Some(offset) = cli.offset {
        config.byte_offset = offset;
    }
    config.validate().context("invalid settings")?;

    let items = cli.items.unwrap_or(if from_file { config.items } else { VERIFY_ITEMS });
    let alignment = config.alignment()?;
    let offset = config.byte_offset;

    println!(
        "Verifying {items} elements on {} (alignment {alignment}, offset {offset})",
        config.backend()?
    );

    let floats = check(config.float_executor()?, items, alignment, offset)?;
    let ints = check(config.int_executor()?, items, alignment, offset)?;
    let success = floats && ints;

    println!("Finished. Success: {success}");
    Ok(success)
}

fn load_config(cli: &Cli) -> Result<(RunConfig, bool)> {
    if let Some(path) = &cli.config {
        let config = RunConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        return Ok((config, true));
    }

    let default_path = dirs::config_dir().map(|p| p.join("lanewise/config.yaml"));
    match default_path {
        Some(path) if path.exists() => Ok((RunConfig::load_or_default(path), true)),
        _ => Ok((RunConfig::default(), false)),
    }
}

fn check<T: Element>(executor: Executor<T>, items: usize, alignment: usize, offset: usize) -> Result<bool> {
    let suite = VerificationSuite::new(executor, KernelInputs::fixture(items));
    let reports = suite
        .run_all(alignment, offset)
        .with_context(|| format!("{} verification failed to run", T::TYPE))?;

    for report in &reports {
        println!("{report}");
    }
    Ok(reports.iter().all(StrategyReport::passed))
}
