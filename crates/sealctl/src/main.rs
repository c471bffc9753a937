//! `sealctl`: operator CLI for sealed token bundles.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`config::Config`] (`SEALCTL_*`) and [`SealerConfig`] (`TOKEN_SEAL_*`).
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the subcommand, reading stdin and writing stdout.

mod cli;
mod commands;
mod config;
mod telemetry;

use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sealer::{AsyncSealer, Sealer, SealerConfig};
use tracing::info;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: sealctl configuration invalid: {e}");
        e
    })?;
    let sealer_cfg = SealerConfig::from_env().map_err(|e| {
        eprintln!("ERROR: sealer configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        key_version = sealer_cfg.default_key_version,
        "sealctl starting"
    );

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    let sealer = AsyncSealer::new(
        Sealer::from_config(&sealer_cfg).context("failed to build sealer")?,
    );

    let output = match cli.command {
        Command::Check => {
            let passphrase = std::str::from_utf8(cfg.passphrase()?)
                .context("SEALCTL_PASSPHRASE is not valid UTF-8")?;
            let (valid, report) = commands::check(passphrase)?;
            print(&report)?;
            return Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Seal {
            key_version,
            compact,
        } => {
            let input = read_stdin()?;
            commands::seal(&sealer, cfg.passphrase()?, &input, key_version, compact).await?
        }
        Command::Open => {
            let input = read_stdin()?;
            commands::open(&sealer, cfg.passphrase()?, &input).await?
        }
        Command::Inspect => {
            let input = read_stdin()?;
            commands::inspect(&sealer, &input)?
        }
        Command::Reseal { compact } => {
            let input = read_stdin()?;
            commands::reseal(
                &sealer,
                cfg.passphrase()?,
                cfg.new_passphrase()?,
                &input,
                compact,
            )
            .await?
        }
    };

    print(&output)?;
    sealer.clear_cache();
    Ok(ExitCode::SUCCESS)
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(input)
}

fn print(output: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}").context("failed to write stdout")
}
