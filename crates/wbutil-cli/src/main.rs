//! wbutil CLI
//!
//! Command-line interface for the wbutil helpers.

#![forbid(unsafe_code)]

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wbutil_cli::config::load_for_command;
use wbutil_cli::config_handlers::handle_config_command;
use wbutil_cli::{Cli, Command, commands};
use wbutil_math::Summary;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config_path = args.config.as_deref();
    let (config, warning) =
        load_for_command(config_path, &args.command).context("loading configuration")?;

    // Initialize logging
    let default_filter = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Some(e) = warning {
        tracing::warn!(error = %e, "Using default configuration");
    }
    tracing::debug!(command = ?args.command, "Starting wbutil");

    match args.command {
        Command::Stats { numbers, files } => {
            if files.is_empty() {
                let numbers = if numbers.is_empty() {
                    commands::parse_numbers(io::stdin().lock())?
                } else {
                    numbers
                };
                println!("{}", Summary::of(&numbers)?);
            } else {
                for (path, summary) in commands::stats_files(files, &config).await? {
                    println!("{}\n{summary}\n", path.display());
                }
            }
        }
        Command::Uniq => {
            let written = commands::uniq_lines(io::stdin().lock(), io::stdout().lock())?;
            tracing::debug!(written, "Removed duplicate lines");
        }
        Command::Bayes {
            csv,
            instance,
            label_index,
        } => {
            println!("{}", commands::bayes(&csv, &instance, label_index, &config)?);
        }
        Command::Tree {
            csv,
            continuous,
            classify,
            dot,
            min_samples,
        } => {
            let mut params = config.tree;
            if let Some(min_samples) = min_samples {
                params.min_samples = min_samples;
            }
            let tree = commands::tree(&csv, &continuous, params, &config)?;
            if dot {
                print!("{}", tree.to_dot());
            }
            if let Some(instance) = classify {
                println!("{}", tree.classify(&instance)?);
            } else if !dot {
                let mut out = io::stdout().lock();
                writeln!(
                    out,
                    "depth: {}\nleaves: {}\nroot prediction: {}",
                    tree.depth(),
                    tree.leaf_count(),
                    tree.prediction()
                )?;
            }
        }
        Command::Config { action } => handle_config_command(config_path, action)?,
    }

    Ok(())
}
