// ABOUTME: Entry point for the slotswap CLI application.
// ABOUTME: Parses arguments, sets up logging and maps failures onto exit codes.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use slotswap::config::{self, Config};
use slotswap::deploy::SwapMode;
use slotswap::error::Result;
use slotswap::output::{Output, OutputMode};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli, mode).await {
        let code = e.exit_code();
        Output::new(mode).error(&e.to_string(), code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let config_path = cli.config;

    match cli.command {
        Commands::Init { app, domain, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, app.as_deref(), domain.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            graceful,
            immediate,
        } => {
            let (config, workdir) = load_config(config_path.as_deref())?;
            let mode = if graceful {
                Some(SwapMode::Graceful)
            } else if immediate {
                Some(SwapMode::Immediate)
            } else {
                None
            };
            commands::deploy(config, mode, &workdir, output).await
        }
        Commands::Swap(args) => commands::swap(args, output).await,
        Commands::Status => {
            let (config, _) = load_config(config_path.as_deref())?;
            commands::status(config, output).await
        }
        Commands::Unlock => {
            let (config, _) = load_config(config_path.as_deref())?;
            commands::unlock(config, output).await
        }
        Commands::Logs {
            lines,
            no_follow,
            server,
        } => {
            let (config, _) = load_config(config_path.as_deref())?;
            commands::logs(config, server, lines, !no_follow, output).await
        }
    }
}

/// Load the configuration and return the directory build commands run in.
fn load_config(path: Option<&Path>) -> Result<(Config, PathBuf)> {
    match path {
        Some(path) => {
            let config = Config::load(path)?;
            let workdir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => env::current_dir()?,
            };
            Ok((config, workdir))
        }
        None => {
            let cwd = env::current_dir()?;
            Ok((Config::discover(&cwd)?, cwd))
        }
    }
}
