// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "slotswap")]
#[command(about = "Blue-green redeploys with graceful session draining for systemd services")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a slotswap.yml template
    Init {
        /// Application name (service and user name on the server)
        #[arg(long)]
        app: Option<String>,

        /// Public domain served by the proxy
        #[arg(long)]
        domain: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Build, sync and swap on every configured server
    Deploy {
        /// Drain pinned sessions before switching (overrides graceful.enabled)
        #[arg(long, conflicts_with = "immediate")]
        graceful: bool,

        /// Switch as soon as the new slot is healthy (overrides graceful.enabled)
        #[arg(long)]
        immediate: bool,
    },

    /// Run the swap on this host against an already synced slot
    Swap(SwapArgs),

    /// Show the active slot and slot services on every server
    Status,

    /// Remove a deploy lock left behind by an aborted run
    Unlock,

    /// Tail the journal of the active slot's service
    Logs {
        /// Lines of history to show
        #[arg(short = 'n', long, default_value_t = 200)]
        lines: u32,

        /// Print the history and exit instead of following new entries
        #[arg(long)]
        no_follow: bool,

        /// Server to read from (default: the first configured server)
        #[arg(long)]
        server: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProxyArg {
    Caddy,
    None,
}

#[derive(Debug, Args)]
pub struct SwapArgs {
    /// Application name
    #[arg(long)]
    pub app: String,

    /// Public domain served by the proxy
    #[arg(long)]
    pub domain: String,

    /// Serve plain HTTP instead of letting the proxy obtain certificates
    #[arg(long)]
    pub no_https: bool,

    #[arg(long, value_enum, default_value = "caddy")]
    pub proxy: ProxyArg,

    /// Drain pinned sessions before switching
    #[arg(long)]
    pub graceful: bool,

    /// Longest time to wait for pinned sessions
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    pub drain_timeout: Duration,

    /// Time between pinned-session polls
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    #[arg(long, default_value_t = 8080)]
    pub blue_port: u16,

    #[arg(long, default_value_t = 8081)]
    pub green_port: u16,

    /// Health check attempts before giving up
    #[arg(long, default_value_t = 30)]
    pub health_attempts: u32,

    /// Path probed on the new slot
    #[arg(long, default_value = "/")]
    pub health_path: String,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}
