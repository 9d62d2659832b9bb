//! Task Graph CLI - headless live dashboard and offline tools for task
//! dependency graphs.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::config as config_cmd;
use config::Config;

/// Task Graph CLI - watch a task server's dependency graph live.
///
/// Run `tg watch` to follow the server at the configured base URL.
#[derive(Parser, Debug)]
#[command(
    name = "tg",
    author,
    version,
    about = "Task Graph: live task dependency graph dashboard",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow the task server: render every change and reconnect on failure.
    ///
    /// Type commands on stdin to interact: `select <id>`, `highlight <id>`,
    /// `unpin <id>`, `filter <all|pending|in_progress|completed>`,
    /// `search <text>`, `sort <name-asc|name-desc|status|date-asc|date-desc>`,
    /// `zoom <k>`, `reset`.
    Watch {
        /// Task server base URL (overrides TG_BASE_URL and the config file).
        #[arg(long)]
        base_url: Option<String>,

        /// Reconnect delay of the update channel in milliseconds.
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,

        /// Fetch and render one snapshot, then exit.
        #[arg(long)]
        once: bool,
    },

    /// Compare two snapshot files the way the dashboard does.
    Diff {
        /// Previously rendered snapshot.
        old: PathBuf,

        /// Incoming snapshot.
        new: PathBuf,

        /// Exit with status 1 when the snapshots differ.
        #[arg(long)]
        exit_code: bool,
    },

    /// Lay out a snapshot file and print node positions as JSON.
    Layout {
        /// Snapshot file (`{"tasks": [...]}` or a bare array).
        file: PathBuf,

        /// Run exactly this many ticks instead of until convergence.
        #[arg(long)]
        ticks: Option<usize>,

        /// Shadow ticks run before nodes are placed.
        #[arg(long)]
        warmup_ticks: Option<usize>,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    // stdout carries command output; logs go to stderr.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = Config::load()?;

    match cli.command {
        Commands::Watch {
            base_url,
            reconnect_delay_ms,
            once,
        } => {
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(delay) = reconnect_delay_ms {
                config.reconnect_delay_ms = delay;
            }
            commands::watch::execute(&config, once).await?;
        }

        Commands::Diff { old, new, exit_code } => {
            let changed = commands::diff::execute(&old, &new)?;
            if exit_code && changed {
                std::process::exit(1);
            }
        }

        Commands::Layout {
            file,
            ticks,
            warmup_ticks,
        } => {
            if let Some(warmup) = warmup_ticks {
                config.warmup_ticks = warmup;
            }
            let output = commands::layout::execute(&config, &file, ticks)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                config_cmd::show(&config)?;
            }
            ConfigCommands::Set { key, value } => {
                config_cmd::set(&mut config, &key, &value)?;
            }
            ConfigCommands::Get { key } => {
                config_cmd::get(&config, &key)?;
            }
            ConfigCommands::Reset => {
                config_cmd::reset()?;
            }
            ConfigCommands::Path => {
                if let Some(path) = Config::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
