//! ChatPlus CLI - Main entry point

mod cli;

use chatplus_core::AdminCommand;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ChatPlus - plugin extension runtime
#[derive(Parser, Debug)]
#[command(name = "chatplus")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Runtime config file (default: ./chatplus.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plugin unit directory (overrides the config file)
    #[arg(long)]
    plugins_dir: Option<PathBuf>,

    /// Pre-authorize permissions: NAME=PERM[,PERM...] (repeatable)
    #[arg(long = "grant", value_parser = cli::parse_grant)]
    grants: Vec<(String, Vec<String>)>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded plugins
    List,
    /// Show one plugin
    Show { name: String },
    /// Activate a plugin
    Activate { name: String },
    /// Deactivate a plugin
    Deactivate { name: String },
    /// Reload a plugin from disk
    Reload { name: String },
    /// Grant permissions to a plugin, then report its grants
    Grant {
        name: String,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Revoke permissions from a plugin
    Revoke {
        name: String,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Boot, enable hot reload and run until Ctrl-C
    Watch,
}

impl Command {
    fn into_admin(self) -> Option<AdminCommand> {
        Some(match self {
            Command::List => AdminCommand::List,
            Command::Show { name } => AdminCommand::Show { name },
            Command::Activate { name } => AdminCommand::Activate { name },
            Command::Deactivate { name } => AdminCommand::Deactivate { name },
            Command::Reload { name } => AdminCommand::Reload { name },
            Command::Grant { name, permissions } => AdminCommand::Grant { name, permissions },
            Command::Revoke { name, permissions } => AdminCommand::Revoke { name, permissions },
            Command::Watch => return None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let runtime = cli::boot(cli::BootOptions {
        config: args.config,
        plugins_dir: args.plugins_dir,
        grants: args.grants,
    })
    .await?;

    match args.command.into_admin() {
        Some(command) => cli::run_command(&runtime, command).await,
        None => cli::watch(runtime).await,
    }
}
