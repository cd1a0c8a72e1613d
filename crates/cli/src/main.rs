mod check_commands;
mod plugin_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "readonly", about = "Read-only channel enforcement", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a settings file and report errors/warnings.
    Check {
        /// Settings file (defaults to the discovered readonly.{toml,yaml,json}).
        #[arg(long, env = "READONLY_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Reconcile settings against a directory fixture and print the result.
    Reconcile {
        #[command(flatten)]
        source: plugin_commands::Source,
    },
    /// Reconcile, then run one post through the message hook.
    Gate {
        #[command(flatten)]
        source: plugin_commands::Source,
        /// Author user id.
        #[arg(long)]
        author: String,
        /// Channel id the post targets.
        #[arg(long)]
        channel: String,
        /// Post body.
        #[arg(short, long)]
        message: String,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "readonly starting");

    match cli.command {
        Commands::Check { config } => check_commands::check(config.as_deref()),
        Commands::Reconcile { source } => plugin_commands::reconcile(&source),
        Commands::Gate {
            source,
            author,
            channel,
            message,
        } => plugin_commands::gate(&source, &author, &channel, message),
    }
}
