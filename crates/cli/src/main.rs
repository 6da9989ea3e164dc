mod config;
mod output;
mod turns_cmd;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chamber",
    about = "chamber - inspect conversation turn grouping and streaming phases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group a session export into turns and print their activity
    Turns {
        /// JSON array of `{ info, parts }` session messages
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Treat this message id as the one currently streaming
        #[arg(long)]
        streaming: Option<String>,

        /// Mark the session as working (implied by --streaming)
        #[arg(long)]
        working: bool,

        /// Config file (defaults to ~/.config/chamber/chamber.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the effective display configuration
    Config {
        /// Config file (defaults to ~/.config/chamber/chamber.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chamber=info"))
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Turns {
            file,
            format,
            streaming,
            working,
            config,
        } => turns_cmd::run_turns(&turns_cmd::TurnsArgs {
            file,
            format,
            streaming,
            working,
            config,
        }),
        Commands::Config { config } => config::show_config(config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
