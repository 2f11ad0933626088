//! Interactive CLI that detects form fields in a PDF and collects values.

mod commands;
mod render;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, detect, fill};

/// Detect the fields of a PDF form and fill them in from the terminal
#[derive(Parser)]
#[command(name = "formscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect field labels in a PDF and print them
    Detect(detect::DetectArgs),

    /// Detect field labels, then prompt for a value for each
    Fill(fill::FillArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr so they never mix with JSON on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Detect(args) => detect::run(args, cli.config.as_deref()).await,
        Commands::Fill(args) => fill::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
    }
}
