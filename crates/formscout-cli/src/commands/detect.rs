//! Detect command - print the field labels found in a PDF.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use formscout_core::{Detection, FormPrompt};

use super::{run_detection, SourceArgs};

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: DetectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let pb = detection_spinner();
    let detection = run_detection(&args.source, config_path).await;
    pb.finish_and_clear();
    let detection = detection?;

    info!(
        "Detection finished in {}ms with status {:?}",
        start.elapsed().as_millis(),
        detection.status
    );

    let output = format_detection(&detection, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Spinner shown on stderr while the cascade runs.
pub fn detection_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(spinner);
    }
    pb.set_message("Detecting form fields...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn format_detection(detection: &Detection, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(detection)?),
        OutputFormat::Text => Ok(format_text(detection)),
    }
}

fn format_text(detection: &Detection) -> String {
    let mut output = String::new();

    output.push_str(detection.status.message());
    if detection.partial {
        output.push_str(" (recognition stopped early)");
    }
    output.push('\n');

    for prompt in FormPrompt::from_detection(detection) {
        output.push_str(&format!(
            "  - {} [{}]\n",
            prompt.label,
            format!("{:?}", prompt.kind).to_lowercase()
        ));
    }

    for failure in &detection.failures {
        output.push_str(&format!("  ! {:?}: {}\n", failure.stage, failure.message));
    }

    output.trim_end().to_string()
}
