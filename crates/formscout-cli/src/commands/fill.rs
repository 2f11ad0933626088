//! Fill command - detect fields, then collect a value for each one.

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Args;
use console::style;

use formscout_core::{DetectionStatus, FormPrompt};

use super::detect::detection_spinner;
use super::{run_detection, SourceArgs};
use crate::render::PromptRenderer;

/// Arguments for the fill command.
#[derive(Args)]
pub struct FillArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write the submitted values to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: FillArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let pb = detection_spinner();
    let detection = run_detection(&args.source, config_path).await;
    pb.finish_and_clear();
    let detection = detection?;

    let marker = match detection.status {
        DetectionStatus::FormFields | DetectionStatus::EmbeddedText => style("✓").green(),
        DetectionStatus::OcrFallback => style("ℹ").blue(),
        DetectionStatus::NoFieldsFound | DetectionStatus::Unreadable => style("✗").yellow(),
    };
    println!("{} {}", marker, detection.status.message());

    if detection.is_empty() {
        return Ok(());
    }

    let labels: Vec<&str> = detection.labels.iter().map(|l| l.as_str()).collect();
    println!("Detected fields: {}", labels.join(", "));
    println!();

    let prompts = FormPrompt::from_detection(&detection);
    let stdin = io::stdin();
    let record = PromptRenderer::new(stdin.lock(), io::stdout()).collect(&prompts)?;

    let Some(record) = record else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&record)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &json)?;
        println!(
            "{} Submitted values written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}
