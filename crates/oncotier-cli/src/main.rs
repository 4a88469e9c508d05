//! Oncotier — somatic variant actionability tiering.
//! Entry point for the CLI binary.

mod normalize_cmd;
mod pipeline;
mod validate;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oncotier_common::Settings;
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Exit codes for batch/validator use.
const EXIT_OK: u8 = 0;
const EXIT_INPUT_ERROR: u8 = 2;
const EXIT_ALL_FAILED: u8 = 3;
const EXIT_CONFIG_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "oncotier", version, about = "AMP/ASCO/CAP somatic variant tiering")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Assess a single variant
    Assess {
        gene: String,
        variant: String,
        #[arg(long)]
        tumor_type: Option<String>,
    },
    /// Assess a batch of variants from a JSON file
    Batch {
        #[arg(long)]
        input_file: String,
        #[arg(long, default_value_t = 3)]
        max_concurrent: usize,
    },
    /// Evaluate against gold-standard labels
    Validate {
        #[arg(long)]
        cases: String,
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Normalize variant notation without touching the network
    Normalize(normalize_cmd::NormalizeArgs),
}

#[derive(Debug, Clone, Deserialize)]
struct BatchInput {
    gene: String,
    variant: String,
    #[serde(default)]
    tumor_type: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oncotier=info")),
        )
        .init();

    let cli = Cli::parse();

    // Normalization is pure; no settings or clients needed.
    if let Cmd::Normalize(args) = &cli.cmd {
        return ExitCode::from(normalize_cmd::run(args));
    }

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let pipeline = match pipeline::Pipeline::from_settings(&settings).await {
        Ok(p) => p,
        Err(e) => {
            error!("pipeline construction failed: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match cli.cmd {
        Cmd::Assess { gene, variant, tumor_type } => {
            match pipeline.assess(&gene, &variant, tumor_type.as_deref()).await {
                Ok(assessment) => {
                    match serde_json::to_string_pretty(&assessment) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            error!("serialization failed: {e}");
                            return ExitCode::from(EXIT_ALL_FAILED);
                        }
                    }
                    ExitCode::from(EXIT_OK)
                }
                Err(e) => {
                    error!("assessment failed: {e}");
                    ExitCode::from(EXIT_ALL_FAILED)
                }
            }
        }

        Cmd::Batch { input_file, max_concurrent } => {
            let inputs: Vec<BatchInput> = match read_json_file(&input_file) {
                Ok(v) => v,
                Err(e) => {
                    error!("could not parse {input_file}: {e}");
                    return ExitCode::from(EXIT_INPUT_ERROR);
                }
            };
            run_batch(&pipeline, inputs, max_concurrent).await
        }

        Cmd::Validate { cases, max_concurrent, output } => {
            let cases: Vec<validate::ValidationCase> = match read_json_file(&cases) {
                Ok(v) => v,
                Err(e) => {
                    error!("could not parse validation cases: {e}");
                    return ExitCode::from(EXIT_INPUT_ERROR);
                }
            };
            let cap = max_concurrent.unwrap_or(settings.pipeline.max_concurrent_validation);
            let report = match validate::run_validation(&pipeline, cases, cap).await {
                Ok(r) => r,
                Err(e) => {
                    error!("validation run failed: {e}");
                    return ExitCode::from(EXIT_ALL_FAILED);
                }
            };
            if report.evaluated == 0 && report.total_cases > 0 {
                error!("every validation case failed");
                return ExitCode::from(EXIT_ALL_FAILED);
            }
            let json = match serde_json::to_string_pretty(&report) {
                Ok(j) => j,
                Err(e) => {
                    error!("serialization failed: {e}");
                    return ExitCode::from(EXIT_ALL_FAILED);
                }
            };
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, json) {
                        error!("could not write report to {path}: {e}");
                        return ExitCode::from(EXIT_ALL_FAILED);
                    }
                    info!("report written to {path}");
                }
                None => println!("{json}"),
            }
            ExitCode::from(EXIT_OK)
        }

        Cmd::Normalize(_) => unreachable!("handled above"),
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn run_batch(
    pipeline: &pipeline::Pipeline,
    inputs: Vec<BatchInput>,
    max_concurrent: usize,
) -> ExitCode {
    use futures::stream::{self, StreamExt};

    if inputs.is_empty() {
        error!("batch input is empty");
        return ExitCode::from(EXIT_INPUT_ERROR);
    }

    let total = inputs.len();
    let results: Vec<serde_json::Value> = stream::iter(inputs.into_iter().map(|input| async move {
        match pipeline
            .assess(&input.gene, &input.variant, input.tumor_type.as_deref())
            .await
        {
            Ok(assessment) => serde_json::to_value(&assessment).unwrap_or_else(|e| {
                serde_json::json!({
                    "gene": input.gene,
                    "variant": input.variant,
                    "error": e.to_string(),
                })
            }),
            Err(e) => serde_json::json!({
                "gene": input.gene,
                "variant": input.variant,
                "error": e.to_string(),
            }),
        }
    }))
    .buffer_unordered(max_concurrent.max(1))
    .collect()
    .await;

    let failed = results.iter().filter(|r| r.get("error").is_some()).count();
    match serde_json::to_string_pretty(&results) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("serialization failed: {e}");
            return ExitCode::from(EXIT_ALL_FAILED);
        }
    }

    if failed == total {
        error!("all {total} assessments failed");
        ExitCode::from(EXIT_ALL_FAILED)
    } else {
        info!(total, failed, "batch complete");
        ExitCode::from(EXIT_OK)
    }
}
