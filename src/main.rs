use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use outage_core::Config;
use outage_model::{Pipeline, PipelineError, Prediction};

#[derive(Parser, Debug)]
#[command(author, version, about = "Power-outage probability over a location grid", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Fetch the forecast, score every location and write the predictions file
    Refresh,
    /// Score and print predictions as JSON records
    Predict {
        /// Reference instant (ISO-8601); uses archived weather for that day
        #[arg(long)]
        at: Option<String>,
    },
    /// Print the predictions written by the last refresh
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    outage_core::init()?;
    let cli = Cli::parse();

    let (config, _) = Config::load_validated(cli.config.as_deref())?;
    let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;

    let result = match cli.command {
        Command::Refresh => pipeline.refresh().await.map(|predictions| {
            println!(
                "Wrote {} predictions to {}",
                predictions.len(),
                config.output.predictions_path.display()
            );
            None
        }),
        Command::Predict { at: None } => pipeline.predict_current().await.map(Some),
        Command::Predict { at: Some(at) } => pipeline.predict_at(&at).await.map(Some),
        Command::Show => pipeline.load_latest().map(Some),
    };

    match result {
        Ok(Some(predictions)) => {
            println!("{}", render_json(&predictions)?);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::error!("{}", e);
            Err(failure(&e))
        }
    }
}

fn render_json(predictions: &[Prediction]) -> Result<String> {
    serde_json::to_string_pretty(predictions).context("Failed to serialize predictions")
}

fn failure(e: &PipelineError) -> anyhow::Error {
    if e.is_retryable() {
        anyhow::anyhow!("{} ({}). Try again later.", e.user_message(), e)
    } else {
        anyhow::anyhow!("{} ({})", e.user_message(), e)
    }
}
