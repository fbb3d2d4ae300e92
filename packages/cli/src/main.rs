#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for asking environmental questions.
//!
//! ```text
//! climatebud ask "<question>" [--summary] [--config FILE] [--data-dir DIR]
//! climatebud interpret "<question>"
//! climatebud suggest
//! ```
//!
//! Output is pretty-printed JSON on stdout; logs go to stderr and are
//! controlled with `RUST_LOG`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use climatebud_config::AppConfig;
use climatebud_pipeline::{Pipeline, PipelineResponse};
use climatebud_query::{QueryInterpreter, suggested_queries};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "climatebud",
    about = "Answer plain-language questions about local environmental data"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the CSV data tables (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret, analyze, and explain a question
    Ask {
        /// The question, in plain language
        query: String,
        /// Also write an executive summary
        #[arg(long)]
        summary: bool,
    },
    /// Show how a question would be interpreted
    Interpret {
        /// The question, in plain language
        query: String,
    },
    /// List example questions
    Suggest,
}

#[derive(Serialize)]
struct AskOutput {
    #[serde(flatten)]
    response: PipelineResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_summary: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data.directory = dir;
    }
    log::debug!(
        "Default location {} County, {}; data in {}",
        config.defaults.county,
        config.defaults.state,
        config.data.directory.display()
    );

    match cli.command {
        Commands::Ask { query, summary } => {
            let pipeline = Pipeline::from_config(&config)?;
            let response = pipeline.ask(&query).await;
            let report_summary = if summary {
                Some(pipeline.report_summary(&response).await)
            } else {
                None
            };

            let output = AskOutput {
                response,
                report_summary,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Interpret { query } => {
            let interpreter = QueryInterpreter::from_config(&config);
            let parsed = interpreter.process_query(&query).await;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Commands::Suggest => {
            println!("{}", serde_json::to_string_pretty(suggested_queries())?);
        }
    }

    Ok(())
}
