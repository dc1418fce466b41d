//! Command-line entry point for the Lore assistant.
//!
//! Loads the assistant configuration, initializes the shared retrieval
//! engine, runs one completion through the pipeline, and prints the
//! outcome. With `--json` the full tagged outcome is emitted for
//! scripting; otherwise only the answer text is printed.
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use lore_ai::Message;
use lore_config::AssistantConfig;
use lore_orchestrator::{
    CompletionOutcome, CompletionPipeline, ModelRoute, OpenRouterFactory, PipelineConfig,
    DEFAULT_PRIMARY_TIMEOUT_MS, DEFAULT_SECONDARY_TIMEOUT_MS,
};
use lore_retrieval::EngineCell;

#[derive(Debug, Parser)]
#[command(
    name = "lore",
    about = "Retrieval-augmented assistant over a curated knowledge base"
)]
struct Cli {
    /// Path to the assistant configuration JSON (system prompt plus
    /// knowledge base).
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Primary model identifier.
    #[arg(long)]
    model: Option<String>,

    /// Secondary model attempted when the primary fails.
    #[arg(long)]
    fallback_model: Option<String>,

    /// OpenRouter API key.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the provider API base URL.
    #[arg(long)]
    api_base: Option<String>,

    /// Emit the full outcome as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// The question to ask.
    #[arg(value_name = "QUESTION", required = true)]
    question: Vec<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn pipeline_config(cli: &Cli) -> PipelineConfig {
    let mut config = PipelineConfig {
        default_api_key: cli.api_key.clone(),
        ..PipelineConfig::default()
    };
    if let Some(model) = &cli.model {
        config.primary = ModelRoute::new(model.clone(), DEFAULT_PRIMARY_TIMEOUT_MS);
    }
    if let Some(model) = &cli.fallback_model {
        config.secondary = ModelRoute::new(model.clone(), DEFAULT_SECONDARY_TIMEOUT_MS);
    }
    config
}

fn build_pipeline(cli: &Cli) -> Result<CompletionPipeline> {
    let assistant = AssistantConfig::load(&cli.config)?;
    let cell = EngineCell::new();
    cell.initialize(assistant.into_engine());

    let factory = match &cli.api_base {
        Some(base) => OpenRouterFactory::with_api_base(base.clone()),
        None => OpenRouterFactory::default(),
    };

    Ok(CompletionPipeline::new(
        Arc::new(cell),
        Arc::new(factory),
        pipeline_config(cli),
    ))
}

fn print_outcome(outcome: &CompletionOutcome, json: bool) -> Result<ExitCode> {
    if json {
        let rendered =
            serde_json::to_string_pretty(outcome).context("failed to render outcome as JSON")?;
        println!("{rendered}");
        return Ok(match outcome {
            CompletionOutcome::Failure { .. } => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        });
    }

    match outcome {
        CompletionOutcome::Success {
            content,
            model,
            fallback,
            ..
        } => {
            println!("{content}");
            if *fallback {
                tracing::warn!(%model, "answer produced by the fallback model");
            }
            Ok(ExitCode::SUCCESS)
        }
        CompletionOutcome::RateLimited { details } => {
            println!("{details}");
            Ok(ExitCode::SUCCESS)
        }
        CompletionOutcome::Degraded { message, .. } => {
            println!("{message}");
            Ok(ExitCode::SUCCESS)
        }
        CompletionOutcome::Failure { stage, message } => {
            eprintln!("error ({}): {message}", stage.as_str());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let pipeline = build_pipeline(&cli)?;
    let question = cli.question.join(" ");
    let messages = vec![Message::user(question)];

    let outcome = pipeline.handle(&messages, None).await;
    print_outcome(&outcome, cli.json)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
