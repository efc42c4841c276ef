//! lesson-forge: generate validated Python lessons with LLM agents.
//!
//! ```bash
//! # Generate a lesson end to end
//! lesson-forge run content_generator "Create lesson 11 about tries for learning-dsa"
//!
//! # Chat with the search agent
//! lesson-forge run google_search_agent
//!
//! # Check a file by hand
//! lesson-forge validate learning-dsa src/algorithms/11_tries.py
//! ```

mod cli;
mod commands;
mod console;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{AgentKind, Cli, Commands};
use colored::Colorize;
use content_generator::{ContentTools, GeneratorConfig};
use content_generator_agent::build_content_generator;
use forge_core::{Agent, Llm};
use forge_model::GeminiModel;
use google_search_agent::build_google_search_agent;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // a missing .env is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    forge_telemetry::init_with_level("lesson-forge", &cli.log_level)
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Configuration Error".red().bold(), e);
            return Ok(ExitCode::FAILURE);
        }
    };
    let tools = ContentTools::new(config.clone());

    match cli.command {
        Commands::Run { agent, user_id, prompt } => {
            let agent = build_agent(agent, &config, &tools)?;
            if prompt.is_empty() {
                console::run_console(agent, user_id).await?;
            } else {
                console::run_once(agent, user_id, prompt.join(" ")).await?;
            }
        }
        Commands::Domains => println!("{}", commands::domains(&tools)),
        Commands::Domain { name } => println!("{}", commands::domain(&tools, &name)?),
        Commands::Analyze { project } => println!("{}", commands::analyze(&tools, &project)?),
        Commands::NextLesson { project } => println!("{}", commands::next_lesson(&tools, &project)?),
        Commands::Validate { project, relative_path } => {
            let (report, passed) = commands::validate(&tools, &project, &relative_path).await?;
            println!("{}", report);
            if !passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Render { kind, docstring, imports, body } => {
            print!("{}", commands::render(kind, &docstring, &imports, &body)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config() -> Result<GeneratorConfig> {
    Ok(GeneratorConfig::from_env()?)
}

fn build_agent(kind: AgentKind, config: &GeneratorConfig, tools: &ContentTools) -> Result<Arc<dyn Agent>> {
    let api_key = config.require_api_key()?;
    let model: Arc<dyn Llm> = Arc::new(
        GeminiModel::new(api_key, config.model.clone())
            .with_context(|| format!("failed to create Gemini model {}", config.model))?,
    );
    info!(model = %config.model, agent = ?kind, "starting agent");

    let agent: Arc<dyn Agent> = match kind {
        AgentKind::ContentGenerator => {
            build_content_generator(model, tools, config.max_repair_cycles)?.root_agent()
        }
        AgentKind::GoogleSearchAgent => Arc::new(build_google_search_agent(model)?),
    };
    Ok(agent)
}
