use anyhow::Result;
use colored::Colorize;
use forge_core::{Agent, Content, Event, Part};
use forge_runner::{Runner, RunnerConfig};
use forge_session::{CreateRequest, InMemorySessionService, SessionService};
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::HashMap;
use std::sync::Arc;

pub const APP_NAME: &str = "lesson-forge";

/// Sends one prompt and prints the agents' replies.
pub async fn run_once(agent: Arc<dyn Agent>, user_id: String, prompt: String) -> Result<()> {
    let (runner, session_id) = start(agent, &user_id).await?;
    send(&runner, &user_id, &session_id, prompt).await
}

/// Reads prompts until Ctrl+C or Ctrl+D; every turn shares one session.
pub async fn run_console(agent: Arc<dyn Agent>, user_id: String) -> Result<()> {
    let name = agent.name().to_string();
    let (runner, session_id) = start(agent, &user_id).await?;
    let mut rl = DefaultEditor::new()?;

    println!("{} {}", "Agent:".yellow().bold(), name.cyan());
    println!("Type your message and press Enter. Ctrl+C to exit.\n");

    loop {
        match rl.readline("User -> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(&line)?;
                send(&runner, &user_id, &session_id, line).await?;
                println!();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}: {}", "Error".red().bold(), err);
                break;
            }
        }
    }

    Ok(())
}

async fn start(agent: Arc<dyn Agent>, user_id: &str) -> Result<(Runner, String)> {
    let session_service = Arc::new(InMemorySessionService::new());
    let session = session_service
        .create(CreateRequest {
            app_name: APP_NAME.to_string(),
            user_id: user_id.to_string(),
            session_id: None,
            state: HashMap::new(),
        })
        .await?;
    let runner = Runner::new(RunnerConfig {
        app_name: APP_NAME.to_string(),
        agent,
        session_service,
    })?;
    Ok((runner, session.id().to_string()))
}

async fn send(runner: &Runner, user_id: &str, session_id: &str, prompt: String) -> Result<()> {
    let content = Content::new("user").with_text(prompt);
    let mut events = runner.run(user_id.to_string(), session_id.to_string(), content).await?;

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => print_event(&event),
            Err(e) => eprintln!("{}: {}", "Error".red().bold(), e),
        }
    }
    Ok(())
}

fn print_event(event: &Event) {
    for line in event_lines(event) {
        println!("{}", line);
    }
}

/// Text and tool calls of one event, prefixed with the author.
fn event_lines(event: &Event) -> Vec<String> {
    let Some(content) = event.content() else {
        return Vec::new();
    };
    let author = format!("[{}]", event.author).cyan().bold();

    content
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } if !text.trim().is_empty() => Some(format!("{} {}", author, text.trim_end())),
            Part::FunctionCall { name, .. } => Some(format!("{} {} {}", author, "->".dimmed(), name.yellow())),
            _ => None,
        })
        .collect()
}
