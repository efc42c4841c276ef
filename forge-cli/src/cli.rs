use clap::{Parser, Subcommand, ValueEnum};

/// Generate validated Python lessons with LLM agents
#[derive(Parser, Debug)]
#[command(name = "lesson-forge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an agent once with a prompt, or interactively without one
    Run {
        #[arg(value_enum)]
        agent: AgentKind,

        /// User ID for the session
        #[arg(short, long, default_value = "user")]
        user_id: String,

        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// List registered content domains
    Domains,
    /// Show one domain's configuration
    Domain { name: String },
    /// Analyze a learning project's pyproject.toml and layout
    Analyze { project: String },
    /// Print the next free lesson number
    NextLesson { project: String },
    /// Run ruff, mypy and pytest on a file; exits 1 on failure
    Validate { project: String, relative_path: String },
    /// Render a boilerplate template to stdout
    Render {
        #[arg(value_enum)]
        kind: TemplateKind,

        #[arg(long)]
        docstring: String,

        #[arg(long, default_value = "")]
        imports: String,

        #[arg(long)]
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    #[value(name = "content_generator")]
    ContentGenerator,
    #[value(name = "google_search_agent")]
    GoogleSearchAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateKind {
    Lesson,
    Asyncio,
    App,
    AppTest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_prompt() {
        let cli = Cli::try_parse_from([
            "lesson-forge",
            "--log-level",
            "debug",
            "run",
            "content_generator",
            "Create",
            "lesson",
            "11",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run { agent, user_id, prompt } => {
                assert_eq!(agent, AgentKind::ContentGenerator);
                assert_eq!(user_id, "user");
                assert_eq!(prompt.join(" "), "Create lesson 11");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["lesson-forge", "next-lesson", "learning-dsa"]).unwrap();
        assert!(matches!(cli.command, Commands::NextLesson { ref project } if project == "learning-dsa"));
        assert_eq!(cli.log_level, "warn");

        let cli = Cli::try_parse_from([
            "lesson-forge",
            "render",
            "app-test",
            "--docstring",
            "Tests.",
            "--body",
            "pass",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Render { kind: TemplateKind::AppTest, .. }));
    }

    #[test]
    fn test_rejects_unknown_agent() {
        assert!(Cli::try_parse_from(["lesson-forge", "run", "nope"]).is_err());
    }
}
