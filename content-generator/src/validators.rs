//! Runs ruff, mypy and pytest against generated files.
//!
//! Every check is a separate subprocess started without a shell, with its
//! stdout and stderr captured together and a hard timeout. The
//! [`CommandRunner`] seam lets tests script tool outcomes.

use crate::error::Result;
use crate::models::{ValidationResult, ValidationTool};
use crate::project_registry::ProjectRegistry;
use async_trait::async_trait;
use forge_telemetry::{Instrument, validation_span};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRun {
    pub ok: bool,
    /// Combined stdout and stderr, trimmed.
    pub output: String,
}

impl ToolRun {
    pub fn new(ok: bool, output: impl Into<String>) -> Self {
        Self { ok, output: output.into() }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String], cwd: &Path, timeout: Duration) -> ToolRun;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String], cwd: &Path, timeout: Duration) -> ToolRun {
        let Some((program, rest)) = args.split_first() else {
            return ToolRun::new(false, "Command not found: ");
        };

        let child = Command::new(program)
            .args(rest)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Err(_) => {
                warn!(command = %args.join(" "), timeout_secs = timeout.as_secs(), "command timed out");
                ToolRun::new(
                    false,
                    format!("Command timed out after {}s: {}", timeout.as_secs(), args.join(" ")),
                )
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                ToolRun::new(false, format!("Command not found: {}", program))
            }
            Ok(Err(e)) => ToolRun::new(false, format!("Failed to run {}: {}", program, e)),
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                ToolRun::new(output.status.success(), combined.trim())
            }
        }
    }
}

impl ValidationTool {
    /// Command line for checking `file`, run through `uv` so the project's
    /// own tool versions are used.
    pub fn args(&self, file: &Path) -> Vec<String> {
        let file = file.display().to_string();
        let tail: &[&str] = match self {
            ValidationTool::RuffFormat => &["ruff", "format", "--check"],
            ValidationTool::RuffCheck => &["ruff", "check"],
            ValidationTool::Mypy => &["mypy"],
            ValidationTool::PytestDoctest => &["pytest", "--doctest-modules"],
        };
        ["uv", "run"].iter().chain(tail).map(|s| s.to_string()).chain(std::iter::once(file)).collect()
    }
}

#[derive(Clone)]
pub struct Validator {
    registry: ProjectRegistry,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Validator {
    pub fn new(registry: ProjectRegistry, runner: Arc<dyn CommandRunner>) -> Self {
        Self { registry, runner, timeout: DEFAULT_TIMEOUT }
    }

    /// Validator that spawns real processes.
    pub fn with_processes(registry: ProjectRegistry) -> Self {
        Self::new(registry, Arc::new(ProcessRunner))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs a single check. `project_dir` defaults to the file's parent.
    pub async fn run_tool(&self, tool: ValidationTool, file: &Path, project_dir: Option<&Path>) -> ToolRun {
        let cwd = working_dir(file, project_dir);
        let args = tool.args(file);
        let span = validation_span(tool.name(), &file.display().to_string());

        async {
            debug!(command = %args.join(" "), cwd = %cwd.display(), "running validation tool");
            let run = self.runner.run(&args, &cwd, self.timeout).await;
            info!(tool = tool.name(), ok = run.ok, "validation tool finished");
            run
        }
        .instrument(span)
        .await
    }

    /// Runs every check in order on a file inside the project roots.
    ///
    /// `run_doctest = false` skips pytest and leaves its output empty.
    pub async fn validate_file(
        &self,
        file: &Path,
        project_dir: Option<&Path>,
        run_doctest: bool,
    ) -> Result<ValidationResult> {
        let file = self.registry.validate_path(file)?;
        let mut result = ValidationResult::default();

        for tool in ValidationTool::ALL {
            if tool == ValidationTool::PytestDoctest && !run_doctest {
                continue;
            }
            let run = self.run_tool(tool, &file, project_dir).await;
            if !run.ok {
                let first_line = run.output.lines().find(|l| !l.trim().is_empty()).unwrap_or("failed");
                result.errors.push(format!("{}: {}", tool.label(), first_line.trim()));
                result.failed_tools.push(tool);
            }
            *result.output_mut(tool) = run.output;
        }

        result.passed = result.failed_tools.is_empty();
        info!(file = %file.display(), passed = result.passed, failures = result.failed_tools.len(), "validation complete");
        Ok(result)
    }
}

fn working_dir(file: &Path, project_dir: Option<&Path>) -> PathBuf {
    project_dir
        .map(Path::to_path_buf)
        .or_else(|| file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
