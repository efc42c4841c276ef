//! Parsers that turn raw ruff, mypy and pytest output into structured
//! diagnostics the repair loop can feed back to the model.

use crate::models::ValidationTool;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub tool: ValidationTool,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub code: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(tool: ValidationTool, message: impl Into<String>) -> Self {
        Self { tool, file: None, line: None, column: None, code: None, message: message.into() }
    }

    fn at(mut self, file: &str, line: Option<u32>, column: Option<u32>) -> Self {
        self.file = Some(file.to_string());
        self.line = line;
        self.column = column;
        self
    }

    fn with_code(mut self, code: Option<&str>) -> Self {
        self.code = code.map(str::to_string);
        self
    }
}

/// Formats as `file:line:col CODE message`, leaving out missing parts.
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
            write!(f, " ")?;
        }
        if let Some(code) = &self.code {
            write!(f, "{} ", code)?;
        }
        write!(f, "{}", self.message)
    }
}

/// Counts from pytest's closing `=== ... in 0.12s ===` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PytestSummary {
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
}

impl std::fmt::Display for PytestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)?;
        if self.errors > 0 {
            write!(f, ", {} error(s)", self.errors)?;
        }
        Ok(())
    }
}

/// Interpreted result of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReport {
    pub tool: ValidationTool,
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Only set for pytest, when it printed a closing summary line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PytestSummary>,
    pub raw: String,
}

pub fn interpret(tool: ValidationTool, ok: bool, output: &str) -> ToolReport {
    let mut diagnostics = if ok {
        Vec::new()
    } else {
        match tool {
            ValidationTool::RuffFormat => parse_ruff_format(output),
            ValidationTool::RuffCheck => parse_ruff_check(output),
            ValidationTool::Mypy => parse_mypy(output),
            ValidationTool::PytestDoctest => parse_pytest(output),
        }
    };

    if !ok && diagnostics.is_empty() {
        let first = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("exited with an error and no output");
        diagnostics.push(Diagnostic::new(tool, first));
    }

    let summary = match tool {
        ValidationTool::PytestDoctest => parse_pytest_summary(output),
        _ => None,
    };

    ToolReport { tool, ok, diagnostics, summary, raw: output.to_string() }
}

struct Patterns {
    would_reformat: Regex,
    ruff_concise: Regex,
    ruff_header: Regex,
    ruff_arrow: Regex,
    mypy_error: Regex,
    doctest_header: Regex,
    doctest_source: Regex,
    doctest_location: Regex,
    pytest_node: Regex,
    pytest_summary: Regex,
    pytest_count: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                would_reformat: Regex::new(r"^Would reformat: (?P<file>.+)$").ok()?,
                ruff_concise: Regex::new(
                    r"^(?P<file>[^:\s][^:]*):(?P<line>\d+):(?P<col>\d+): (?:(?P<code>[A-Z]+[0-9]+) (?:\[\*\] )?)?(?P<msg>.+)$",
                )
                .ok()?,
                ruff_header: Regex::new(r"^(?P<code>[A-Z]+[0-9]+) (?:\[\*\] )?(?P<msg>.+)$").ok()?,
                ruff_arrow: Regex::new(r"^\s*-->\s*(?P<file>.+?):(?P<line>\d+):(?P<col>\d+)\s*$").ok()?,
                mypy_error: Regex::new(
                    r"^(?P<file>[^:\s][^:]*):(?P<line>\d+)(?::(?P<col>\d+))?: error: (?P<msg>.*?)(?:\s+\[(?P<code>[a-z0-9-]+)\])?$",
                )
                .ok()?,
                doctest_header: Regex::new(r"\[doctest\] (?P<name>\S+)").ok()?,
                doctest_source: Regex::new(r"^\d{3,} (?P<src>.*)$").ok()?,
                doctest_location: Regex::new(
                    r"^(?P<file>\S+?):(?P<line>\d+): (?:DocTestFailure|UnexpectedException)",
                )
                .ok()?,
                pytest_node: Regex::new(r"^(?P<kind>FAILED|ERROR) (?P<node>\S+)(?: - (?P<reason>.*))?$").ok()?,
                pytest_summary: Regex::new(r"^=+ (?P<body>.+?) in [0-9.]+s(?: \([^)]*\))? =+$").ok()?,
                pytest_count: Regex::new(r"(?P<n>\d+) (?P<kind>passed|failed|errors?)\b").ok()?,
            })
        })
        .as_ref()
}

/// `Would reformat: <file>` lines from `ruff format --check`.
pub fn parse_ruff_format(output: &str) -> Vec<Diagnostic> {
    let Some(p) = patterns() else { return Vec::new() };
    output
        .lines()
        .filter_map(|line| p.would_reformat.captures(line.trim()))
        .map(|caps| {
            let file = &caps["file"];
            Diagnostic::new(ValidationTool::RuffFormat, "file would be reformatted").at(file, None, None)
        })
        .collect()
}

/// Both ruff output styles: concise `file:line:col: CODE message` and the
/// full style where a `CODE message` header is followed by ` --> file:line:col`.
pub fn parse_ruff_check(output: &str) -> Vec<Diagnostic> {
    let Some(p) = patterns() else { return Vec::new() };
    let mut diagnostics = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in output.lines() {
        if let Some(caps) = p.ruff_concise.captures(line) {
            pending = None;
            diagnostics.push(
                Diagnostic::new(ValidationTool::RuffCheck, caps["msg"].trim())
                    .at(&caps["file"], number(caps.name("line")), number(caps.name("col")))
                    .with_code(caps.name("code").map(|m| m.as_str())),
            );
        } else if let Some(caps) = p.ruff_header.captures(line) {
            pending = Some((caps["code"].to_string(), caps["msg"].trim().to_string()));
        } else if let Some(caps) = p.ruff_arrow.captures(line) {
            if let Some((code, msg)) = pending.take() {
                diagnostics.push(
                    Diagnostic::new(ValidationTool::RuffCheck, msg)
                        .at(&caps["file"], number(caps.name("line")), number(caps.name("col")))
                        .with_code(Some(&code)),
                );
            }
        }
    }

    diagnostics
}

/// mypy `error:` lines; notes are dropped.
pub fn parse_mypy(output: &str) -> Vec<Diagnostic> {
    let Some(p) = patterns() else { return Vec::new() };
    output
        .lines()
        .filter_map(|line| p.mypy_error.captures(line))
        .map(|caps| {
            Diagnostic::new(ValidationTool::Mypy, caps["msg"].trim())
                .at(&caps["file"], number(caps.name("line")), number(caps.name("col")))
                .with_code(caps.name("code").map(|m| m.as_str()))
        })
        .collect()
}

#[derive(Default)]
struct DoctestFailure {
    name: String,
    source: Option<String>,
    expected: Vec<String>,
    got: Vec<String>,
    exception: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl DoctestFailure {
    fn into_diagnostic(self) -> Diagnostic {
        let mut message = format!("doctest {} failed", self.name);
        if let Some(source) = &self.source {
            message.push_str(&format!(" at `{}`", source));
        }
        if let Some(exception) = &self.exception {
            message.push_str(&format!(": raised {}", exception));
        } else if !self.expected.is_empty() || !self.got.is_empty() {
            message.push_str(&format!(
                ": expected {}, got {}",
                join_or_nothing(&self.expected),
                join_or_nothing(&self.got)
            ));
        }

        let diagnostic = Diagnostic::new(ValidationTool::PytestDoctest, message);
        match &self.file {
            Some(file) => diagnostic.at(file, self.line, None),
            None => diagnostic,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Expected,
    Got,
}

/// Doctest failure sections plus `FAILED`/`ERROR` summary lines not already
/// covered by a parsed doctest.
pub fn parse_pytest(output: &str) -> Vec<Diagnostic> {
    let Some(p) = patterns() else { return Vec::new() };
    let mut failures: Vec<DoctestFailure> = Vec::new();
    let mut nodes = Vec::new();
    let mut current: Option<DoctestFailure> = None;
    let mut block = Block::None;

    for line in output.lines() {
        if let Some(caps) = p.doctest_header.captures(line) {
            failures.extend(current.take());
            current = Some(DoctestFailure { name: caps["name"].to_string(), ..Default::default() });
            block = Block::None;
            continue;
        }

        if let Some(caps) = p.pytest_node.captures(line) {
            failures.extend(current.take());
            block = Block::None;
            nodes.push((
                caps["kind"].to_string(),
                caps["node"].to_string(),
                caps.name("reason").map(|m| m.as_str().trim().to_string()),
            ));
            continue;
        }

        let Some(failure) = current.as_mut() else { continue };

        if let Some(caps) = p.doctest_location.captures(line) {
            failure.file = Some(caps["file"].to_string());
            failure.line = number(caps.name("line"));
            block = Block::None;
        } else if let Some(rest) = line.strip_prefix("UNEXPECTED EXCEPTION: ") {
            failure.exception = Some(rest.trim().to_string());
            block = Block::None;
        } else if line.trim_end() == "Expected:" {
            block = Block::Expected;
        } else if line.starts_with("Got") {
            block = Block::Got;
            if line.trim_end() == "Got nothing" {
                failure.got.push("nothing".to_string());
                block = Block::None;
            }
        } else if let Some(caps) = p.doctest_source.captures(line) {
            let src = caps["src"].trim();
            if let Some(statement) = src.strip_prefix(">>> ") {
                failure.source = Some(statement.to_string());
            }
            block = Block::None;
        } else if line.trim().is_empty() || !line.starts_with(char::is_whitespace) {
            block = Block::None;
        } else {
            match block {
                Block::Expected => failure.expected.push(line.trim().to_string()),
                Block::Got => failure.got.push(line.trim().to_string()),
                Block::None => {}
            }
        }
    }
    failures.extend(current);

    let doctest_names: Vec<String> = failures.iter().map(|f| f.name.clone()).collect();
    let mut diagnostics: Vec<Diagnostic> = failures.into_iter().map(DoctestFailure::into_diagnostic).collect();

    for (kind, node, reason) in nodes {
        let covered = node
            .rsplit_once("::")
            .is_some_and(|(_, test)| doctest_names.iter().any(|n| n == test));
        if covered {
            continue;
        }
        let file = node.split("::").next().unwrap_or(&node).to_string();
        let message = match reason {
            Some(reason) if !reason.is_empty() => format!("{} {}: {}", kind, node, reason),
            _ => format!("{} {}", kind, node),
        };
        diagnostics.push(Diagnostic::new(ValidationTool::PytestDoctest, message).at(&file, None, None));
    }

    diagnostics
}

/// Counts from the last summary line, if pytest printed one.
pub fn parse_pytest_summary(output: &str) -> Option<PytestSummary> {
    let p = patterns()?;
    let caps = output.lines().rev().find_map(|line| p.pytest_summary.captures(line.trim()))?;

    let mut summary = PytestSummary::default();
    for count in p.pytest_count.captures_iter(&caps["body"]) {
        let n: u32 = count["n"].parse().unwrap_or(0);
        match &count["kind"] {
            "passed" => summary.passed = n,
            "failed" => summary.failed = n,
            _ => summary.errors = n,
        }
    }
    Some(summary)
}

fn number(m: Option<regex::Match<'_>>) -> Option<u32> {
    m.and_then(|m| m.as_str().parse().ok())
}

fn join_or_nothing(lines: &[String]) -> String {
    if lines.is_empty() { "nothing".to_string() } else { lines.join(" / ") }
}
