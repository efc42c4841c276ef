//! Attempt history for the validate-and-repair loop.
//!
//! Every full validation is recorded as an attempt. The first attempt is
//! the initial check of the generated file; every attempt after it follows
//! a repair and consumes one repair cycle. Once a failure leaves no cycles
//! the loop reports failure instead of asking for another fix.
//!
//! The history round-trips through session state as JSON so it survives
//! between loop iterations, and the rendered feedback is injected into the
//! validator's next instruction. It is tagged with the invocation that
//! recorded it, so a later run in the same session starts over.

use crate::diagnostics::{ToolReport, interpret};
use crate::models::{ValidationResult, ValidationTool};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HISTORY_STATE_KEY: &str = "validation_history";
pub const FEEDBACK_STATE_KEY: &str = "validation_feedback";

/// Diagnostics listed per failing tool in rendered feedback.
pub const MAX_LISTED_DIAGNOSTICS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationAttempt {
    /// 1-based.
    pub number: usize,
    pub file: String,
    pub passed: bool,
    pub reports: Vec<ToolReport>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationAttempt {
    pub fn failing_reports(&self) -> impl Iterator<Item = &ToolReport> {
        self.reports.iter().filter(|r| !r.ok)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairDecision {
    Done,
    Retry { remaining: usize },
    GiveUp,
}

impl std::fmt::Display for RepairDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairDecision::Done => write!(f, "all checks passed"),
            RepairDecision::Retry { remaining } => {
                write!(f, "fix the reported problems and re-validate (cycles remaining: {})", remaining)
            }
            RepairDecision::GiveUp => write!(f, "no repair cycles remaining; report FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptHistory {
    pub attempts: Vec<ValidationAttempt>,
    pub max_cycles: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
}

impl AttemptHistory {
    pub fn new(max_cycles: usize) -> Self {
        Self { attempts: Vec::new(), max_cycles, invocation_id: None }
    }

    pub fn for_invocation(max_cycles: usize, invocation_id: impl Into<String>) -> Self {
        Self { invocation_id: Some(invocation_id.into()), ..Self::new(max_cycles) }
    }

    /// Restores a history saved under [`HISTORY_STATE_KEY`]. Missing or
    /// unreadable state starts a fresh history.
    pub fn from_state(value: Option<Value>, max_cycles: usize) -> Self {
        let mut history = value
            .and_then(|v| serde_json::from_value::<AttemptHistory>(v).ok())
            .unwrap_or_else(|| Self::new(max_cycles));
        history.max_cycles = max_cycles;
        history
    }

    /// Like [`AttemptHistory::from_state`], but a history recorded by a
    /// different invocation is discarded.
    pub fn from_state_for_run(value: Option<Value>, max_cycles: usize, invocation_id: &str) -> Self {
        let history = Self::from_state(value, max_cycles);
        if history.invocation_id.as_deref() == Some(invocation_id) {
            history
        } else {
            Self::for_invocation(max_cycles, invocation_id)
        }
    }

    /// True when `value` holds a history recorded by another invocation.
    pub fn is_stale(value: Option<&Value>, invocation_id: &str) -> bool {
        match value {
            None | Some(Value::Null) => false,
            Some(v) => v.get("invocation_id").and_then(Value::as_str) != Some(invocation_id),
        }
    }

    pub fn to_state(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Records a validation run. A run on a different file than the last
    /// attempt starts a new history.
    pub fn record(&mut self, file: &str, result: &ValidationResult) -> &ValidationAttempt {
        if self.latest().is_some_and(|a| a.file != file) {
            self.attempts.clear();
        }

        let reports = ValidationTool::ALL
            .iter()
            .filter(|tool| **tool != ValidationTool::PytestDoctest || !result.pytest.is_empty() || !result.tool_passed(**tool))
            .map(|tool| interpret(*tool, result.tool_passed(*tool), result.output(*tool)))
            .collect();

        let number = self.attempts.len() + 1;
        tracing::info!(attempt = number, file, passed = result.passed, "recorded validation attempt");
        self.attempts.push(ValidationAttempt {
            number,
            file: file.to_string(),
            passed: result.passed,
            reports,
            timestamp: Utc::now(),
        });
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn latest(&self) -> Option<&ValidationAttempt> {
        self.attempts.last()
    }

    /// Repairs validated so far: every attempt after the first.
    pub fn cycles_used(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn cycles_remaining(&self) -> usize {
        self.max_cycles.saturating_sub(self.cycles_used())
    }

    /// The initial validation plus one per repair cycle.
    pub fn max_attempts(&self) -> usize {
        self.max_cycles + 1
    }

    pub fn is_exhausted(&self) -> bool {
        self.cycles_remaining() == 0
    }

    pub fn decide(&self) -> RepairDecision {
        match self.latest() {
            Some(attempt) if attempt.passed => RepairDecision::Done,
            _ if self.is_exhausted() => RepairDecision::GiveUp,
            _ => RepairDecision::Retry { remaining: self.cycles_remaining() },
        }
    }
}

/// Summarizes every attempt for the next repair prompt.
pub fn render_feedback(history: &AttemptHistory) -> String {
    let mut out = String::new();

    for attempt in &history.attempts {
        let status = if attempt.passed { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "Attempt {} of {} on {}: {}\n",
            attempt.number,
            history.max_attempts(),
            attempt.file,
            status
        ));

        for report in attempt.failing_reports() {
            out.push_str(&format!(
                "  {} failed with {} issue(s):\n",
                report.tool.label(),
                report.diagnostics.len()
            ));
            if let Some(summary) = report.summary {
                out.push_str(&format!("    tests: {}\n", summary));
            }
            for diagnostic in report.diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
                out.push_str(&format!("    - {}\n", diagnostic));
            }
            if report.diagnostics.len() > MAX_LISTED_DIAGNOSTICS {
                out.push_str(&format!(
                    "    ... and {} more\n",
                    report.diagnostics.len() - MAX_LISTED_DIAGNOSTICS
                ));
            }
        }
    }

    out.push_str(&format!("Decision: {}", history.decide()));
    out
}
