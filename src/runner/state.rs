use serde::{Deserialize, Serialize};
use std::fmt;

use super::events::{EventEmitter, RunEvent};

/// Result of a single check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    Warn,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Warn => write!(f, "WARN"),
        }
    }
}

/// Whether a false condition is a defect or merely inconclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// False means the application is broken
    Required,
    /// False may depend on unrelated state, e.g. a toast that already dismissed
    BestEffort,
}

impl Requirement {
    pub fn outcome(self, ok: bool) -> Outcome {
        match (ok, self) {
            (true, _) => Outcome::Pass,
            (false, Requirement::Required) => Outcome::Fail,
            (false, Requirement::BestEffort) => Outcome::Warn,
        }
    }
}

/// One recorded check. Never modified after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub index: usize,
    pub group: String,
    pub name: String,
    pub outcome: Outcome,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Aggregate counts over a list of checks
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
}

impl RunSummary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        results.iter().fold(Self::default(), |mut s, r| {
            s.total += 1;
            match r.outcome {
                Outcome::Pass => s.passed += 1,
                Outcome::Fail => s.failed += 1,
                Outcome::Warn => s.warned += 1,
            }
            s
        })
    }

    /// A run succeeds iff nothing failed; warnings never fail it
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Append-only collector of check results
pub struct CheckLog {
    results: Vec<CheckResult>,
    group: String,
    events: EventEmitter,
}

impl CheckLog {
    pub fn new(events: EventEmitter) -> Self {
        Self {
            results: Vec::new(),
            group: "setup".to_string(),
            events,
        }
    }

    /// Group attached to subsequently recorded checks
    pub fn enter_group(&mut self, group: &str) {
        self.group = group.to_string();
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn record(&mut self, name: &str, outcome: Outcome, detail: impl Into<String>) -> Outcome {
        self.push(name, outcome, detail.into(), None)
    }

    /// Record a check whose evidence is a screenshot file
    pub fn record_with_screenshot(
        &mut self,
        name: &str,
        outcome: Outcome,
        detail: impl Into<String>,
        screenshot: &str,
    ) -> Outcome {
        self.push(name, outcome, detail.into(), Some(screenshot.to_string()))
    }

    /// Map a condition through its requirement and record it
    pub fn check(
        &mut self,
        name: &str,
        requirement: Requirement,
        ok: bool,
        detail: impl Into<String>,
    ) -> Outcome {
        self.record(name, requirement.outcome(ok), detail)
    }

    pub fn check_with_screenshot(
        &mut self,
        name: &str,
        requirement: Requirement,
        ok: bool,
        detail: impl Into<String>,
        screenshot: &str,
    ) -> Outcome {
        self.record_with_screenshot(name, requirement.outcome(ok), detail, screenshot)
    }

    pub fn pass(&mut self, name: &str, detail: impl Into<String>) -> Outcome {
        self.record(name, Outcome::Pass, detail)
    }

    pub fn fail(&mut self, name: &str, detail: impl Into<String>) -> Outcome {
        self.record(name, Outcome::Fail, detail)
    }

    pub fn warn(&mut self, name: &str, detail: impl Into<String>) -> Outcome {
        self.record(name, Outcome::Warn, detail)
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_results(&self.results)
    }

    fn push(&mut self, name: &str, outcome: Outcome, detail: String, screenshot: Option<String>) -> Outcome {
        let result = CheckResult {
            index: self.results.len(),
            group: self.group.clone(),
            name: name.to_string(),
            outcome,
            detail,
            screenshot,
        };
        self.events.emit(RunEvent::CheckRecorded {
            result: result.clone(),
        });
        self.results.push(result);
        outcome
    }
}
