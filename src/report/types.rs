use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manifest::ArtifactManifest;
use crate::runner::state::{CheckResult, Outcome, RunSummary};

/// Everything known about one finished suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub suite: String,
    pub started_at: String,
    pub duration_ms: u64,
    pub results: Vec<CheckResult>,
    pub summary: RunSummary,
    pub artifacts: ArtifactManifest,
    pub success: bool,
}

impl RunReport {
    pub fn build(
        suite: &str,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        results: Vec<CheckResult>,
        artifacts: ArtifactManifest,
    ) -> Self {
        let mut report = Self {
            suite: suite.to_string(),
            started_at: started_at.to_rfc3339(),
            duration_ms,
            results,
            summary: RunSummary::default(),
            artifacts,
            success: false,
        };
        report.rederive();
        report
    }

    /// Recompute `summary` and `success` from `results`
    pub fn rederive(&mut self) {
        self.summary = RunSummary::from_results(&self.results);
        self.success = self.summary.is_success();
    }

    /// Missing artifacts never flip this; only Fail outcomes do
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.outcome == Outcome::Fail)
    }

    /// Distinct groups in first-seen order
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for r in &self.results {
            if !groups.contains(&r.group.as_str()) {
                groups.push(&r.group);
            }
        }
        groups
    }
}
