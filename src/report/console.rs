//! End-of-run console report

use colored::Colorize;
use std::fmt::Write;

use super::manifest::format_size;
use super::types::RunReport;
use crate::runner::state::Outcome;

/// Plain or colored text of the whole report
pub fn render(report: &RunReport, color: bool) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "VERIFICATION RESULTS: {}", report.suite);
    let _ = writeln!(out, "{}", rule);

    let mut current_group = "";
    for r in &report.results {
        if r.group != current_group {
            current_group = &r.group;
            let _ = writeln!(out, "\n  [{}]", current_group);
        }
        let tag = format!("[{}]", r.outcome);
        let tag = if color {
            match r.outcome {
                Outcome::Pass => tag.green().to_string(),
                Outcome::Fail => tag.red().bold().to_string(),
                Outcome::Warn => tag.yellow().to_string(),
            }
        } else {
            tag
        };
        let _ = writeln!(out, "  {} {}", tag, r.name);
        if !r.detail.is_empty() {
            let _ = writeln!(out, "         {}", r.detail);
        }
    }

    let s = &report.summary;
    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(
        out,
        "Total: {}  |  Passed: {}  |  Failed: {}  |  Warnings: {}",
        s.total, s.passed, s.failed, s.warned
    );

    let artifacts = &report.artifacts;
    if !artifacts.expected.is_empty() {
        let _ = writeln!(
            out,
            "\nScreenshots ({}/{}) in {}:",
            artifacts.present_count(),
            artifacts.expected.len(),
            artifacts.dir.display()
        );
        for a in &artifacts.expected {
            let status = if a.present {
                format_size(a.size_bytes)
            } else if color {
                "MISSING".red().to_string()
            } else {
                "MISSING".to_string()
            };
            let _ = writeln!(out, "  {} ({})", a.name, status);
        }
    }
    if !artifacts.extra.is_empty() {
        let _ = writeln!(out, "  also written: {}", artifacts.extra.join(", "));
    }

    let verdict = if report.is_success() {
        "RESULT: ALL REQUIRED CHECKS PASSED"
    } else {
        "RESULT: FAILURES DETECTED"
    };
    let verdict = match (color, report.is_success()) {
        (true, true) => verdict.green().bold().to_string(),
        (true, false) => verdict.red().bold().to_string(),
        (false, _) => verdict.to_string(),
    };
    let _ = writeln!(out, "\n{}", verdict);
    let _ = writeln!(out, "{}", rule);
    out
}

pub fn print(report: &RunReport) {
    use std::io::IsTerminal;
    print!("{}", render(report, std::io::stdout().is_terminal()));
}
