use super::types::RunReport;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the report as pretty JSON, or print it when no path is given
pub fn generate(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Load a report written by [`generate`]; the summary is rebuilt from the results
pub fn load(path: &Path) -> Result<RunReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    let mut report: RunReport = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid results file {}", path.display()))?;
    report.rederive();
    Ok(report)
}
