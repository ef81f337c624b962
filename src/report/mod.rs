pub mod console;
pub mod html;
pub mod json;
pub mod junit;
pub mod manifest;
pub mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use manifest::ArtifactManifest;
pub use types::RunReport;

/// Re-render a saved results file
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let report = json::load(results_path)?;

    match format {
        "console" => {
            console::print(&report);
            Ok(())
        }
        "json" => json::generate(&report, output),
        "html" => html::generate(&report, output),
        "junit" => match output {
            Some(path) => {
                std::fs::write(path, junit::generate_junit_xml(&report)?)?;
                println!("JUnit report saved to: {}", path.display());
                Ok(())
            }
            None => {
                println!("{}", junit::generate_junit_xml(&report)?);
                Ok(())
            }
        },
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Write the JSON, HTML and JUnit files for one run into `dir`
pub fn write_all(report: &RunReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("{}-results.json", report.suite));
    json::generate(report, Some(&json_path))?;

    let html_path = dir.join(format!("{}-report.html", report.suite));
    html::generate(report, Some(&html_path))?;

    let junit_path = junit::write_report(report, dir)?;

    Ok(vec![json_path, html_path, junit_path])
}
