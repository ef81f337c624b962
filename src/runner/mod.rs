pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use colored::Colorize;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::driver::{BrowserFactory, WebBrowser, WebDriverConfig};
use crate::report::{self, console, ArtifactManifest};
use crate::suites;
use crate::utils::HarnessConfig;

pub use events::*;
pub use executor::Harness;
pub use state::*;

/// Run one suite (or `all`) against a live deployment.
///
/// Returns `Ok(true)` when no required check failed in any suite. Reports
/// are printed to the console and, with `write_reports`, written next to
/// the screenshots.
pub async fn run_suites(config: HarnessConfig, suite: &str, write_reports: bool) -> Result<bool> {
    let selected = suites::resolve(suite)?;

    std::fs::create_dir_all(&config.screenshots_dir)?;
    let browser = WebBrowser::launch(WebDriverConfig::from_harness(&config)).await?;

    run_with_browser(config, &selected, Arc::new(browser), write_reports).await
}

/// Run `selected` on an already launched browser, closing it afterwards
async fn run_with_browser(
    config: HarnessConfig,
    selected: &[Box<dyn suites::Suite>],
    browser: Arc<dyn BrowserFactory>,
    write_reports: bool,
) -> Result<bool> {
    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let harness = Harness::new(config.clone(), browser, emitter);
    let outcome = run_selected(&harness, selected, &config, write_reports).await;

    // The browser closes on every path, including a failed report write
    harness.shutdown().await;
    // The listener exits once the last emitter is gone
    drop(harness);
    let _ = listener.await;

    outcome
}

async fn run_selected(
    harness: &Harness,
    selected: &[Box<dyn suites::Suite>],
    config: &HarnessConfig,
    write_reports: bool,
) -> Result<bool> {
    let mut success = true;
    for suite in selected {
        let report = harness.run(suite.as_ref()).await?;
        console::print(&report);

        if write_reports {
            for path in report::write_all(&report, &config.screenshots_dir)? {
                info!("Wrote {}", path.display());
            }
        }
        success &= report.is_success();
    }
    Ok(success)
}

/// Report which screenshots of a suite exist in `dir`, without running it
pub fn inspect_artifacts(suite: &str, dir: &Path) -> Result<bool> {
    let mut complete = true;
    for suite in suites::resolve(suite)? {
        let manifest = ArtifactManifest::inspect(dir, &suite.artifacts(), None);
        println!(
            "{} {} ({}/{} screenshots)",
            "▸".cyan(),
            suite.name().bold(),
            manifest.present_count(),
            manifest.expected.len()
        );
        for artifact in &manifest.expected {
            if artifact.present {
                println!(
                    "  {} {} ({})",
                    "✓".green(),
                    artifact.name,
                    report::manifest::format_size(artifact.size_bytes)
                );
            } else {
                println!("  {} {} MISSING", "✗".red(), artifact.name);
            }
        }
        complete &= manifest.missing().is_empty();
    }
    Ok(complete)
}
