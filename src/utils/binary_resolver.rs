use anyhow::Result;
use std::path::PathBuf;

/// Well-known Chromium-family install locations, Google Chrome first
const BROWSER_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Names tried on PATH when no known location exists
const BROWSER_BINARIES: &[&str] = &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"];

/// Locate a Chromium executable for Playwright.
///
/// Order: `PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH`, known install paths, PATH.
/// `None` lets Playwright fall back to its own bundled browser.
pub fn find_browser() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH") {
        return Some(PathBuf::from(p));
    }

    BROWSER_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| find_on_path(BROWSER_BINARIES).ok())
}

fn find_on_path(names: &[&str]) -> Result<PathBuf> {
    for name in names {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(anyhow::anyhow!(
        "None of [{}] found on PATH",
        names.join(", ")
    ))
}
