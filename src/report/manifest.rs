//! Expected screenshots vs. files actually on disk

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

const MTIME_SLACK: Duration = Duration::from_secs(1);

/// One expected screenshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStatus {
    /// File name, e.g. `01-login-page.png`
    pub name: String,
    pub path: PathBuf,
    /// Exists with a non-zero size
    pub present: bool,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub dir: PathBuf,
    pub expected: Vec<ArtifactStatus>,
    /// PNGs written during the run that no check expected, e.g. fallback shots
    #[serde(default)]
    pub extra: Vec<String>,
}

impl ArtifactManifest {
    /// Stat every expected `<name>.png` in `dir`.
    ///
    /// With `since`, files older than that instant are left out of `extra`.
    pub fn inspect(dir: &Path, expected: &[String], since: Option<SystemTime>) -> Self {
        let expected_files: Vec<String> = expected.iter().map(|n| file_name(n)).collect();

        let statuses = expected_files
            .iter()
            .map(|name| {
                let path = dir.join(name);
                let size_bytes = std::fs::metadata(&path)
                    .ok()
                    .filter(|m| m.is_file())
                    .map(|m| m.len())
                    .unwrap_or(0);
                ArtifactStatus {
                    name: name.clone(),
                    path,
                    present: size_bytes > 0,
                    size_bytes,
                }
            })
            .collect();

        let known: HashSet<&str> = expected_files.iter().map(String::as_str).collect();
        // File mtimes come from a coarse clock
        let since = since.map(|t| t.checked_sub(MTIME_SLACK).unwrap_or(t));
        let mut extra: Vec<String> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "png"))
            .filter(|e| match since {
                Some(since) => e
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map_or(false, |modified| modified >= since),
                None => true,
            })
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| !known.contains(name.as_str()))
            .collect();
        extra.sort();

        Self {
            dir: dir.to_path_buf(),
            expected: statuses,
            extra,
        }
    }

    pub fn present_count(&self) -> usize {
        self.expected.iter().filter(|a| a.present).count()
    }

    /// Missing or empty artifacts
    pub fn missing(&self) -> Vec<&ArtifactStatus> {
        self.expected.iter().filter(|a| !a.present).collect()
    }
}

fn file_name(name: &str) -> String {
    if name.ends_with(".png") {
        name.to_string()
    } else {
        format!("{}.png", name)
    }
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
