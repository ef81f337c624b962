use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_WEB_BASE: &str = "http://localhost:3000";

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the REST API, including the `/api` prefix
    pub api_base: String,

    /// Base URL of the web front end
    pub web_base: String,

    /// Directory screenshots are written to
    pub screenshots_dir: PathBuf,

    /// Default budget for a single wait (ms)
    pub default_timeout_ms: u64,

    /// First poll interval of the wait primitive (ms)
    pub poll_interval_ms: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// Verification code accepted by the test deployment
    pub verification_code: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            screenshots_dir: PathBuf::from("./screenshots"),
            default_timeout_ms: 10_000,
            poll_interval_ms: 100,
            headless: true,
            verification_code: "123456".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `TRIPFUL_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TRIPFUL_API_BASE") {
            config.api_base = v;
        }
        if let Some(v) = lookup("TRIPFUL_WEB_BASE") {
            config.web_base = v;
        }
        if let Some(v) = lookup("TRIPFUL_SCREENSHOTS_DIR") {
            config.screenshots_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRIPFUL_HEADLESS") {
            config.headless = v == "true" || v == "1";
        }
        if let Some(ms) = lookup("TRIPFUL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.default_timeout_ms = ms;
        }

        config
    }

    /// Absolute API URL for a path such as `/trips`
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base, path)
    }

    /// Absolute front-end URL for a path such as `/trips/{id}`
    pub fn web_url(&self, path: &str) -> String {
        join_url(&self.web_base, path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRIPFUL_API_BASE", "http://api.test/api"),
            ("TRIPFUL_HEADLESS", "0"),
            ("TRIPFUL_TIMEOUT_MS", "2500"),
            ("TRIPFUL_SCREENSHOTS_DIR", "/tmp/shots"),
        ]
        .into_iter()
        .collect();

        let config = HarnessConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_base, "http://api.test/api");
        assert_eq!(config.web_base, DEFAULT_WEB_BASE);
        assert!(!config.headless);
        assert_eq!(config.default_timeout_ms, 2500);
        assert_eq!(config.screenshots_dir, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn test_bad_timeout_keeps_default() {
        let config = HarnessConfig::from_lookup(|k| {
            (k == "TRIPFUL_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(config.default_timeout_ms, 10_000);
    }

    #[test]
    fn test_url_joining() {
        let config = HarnessConfig::default();
        assert_eq!(config.api_url("/trips"), "http://localhost:8000/api/trips");
        assert_eq!(
            config.web_url("trips/abc"),
            "http://localhost:3000/trips/abc"
        );
    }
}
