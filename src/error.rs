//! Error taxonomy for verification runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Seed data could not be created; later checks have nothing to act on.
    #[error("Fixture setup failed at '{step}': {detail}")]
    Fixture { step: String, detail: String },

    #[error("HTTP {status} from {method} {path}: {body}")]
    Http {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Timed out after {timeout_ms}ms waiting for {condition}")]
    Timeout { condition: String, timeout_ms: u64 },

    #[error("Expected element or text not present: {0}")]
    AssertionGap(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn fixture(step: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        HarnessError::Fixture {
            step: step.into(),
            detail: detail.to_string(),
        }
    }

    /// Short tag used in check details and logs
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Fixture { .. } => "FixtureError",
            HarnessError::Http { .. } => "HttpError",
            HarnessError::Timeout { .. } => "TimeoutError",
            HarnessError::AssertionGap(_) => "AssertionGap",
            HarnessError::Browser(_) => "BrowserError",
            HarnessError::Transport(_) => "TransportError",
            HarnessError::Io(_) => "IoError",
            HarnessError::Json(_) => "JsonError",
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Describe an `anyhow` error, naming the harness error kind when there is one.
pub fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<HarnessError>() {
        Some(e) => format!("[{}] {:#}", e.kind(), err),
        None => format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_names_kind() {
        let err = anyhow::Error::new(HarnessError::Timeout {
            condition: "selector 'h1'".to_string(),
            timeout_ms: 500,
        });
        let text = describe(&err);
        assert!(text.starts_with("[TimeoutError]"));
        assert!(text.contains("500ms"));

        let plain = anyhow::anyhow!("boom");
        assert_eq!(describe(&plain), "boom");
    }

    #[test]
    fn test_http_error_display() {
        let err = HarnessError::Http {
            method: "POST".to_string(),
            path: "/trips".to_string(),
            status: 403,
            body: "{}".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403 from POST /trips: {}");
        assert_eq!(err.kind(), "HttpError");
    }
}
