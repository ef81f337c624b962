//! Raw HTTP access to the Tripful API
//!
//! Every call returns the status, decoded JSON body and headers. Whether a
//! non-2xx status is fatal is the caller's decision, see
//! [`ApiResponse::error_for_status`].

use log::debug;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};
use crate::fixture::Session;

/// Name of the auth cookie issued by verify-code
pub const AUTH_COOKIE: &str = "auth_token";

/// Decoded API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub path: String,
    pub status: u16,
    pub body: Value,
    pub headers: HeaderMap,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a status >= 400 into [`HarnessError::Http`]
    pub fn error_for_status(self) -> HarnessResult<Self> {
        if self.status >= 400 {
            return Err(HarnessError::Http {
                method: self.method.to_string(),
                path: self.path,
                status: self.status,
                body: truncate(&self.body.to_string(), 300),
            });
        }
        Ok(self)
    }

    /// JSON pointer lookup into the body, e.g. `/trip/id`
    pub fn at(&self, pointer: &str) -> Option<&Value> {
        self.body.pointer(pointer)
    }

    /// String at a JSON pointer, `None` when absent, null or empty
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.at(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Body rendered for a check detail
    pub fn body_snippet(&self, max: usize) -> String {
        truncate(&self.body.to_string(), max)
    }

    /// `auth_token` value from any `Set-Cookie` header
    pub fn auth_token(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| extract_cookie(cookie, AUTH_COOKIE))
    }
}

/// Pull `name=value` out of a cookie string such as `auth_token=abc; Path=/`
pub fn extract_cookie(cookie_string: &str, name: &str) -> Option<String> {
    cookie_string
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(name)?.strip_prefix('='))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

/// HTTP client bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout_ms: u64) -> HarnessResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Issue a request. Only transport failures are errors here.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        session: Option<&Session>,
    ) -> HarnessResult<ApiResponse> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.client.request(method.clone(), &url);

        if let Some(session) = session {
            req = req.header(COOKIE, session.cookie_header());
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "raw": text }))
        };

        debug!("{} {} -> {}", method, path, status);

        Ok(ApiResponse {
            method,
            path: path.to_string(),
            status,
            body,
            headers,
        })
    }

    pub async fn get(&self, path: &str, session: Option<&Session>) -> HarnessResult<ApiResponse> {
        self.send(Method::GET, path, None, session).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        session: Option<&Session>,
    ) -> HarnessResult<ApiResponse> {
        self.send(Method::POST, path, body, session).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: &Value,
        session: Option<&Session>,
    ) -> HarnessResult<ApiResponse> {
        self.send(Method::PUT, path, Some(body), session).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: Option<&Value>,
        session: Option<&Session>,
    ) -> HarnessResult<ApiResponse> {
        self.send(Method::PATCH, path, body, session).await
    }

    pub async fn delete(&self, path: &str, session: Option<&Session>) -> HarnessResult<ApiResponse> {
        self.send(Method::DELETE, path, None, session).await
    }
}
