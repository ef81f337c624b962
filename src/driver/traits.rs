use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::driver::locator::Locator;
use crate::fixture::Session;

/// Browser window size used for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub label: &'static str,
}

impl Viewport {
    pub const MOBILE: Viewport = Viewport {
        width: 375,
        height: 667,
        label: "mobile",
    };

    pub const DESKTOP: Viewport = Viewport {
        width: 1280,
        height: 720,
        label: "desktop",
    };

    /// Tall desktop window used for full-page review screenshots
    pub const REVIEW: Viewport = Viewport {
        width: 1280,
        height: 1080,
        label: "review",
    };
}

/// Element bounds in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A single page in its own browser context.
///
/// Locator arguments address the first matching element.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching `locator`
    async fn count(&self, locator: &Locator) -> Result<usize>;

    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    /// Rendered text of `<body>`
    async fn body_text(&self) -> Result<String>;

    /// Full HTML of the page
    async fn content(&self) -> Result<String>;

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    async fn bounding_box(&self, locator: &Locator) -> Result<Option<ElementBox>>;

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()>;

    /// Console errors logged since the page opened
    async fn console_errors(&self) -> Result<Vec<String>>;

    /// Inject the session's auth cookie into this page's context
    async fn set_session(&self, session: &Session) -> Result<()>;

    /// Close the page and its context. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Opens isolated pages and owns every one it opened
#[async_trait]
pub trait BrowserFactory: Send + Sync {
    /// New context + page, authenticated as `session` when given
    async fn open_page(
        &self,
        viewport: Viewport,
        session: Option<&Session>,
    ) -> Result<Arc<dyn PageDriver>>;

    /// Close all pages still open, then the browser
    async fn close(&self) -> Result<()>;
}
