//! Browser pages backed by Playwright
//!
//! One Chromium process per run; every page lives in its own context so
//! each simulated user keeps separate cookies.

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use log::{debug, warn};
use playwright::api::{Browser, BrowserContext, Cookie, Page, Viewport as PwViewport};
use playwright::Playwright;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::AUTH_COOKIE;
use crate::driver::locator::Locator;
use crate::driver::traits::{BrowserFactory, ElementBox, PageDriver, Viewport};
use crate::error::HarnessError;
use crate::fixture::Session;
use crate::utils::binary_resolver;
use crate::utils::HarnessConfig;

/// Records console errors into a page global and strips the Next.js dev
/// overlay, which otherwise intercepts clicks.
const INIT_SCRIPT: &str = r#"
(() => {
  window.__harnessConsoleErrors = [];
  const push = (msg) => window.__harnessConsoleErrors.push(String(msg));
  const original = console.error.bind(console);
  console.error = (...args) => { push(args.map(String).join(' ')); original(...args); };
  window.addEventListener('error', (e) => push(e.message || e));
  window.addEventListener('unhandledrejection', (e) => push(e.reason));

  const removePortal = () => {
    document.querySelectorAll('nextjs-portal').forEach((el) => el.remove());
    document.querySelectorAll('script[data-nextjs-dev-overlay="true"]').forEach((el) => el.remove());
  };
  const observe = () => {
    removePortal();
    new MutationObserver(removePortal).observe(document.body, { childList: true, subtree: true });
  };
  if (document.body) observe();
  else document.addEventListener('DOMContentLoaded', observe);
})();
"#;

/// Web driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub headless: bool,
    /// Front-end origin cookies are scoped to
    pub base_url: String,
    /// Browser binary; `None` uses Playwright's bundled Chromium
    pub executable: Option<PathBuf>,
}

impl WebDriverConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            headless: config.headless,
            base_url: config.web_base.clone(),
            executable: binary_resolver::find_browser(),
        }
    }
}

/// Chromium instance handing out isolated pages
pub struct WebBrowser {
    #[allow(dead_code)]
    playwright: Playwright,
    browser: Browser,
    config: WebDriverConfig,
    pages: Mutex<Vec<Arc<WebPage>>>,
}

impl WebBrowser {
    pub async fn launch(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .map_err(|e| browser_error("initialize Playwright", e))?;

        let browser = launch_chromium_browser(&playwright.chromium(), &config).await?;

        Ok(Self {
            playwright,
            browser,
            config,
            pages: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BrowserFactory for WebBrowser {
    async fn open_page(
        &self,
        viewport: Viewport,
        session: Option<&Session>,
    ) -> Result<Arc<dyn PageDriver>> {
        let context = self.browser.context_builder().build().await?;
        context.add_init_script(INIT_SCRIPT).await?;

        let page = context.new_page().await?;
        page.set_viewport_size(PwViewport {
            width: viewport.width as i32,
            height: viewport.height as i32,
        })
        .await?;

        let web_page = Arc::new(WebPage {
            base_url: self.config.base_url.clone(),
            context,
            page: Mutex::new(page),
            closed: AtomicBool::new(false),
        });

        if let Some(session) = session {
            web_page.set_session(session).await?;
        }

        debug!(
            "Opened {} page ({}x{}) as {}",
            viewport.label,
            viewport.width,
            viewport.height,
            session.map(|s| s.display_name.as_str()).unwrap_or("anonymous")
        );

        track_open(&mut *self.pages.lock().await, web_page.clone(), WebPage::is_closed);
        Ok(web_page)
    }

    async fn close(&self) -> Result<()> {
        for page in self.pages.lock().await.drain(..) {
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {:#}", e);
            }
        }
        self.browser.close().await?;
        Ok(())
    }
}

/// Page in its own browser context
pub struct WebPage {
    base_url: String,
    context: BrowserContext,
    page: Mutex<Page>,
    closed: AtomicBool,
}

impl WebPage {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Remember `page`, forgetting pages that were closed since
fn track_open<P>(pages: &mut Vec<Arc<P>>, page: Arc<P>, is_closed: impl Fn(&P) -> bool) {
    pages.retain(|p| !is_closed(p));
    pages.push(page);
}

fn browser_error(action: &str, err: impl std::fmt::Debug) -> HarnessError {
    HarnessError::Browser(format!("{} failed: {:?}", action, err))
}

#[async_trait]
impl PageDriver for WebPage {
    async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .map_err(|e| browser_error(&format!("navigate to {}", url), e))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.url()?)
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let page = self.page.lock().await;
        let elements = page.query_selector_all(&locator.to_playwright()).await?;
        Ok(elements.len())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let page = self.page.lock().await;
        match page.query_selector(&locator.to_playwright()).await? {
            Some(el) => Ok(el.is_visible().await?),
            None => Ok(false),
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let page = self.page.lock().await;
        let sel = locator.to_playwright();
        page.click_builder(&sel)
            .click()
            .await
            .map_err(|e| browser_error(&format!("click {}", sel), e))?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        let sel = locator.to_playwright();
        page.fill_builder(&sel, text)
            .fill()
            .await
            .map_err(|e| browser_error(&format!("fill {}", sel), e))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.keyboard.down(key).await?;
        page.keyboard.up(key).await?;
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.inner_text("body", None).await?)
    }

    async fn content(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.content().await?)
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let page = self.page.lock().await;
        match page.query_selector(&locator.to_playwright()).await? {
            Some(el) => Ok(el.get_attribute(name).await?),
            None => Ok(None),
        }
    }

    async fn bounding_box(&self, locator: &Locator) -> Result<Option<ElementBox>> {
        let page = self.page.lock().await;
        let Some(el) = page.query_selector(&locator.to_playwright()).await? else {
            return Ok(None);
        };
        Ok(el.bounding_box().await?.map(|b| ElementBox {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
        }))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        let page = self.page.lock().await;
        if let Some(el) = page.query_selector(&locator.to_playwright()).await? {
            el.scroll_into_view_if_needed(None).await?;
        }
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        let page = self.page.lock().await;
        page.evaluate::<(), ()>("() => window.scrollTo(0, document.body.scrollHeight)", ())
            .await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        let page = self.page.lock().await;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        page.screenshot_builder()
            .path(path.to_path_buf())
            .full_page(full_page)
            .screenshot()
            .await?;
        Ok(())
    }

    async fn console_errors(&self) -> Result<Vec<String>> {
        let page = self.page.lock().await;
        let errors: Vec<String> = page
            .evaluate::<(), Vec<String>>("() => window.__harnessConsoleErrors || []", ())
            .await?;
        Ok(errors)
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        let cookie = Cookie::with_url(AUTH_COOKIE, session.token.as_str(), self.base_url.as_str());
        self.context.add_cookies(&[cookie]).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let page = self.page.lock().await;
        page.close(None).await.ok();
        self.context.close().await?;
        Ok(())
    }
}

/// Launch Chromium with the sandbox flags CI containers need
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher();
    launcher = launcher.headless(config.headless);

    if let Some(ref path) = config.executable {
        println!("{} Using browser: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else {
        println!(
            "{} No browser executable found. Using Playwright's bundled Chromium",
            "ℹ".blue()
        );
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}
