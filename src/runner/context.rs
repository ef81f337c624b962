use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::driver::{BrowserFactory, PageDriver, PollConfig, Viewport};
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::{FixtureContext, Fixtures, Session};
use crate::runner::state::CheckLog;
use crate::utils::HarnessConfig;

/// Everything a suite touches during one run
pub struct RunContext {
    pub config: HarnessConfig,
    pub fixtures: Fixtures,
    /// Sessions and entity ids created by setup
    pub data: FixtureContext,
    pub log: CheckLog,
    pub browser: Arc<dyn BrowserFactory>,
    /// Pages kept across check groups, by name
    pages: HashMap<String, Arc<dyn PageDriver>>,
}

impl RunContext {
    pub fn new(
        config: HarnessConfig,
        fixtures: Fixtures,
        browser: Arc<dyn BrowserFactory>,
        log: CheckLog,
    ) -> Self {
        // Always ensure screenshots directory exists
        let _ = std::fs::create_dir_all(&config.screenshots_dir);

        Self {
            config,
            fixtures,
            data: FixtureContext::new(),
            log,
            browser,
            pages: HashMap::new(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        self.fixtures.api()
    }

    /// Poll budget for UI waits
    pub fn poll(&self) -> PollConfig {
        PollConfig {
            timeout_ms: self.config.default_timeout_ms,
            initial_interval_ms: self.config.poll_interval_ms,
            ..PollConfig::default()
        }
    }

    pub fn web_url(&self, path: &str) -> String {
        self.config.web_url(path)
    }

    /// Open a page and keep it under `name` for later groups
    pub async fn open_page(
        &mut self,
        name: &str,
        viewport: Viewport,
        session: Option<&Session>,
    ) -> Result<Arc<dyn PageDriver>> {
        let page = self.browser.open_page(viewport, session).await?;
        if let Some(previous) = self.pages.insert(name.to_string(), page.clone()) {
            previous.close().await?;
        }
        Ok(page)
    }

    pub fn page(&self, name: &str) -> HarnessResult<Arc<dyn PageDriver>> {
        self.pages
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::AssertionGap(format!("page '{}' was never opened", name)))
    }

    pub async fn close_page(&mut self, name: &str) -> Result<()> {
        if let Some(page) = self.pages.remove(name) {
            page.close().await?;
        }
        Ok(())
    }

    /// Close every kept page
    pub async fn close_pages(&mut self) {
        for (name, page) in self.pages.drain() {
            if let Err(e) = page.close().await {
                log::warn!("Failed to close page '{}': {:#}", name, e);
            }
        }
    }

    /// Path for screenshot `name` (without extension)
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.config.screenshots_dir.join(format!("{}.png", name))
    }

    /// Capture `page` as `<name>.png`; returns the file name
    pub async fn screenshot(&self, page: &dyn PageDriver, name: &str, full_page: bool) -> Result<String> {
        let path = self.screenshot_path(name);
        page.screenshot(&path, full_page).await?;
        log::debug!("Screenshot: {}", path.display());
        Ok(format!("{}.png", name))
    }
}
