//! Scripted in-memory browser for unit tests.
//!
//! A router closure maps `(url, signed-in display name)` to the screen that
//! navigation lands on. Text locators also match against the screen text.

use anyhow::{bail, Result};
use async_trait::async_trait;
use regex::RegexBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::driver::locator::Locator;
use crate::driver::traits::{BrowserFactory, ElementBox, PageDriver, Viewport};
use crate::fixture::Session;

/// What the page shows after a navigation
#[derive(Debug, Clone, Default)]
pub struct FakeScreen {
    redirect: Option<String>,
    text: String,
    html: String,
    elements: HashMap<String, usize>,
    attributes: HashMap<(String, String), String>,
    boxes: HashMap<String, ElementBox>,
    clicks: HashMap<String, String>,
    console_errors: Vec<String>,
}

impl FakeScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn with(mut self, locator: &Locator) -> Self {
        *self.elements.entry(locator.to_playwright()).or_default() += 1;
        self
    }

    pub fn with_box(mut self, locator: &Locator, height: f64) -> Self {
        let key = locator.to_playwright();
        self.elements.entry(key.clone()).or_insert(1);
        self.boxes.insert(
            key,
            ElementBox {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height,
            },
        );
        self
    }

    pub fn with_attr(mut self, locator: &Locator, name: &str, value: &str) -> Self {
        let key = locator.to_playwright();
        self.elements.entry(key.clone()).or_insert(1);
        self.attributes.insert((key, name.to_string()), value.to_string());
        self
    }

    /// Clicking `locator` navigates to `url`
    pub fn on_click(mut self, locator: &Locator, url: &str) -> Self {
        let key = locator.to_playwright();
        self.elements.entry(key.clone()).or_insert(1);
        self.clicks.insert(key, url.to_string());
        self
    }

    /// Navigation ends on `url` instead of the requested one
    pub fn redirect(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn console_error(mut self, message: &str) -> Self {
        self.console_errors.push(message.to_string());
        self
    }

    fn count(&self, locator: &Locator) -> usize {
        if let Some(n) = self.elements.get(&locator.to_playwright()) {
            return *n;
        }
        let found = match locator {
            Locator::Text(text) => self.text.lines().any(|l| l.trim() == text),
            Locator::TextRegex {
                pattern,
                case_insensitive,
            } => RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .build()
                .map(|re| re.is_match(&self.text))
                .unwrap_or(false),
            _ => false,
        };
        usize::from(found)
    }
}

type Router = dyn Fn(&str, Option<&str>) -> FakeScreen + Send + Sync;

#[derive(Default)]
struct PageState {
    url: String,
    screen: FakeScreen,
    user: Option<String>,
    closed: bool,
}

/// Page over a [`FakeScreen`] router; records what the harness did to it
pub struct FakePage {
    router: Arc<Router>,
    pub viewport: Viewport,
    state: Mutex<PageState>,
    pub actions: Mutex<Vec<String>>,
}

impl FakePage {
    fn log(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn navigate(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        let screen = (self.router)(url, state.user.as_deref());
        state.url = screen.redirect.clone().unwrap_or_else(|| url.to_string());
        state.screen = screen;
    }

    fn screen(&self) -> Result<FakeScreen> {
        let state = self.state.lock().unwrap();
        if state.closed {
            bail!("page is closed");
        }
        Ok(state.screen.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.screen()?;
        self.log(format!("goto {}", url));
        self.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.screen()?.count(locator))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.screen()?.count(locator) > 0)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let screen = self.screen()?;
        if screen.count(locator) == 0 {
            bail!("no element for {}", locator);
        }
        self.log(format!("click {}", locator.to_playwright()));
        if let Some(url) = screen.clicks.get(&locator.to_playwright()) {
            self.navigate(url);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        if self.screen()?.count(locator) == 0 {
            bail!("no element for {}", locator);
        }
        self.log(format!("fill {} {}", locator.to_playwright(), text));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.log(format!("press {}", key));
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.screen()?.text)
    }

    async fn content(&self) -> Result<String> {
        let screen = self.screen()?;
        Ok(if screen.html.is_empty() {
            screen.text
        } else {
            screen.html
        })
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let screen = self.screen()?;
        Ok(screen
            .attributes
            .get(&(locator.to_playwright(), name.to_string()))
            .cloned())
    }

    async fn bounding_box(&self, locator: &Locator) -> Result<Option<ElementBox>> {
        Ok(self.screen()?.boxes.get(&locator.to_playwright()).copied())
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.log(format!("scroll {}", locator.to_playwright()));
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.log("scroll bottom".to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<()> {
        self.screen()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG fake")?;
        Ok(())
    }

    async fn console_errors(&self) -> Result<Vec<String>> {
        Ok(self.screen()?.console_errors)
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        self.state.lock().unwrap().user = Some(session.display_name.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Factory handing out [`FakePage`]s that share one router
pub struct FakeBrowser {
    router: Arc<Router>,
    pub pages: Mutex<Vec<Arc<FakePage>>>,
    closed: Mutex<bool>,
}

impl FakeBrowser {
    pub fn new<F>(router: F) -> Self
    where
        F: Fn(&str, Option<&str>) -> FakeScreen + Send + Sync + 'static,
    {
        Self {
            router: Arc::new(router),
            pages: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Every URL shows the same screen
    pub fn single(screen: FakeScreen) -> Self {
        Self::new(move |_, _| screen.clone())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    pub fn all_pages_closed(&self) -> bool {
        self.pages.lock().unwrap().iter().all(|p| p.is_closed())
    }

    pub fn opened(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}

#[async_trait]
impl BrowserFactory for FakeBrowser {
    async fn open_page(
        &self,
        viewport: Viewport,
        session: Option<&Session>,
    ) -> Result<Arc<dyn PageDriver>> {
        let page = Arc::new(FakePage {
            router: self.router.clone(),
            viewport,
            state: Mutex::new(PageState {
                user: session.map(|s| s.display_name.clone()),
                ..PageState::default()
            }),
            actions: Mutex::new(Vec::new()),
        });
        self.pages.lock().unwrap().push(page.clone());
        Ok(page)
    }

    async fn close(&self) -> Result<()> {
        for page in self.pages.lock().unwrap().iter() {
            page.state.lock().unwrap().closed = true;
        }
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}
