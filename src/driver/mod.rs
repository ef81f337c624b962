pub mod locator;
pub mod traits;
pub mod wait;
pub mod web;

#[cfg(test)]
pub(crate) mod fake;

pub use locator::{Locator, LocatorChain, Resolved};
pub use traits::{BrowserFactory, ElementBox, PageDriver, Viewport};
pub use wait::PollConfig;
pub use web::{WebBrowser, WebDriverConfig, WebPage};
