pub mod driver;

pub use driver::{WebBrowser, WebDriverConfig, WebPage};
