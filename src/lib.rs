pub mod api;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod report;
pub mod runner;
pub mod suites;
pub mod utils;

// Re-export common items
pub use error::{HarnessError, HarnessResult};
pub use report::generate_report;
pub use runner::{inspect_artifacts, run_suites};
