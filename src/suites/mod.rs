//! Verification suites: fixed check groups over one seeded Tripful run

pub mod invitation;
pub mod itinerary;
pub mod messaging;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::driver::wait::wait_until;
use crate::driver::{PageDriver, PollConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::runner::context::RunContext;

pub use invitation::InvitationSuite;
pub use itinerary::ItinerarySuite;
pub use messaging::MessagingSuite;

/// Names accepted by `--suite`, in the order `all` runs them
pub const SUITE_NAMES: &[&str] = &["messaging", "itinerary", "invitation"];

/// A fixed list of check groups plus the screenshots they should produce.
///
/// `setup` seeds fixtures; an error there skips every group. Each group runs
/// in isolation: an error aborts only that group.
#[async_trait]
pub trait Suite: Send + Sync {
    fn name(&self) -> &str;

    fn groups(&self) -> Vec<String>;

    /// Expected screenshot names, without extension
    fn artifacts(&self) -> Vec<String>;

    async fn setup(&self, ctx: &mut RunContext) -> Result<()>;

    async fn run_group(&self, ctx: &mut RunContext, group: &str) -> Result<()>;
}

pub fn suite_by_name(name: &str) -> Option<Box<dyn Suite>> {
    match name {
        "messaging" => Some(Box::new(MessagingSuite)),
        "itinerary" => Some(Box::new(ItinerarySuite::default())),
        "invitation" => Some(Box::new(InvitationSuite)),
        _ => None,
    }
}

/// Expand a `--suite` value; `all` yields every suite in order
pub fn resolve(name: &str) -> Result<Vec<Box<dyn Suite>>> {
    if name == "all" {
        return Ok(SUITE_NAMES.iter().filter_map(|n| suite_by_name(n)).collect());
    }
    match suite_by_name(name) {
        Some(suite) => Ok(vec![suite]),
        None => bail!(
            "Unknown suite '{}'. Expected one of: {}, all",
            name,
            SUITE_NAMES.join(", ")
        ),
    }
}

pub(crate) fn unknown_group(suite: &str, group: &str) -> anyhow::Error {
    HarnessError::AssertionGap(format!("suite '{}' has no group '{}'", suite, group)).into()
}

/// Turn a wait timeout into `None`; other errors pass through
pub(crate) fn optional<T>(res: HarnessResult<T>) -> HarnessResult<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(HarnessError::Timeout { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Wait until the page HTML mentions any of `needles` (case-insensitive)
pub(crate) async fn wait_for_content(
    page: &dyn PageDriver,
    needles: &[&str],
    poll: &PollConfig,
) -> HarnessResult<bool> {
    let condition = format!("page mentions {}", needles.join(" or "));
    let found = wait_until(
        &condition,
        || async move {
            page.content()
                .await
                .map(|html| mentions_any(&html, needles))
                .unwrap_or(false)
        },
        poll,
    )
    .await;
    Ok(optional(found)?.is_some())
}

pub(crate) fn mentions_any(text: &str, needles: &[&str]) -> bool {
    let lower = text.to_lowercase();
    needles.iter().any(|n| lower.contains(&n.to_lowercase()))
}
