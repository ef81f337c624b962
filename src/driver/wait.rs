//! Bounded polling, the only suspend point of a run
//!
//! Every wait in the harness goes through [`wait_for`]; there are no fixed
//! sleeps. Exhausting the budget yields [`HarnessError::Timeout`].

use log::debug;
use regex::Regex;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::driver::locator::{Locator, LocatorChain, Resolved};
use crate::driver::traits::PageDriver;
use crate::error::{HarnessError, HarnessResult};

/// Configuration for polling operations
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub use_exponential_backoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10000,
            initial_interval_ms: 100,
            max_interval_ms: 500,
            use_exponential_backoff: true,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Self::default()
        }
    }
}

/// Poll `probe` until it yields a value or the budget runs out.
///
/// The probe always runs at least once. Intervals grow by 1.5x up to
/// `max_interval_ms` when backoff is enabled.
pub async fn wait_for<T, F, Fut>(condition: &str, mut probe: F, config: &PollConfig) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut interval = config.initial_interval_ms.max(1);

    loop {
        if let Some(value) = probe().await {
            debug!("{} after {}ms", condition, start.elapsed().as_millis());
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(HarnessError::Timeout {
                condition: condition.to_string(),
                timeout_ms: config.timeout_ms,
            });
        }

        let remaining = timeout - elapsed;
        tokio::time::sleep(Duration::from_millis(interval).min(remaining)).await;

        if config.use_exponential_backoff {
            interval = (interval * 3 / 2).min(config.max_interval_ms.max(1));
        }
    }
}

/// [`wait_for`] for a plain boolean condition
pub async fn wait_until<F, Fut>(condition: &str, mut check_fn: F, config: &PollConfig) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    wait_for(
        condition,
        || {
            let fut = check_fn();
            async move { fut.await.then_some(()) }
        },
        config,
    )
    .await
}

/// Wait until at least one element matches `locator`
pub async fn wait_for_locator(
    page: &dyn PageDriver,
    locator: &Locator,
    config: &PollConfig,
) -> HarnessResult<()> {
    wait_until(
        &format!("{}", locator),
        || async move { page.count(locator).await.map(|n| n > 0).unwrap_or(false) },
        config,
    )
    .await
}

/// Wait until any candidate of `chain` matches, returning the winner
pub async fn wait_for_chain(
    page: &dyn PageDriver,
    chain: &LocatorChain,
    config: &PollConfig,
) -> HarnessResult<Resolved> {
    wait_for(
        chain.name(),
        || async move { chain.resolve(page).await.ok().flatten() },
        config,
    )
    .await
}

/// Wait until the body text contains `text`
pub async fn wait_for_text(page: &dyn PageDriver, text: &str, config: &PollConfig) -> HarnessResult<()> {
    wait_until(
        &format!("text '{}'", text),
        || async move {
            page.body_text()
                .await
                .map(|body| body.contains(text))
                .unwrap_or(false)
        },
        config,
    )
    .await
}

/// Wait until the current URL matches `pattern`; returns that URL
pub async fn wait_for_url(
    page: &dyn PageDriver,
    pattern: &Regex,
    config: &PollConfig,
) -> HarnessResult<String> {
    wait_for(
        &format!("URL matching /{}/", pattern.as_str()),
        || async move {
            page.current_url()
                .await
                .ok()
                .filter(|url| pattern.is_match(url))
        },
        config,
    )
    .await
}
