//! Drives one suite through Setup, its check groups and the report

use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::api::ApiClient;
use crate::driver::BrowserFactory;
use crate::error::{describe, HarnessResult};
use crate::fixture::{Fixtures, PhoneGenerator};
use crate::report::manifest::ArtifactManifest;
use crate::report::types::RunReport;
use crate::runner::context::RunContext;
use crate::runner::events::{EventEmitter, RunEvent};
use crate::runner::state::CheckLog;
use crate::suites::Suite;
use crate::utils::HarnessConfig;

/// Runs suites against one browser
pub struct Harness {
    config: HarnessConfig,
    browser: Arc<dyn BrowserFactory>,
    events: EventEmitter,
    phones: Option<PhoneGenerator>,
}

impl Harness {
    pub fn new(config: HarnessConfig, browser: Arc<dyn BrowserFactory>, events: EventEmitter) -> Self {
        Self {
            config,
            browser,
            events,
            phones: None,
        }
    }

    /// Seed phone numbers from a fixed generator instead of the clock
    pub fn with_phones(mut self, phones: PhoneGenerator) -> Self {
        self.phones = Some(phones);
        self
    }

    fn context(&self) -> HarnessResult<RunContext> {
        let api = ApiClient::new(&self.config.api_base, self.config.default_timeout_ms.max(30_000))?;
        let phones = self.phones.clone().unwrap_or_default();
        let fixtures = Fixtures::new(api, phones, &self.config.verification_code);
        Ok(RunContext::new(
            self.config.clone(),
            fixtures,
            self.browser.clone(),
            CheckLog::new(self.events.clone()),
        ))
    }

    /// Setup → groups → report.
    ///
    /// A setup error becomes a single Fail and skips every group. A group
    /// error is recorded as a Fail for that group and the next group runs.
    /// Kept pages are closed on every path; the browser itself is left to
    /// the caller, which may run further suites on it.
    pub async fn run(&self, suite: &dyn Suite) -> HarnessResult<RunReport> {
        let started_at = Utc::now();
        let started_clock = SystemTime::now();
        let start = Instant::now();
        let groups = suite.groups();

        self.events.emit(RunEvent::RunStarted {
            suite: suite.name().to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            group_count: groups.len(),
        });

        let mut ctx = self.context()?;

        ctx.log.enter_group("setup");
        match suite.setup(&mut ctx).await {
            Ok(()) => {
                for group in &groups {
                    self.run_group(suite, &mut ctx, group).await;
                }
            }
            Err(e) => {
                error!("Setup of '{}' failed: {:#}", suite.name(), e);
                ctx.log.fail("Fixture setup", describe(&e));
            }
        }

        ctx.close_pages().await;

        let manifest = ArtifactManifest::inspect(
            &self.config.screenshots_dir,
            &suite.artifacts(),
            Some(started_clock),
        );
        let duration_ms = start.elapsed().as_millis() as u64;
        let report = RunReport::build(
            suite.name(),
            started_at,
            duration_ms,
            ctx.log.into_results(),
            manifest,
        );

        self.events.emit(RunEvent::RunFinished {
            suite: suite.name().to_string(),
            summary: report.summary.clone(),
            duration_ms,
        });
        info!(
            "Suite '{}' finished: {} passed, {} failed, {} warned",
            report.suite, report.summary.passed, report.summary.failed, report.summary.warned
        );

        Ok(report)
    }

    async fn run_group(&self, suite: &dyn Suite, ctx: &mut RunContext, group: &str) {
        let start = Instant::now();
        ctx.log.enter_group(group);
        self.events.emit(RunEvent::GroupStarted {
            group: group.to_string(),
        });

        let error = match suite.run_group(ctx, group).await {
            Ok(()) => None,
            Err(e) => {
                let detail = describe(&e);
                warn!("Group '{}' aborted: {}", group, detail);
                ctx.log.fail(&format!("{} (group aborted)", group), detail.clone());
                Some(detail)
            }
        };

        self.events.emit(RunEvent::GroupFinished {
            group: group.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        });
    }

    /// Close the browser; errors are logged, not returned
    pub async fn shutdown(&self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {:#}", e);
        }
    }
}
