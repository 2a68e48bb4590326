use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::{FailureKind, StepFailure};
use crate::page::{Key, Page};
use crate::resolver::{NotFound, Resolved, SelectorResolver};
use crate::types::{Artifact, StepKind, StepSpec};

/// Date format the dashboard's calendar inputs expect
pub const CALENDAR_DATE_FORMAT: &str = "%m/%d/%Y";

const ACCEPTED_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Result of executing one step: an artifact for capture steps
pub type StepOutcome = Result<Option<Artifact>, StepFailure>;

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Fixed delay after a navigation reaches `readyState == complete`
    pub navigate_settle: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            navigate_settle: Duration::from_secs(5),
            poll_interval: crate::resolver::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Normalize a date-like value to `MM/DD/YYYY`.
///
/// Values that don't parse as a date are returned unchanged.
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|date| date.format(CALENDAR_DATE_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Executes a single [`StepSpec`] against a page. Never retries.
#[derive(Clone, Debug, Default)]
pub struct StepExecutor {
    resolver: SelectorResolver,
    config: ExecutorConfig,
}

impl StepExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            resolver: SelectorResolver::new(config.poll_interval),
            config,
        }
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    pub async fn execute<P>(&self, step: &StepSpec, page: &P) -> StepOutcome
    where
        P: Page + ?Sized,
    {
        debug!("Executing {}", step.describe());

        match step.kind {
            StepKind::Navigate => {
                let url = required_value(step)?;
                self.navigate(page, url, step.timeout()).await?;
                Ok(None)
            }
            StepKind::Click => {
                let target = self.target(page, step, FailureKind::SelectorNotFound).await?;
                page.scroll_into_view(&target.element)
                    .await
                    .map_err(|e| action_failed_on(&target, e))?;
                page.click(&target.element)
                    .await
                    .map_err(|e| action_failed_on(&target, e))?;
                Ok(None)
            }
            StepKind::Fill => {
                let text = normalize_date(required_value(step)?);
                let target = self.target(page, step, FailureKind::SelectorNotFound).await?;
                page.fill(&target.element, &text)
                    .await
                    .map_err(|e| action_failed_on(&target, e))?;
                Ok(None)
            }
            StepKind::KeyPress => {
                let key: Key = required_value(step)?
                    .parse()
                    .map_err(StepFailure::action_failed)?;
                if step.candidate_locators.is_empty() {
                    page.press_key(None, key)
                        .await
                        .map_err(StepFailure::action_failed)?;
                } else {
                    let target = self.target(page, step, FailureKind::SelectorNotFound).await?;
                    page.press_key(Some(&target.element), key)
                        .await
                        .map_err(|e| action_failed_on(&target, e))?;
                }
                Ok(None)
            }
            StepKind::WaitFor => {
                let target = self.target(page, step, FailureKind::Timeout).await?;
                info!("Found '{}'", target.locator);
                Ok(None)
            }
            StepKind::Screenshot => {
                let bytes = page.screenshot().await.map_err(StepFailure::action_failed)?;
                Ok(Some(capture(step, bytes)))
            }
            StepKind::DumpHtml => {
                let html = page.html().await.map_err(StepFailure::action_failed)?;
                Ok(Some(capture(step, html.into_bytes())))
            }
            StepKind::Pause => {
                tokio::time::sleep(step.timeout()).await;
                Ok(None)
            }
        }
    }

    async fn navigate<P>(&self, page: &P, url: &str, timeout: Duration) -> Result<(), StepFailure>
    where
        P: Page + ?Sized,
    {
        info!("Navigating to {}", url);
        page.goto(url).await.map_err(StepFailure::action_failed)?;

        let deadline = Instant::now() + timeout;
        loop {
            match page.is_ready().await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => debug!("Readiness check failed: {:#}", e),
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StepFailure::new(
                    FailureKind::Timeout,
                    format!("{} did not finish loading within {:?}", url, timeout),
                ));
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }

        if !self.config.navigate_settle.is_zero() {
            tokio::time::sleep(self.config.navigate_settle).await;
        }
        Ok(())
    }

    async fn target<P>(
        &self,
        page: &P,
        step: &StepSpec,
        miss: FailureKind,
    ) -> Result<Resolved<P::Element>, StepFailure>
    where
        P: Page + ?Sized,
    {
        self.resolver
            .resolve(page, &step.candidate_locators, step.timeout())
            .await
            .map_err(|not_found| missed(miss, not_found))
    }
}

fn required_value(step: &StepSpec) -> Result<&str, StepFailure> {
    step.value.as_deref().ok_or_else(|| {
        StepFailure::new(
            FailureKind::ActionFailed,
            format!("{} step has no value", step.kind),
        )
    })
}

fn missed(kind: FailureKind, not_found: NotFound) -> StepFailure {
    StepFailure::new(kind, not_found.to_string()).with_locators(not_found.attempted)
}

fn action_failed_on<E>(target: &Resolved<E>, err: anyhow::Error) -> StepFailure {
    StepFailure::new(
        FailureKind::ActionFailed,
        format!("'{}': {:#}", target.locator, err),
    )
    .with_locators(vec![target.locator.clone()])
}

fn capture(step: &StepSpec, bytes: Vec<u8>) -> Artifact {
    Artifact {
        name: step.artifact_name().unwrap_or_default().to_string(),
        bytes,
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod executor_test;
