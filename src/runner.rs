//! One end-to-end run: session pre-flight, exclusive browser, step walk,
//! artifact persistence.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span, warn};

use crate::artifacts::ArtifactSink;
use crate::config::ReportConfig;
use crate::driver_manager::WebDriverManager;
use crate::errors::RunError;
use crate::executor::{ExecutorConfig, StepExecutor};
use crate::observer::RunObserver;
use crate::page::Page;
use crate::plan::report_plan;
use crate::resolver::DEFAULT_POLL_INTERVAL;
use crate::sequencer::{CancelFlag, RunSequencer};
use crate::session::{SessionState, SessionStore};
use crate::types::{FailedStep, RunResult, RunStatus};
use crate::webdriver::{Browser, BrowserSettings};

/// Produces a fresh, session-restored page for each run
#[async_trait]
pub trait PageLauncher: Send + Sync {
    type Page: Page;

    async fn launch(&self, session: &SessionState) -> Result<Self::Page>;
}

/// Launches a WebDriver browser, starting a local driver when needed
pub struct WebDriverLauncher {
    settings: BrowserSettings,
    drivers: WebDriverManager,
}

impl WebDriverLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            drivers: WebDriverManager::new(),
        }
    }

    /// Stop any driver processes this launcher started
    pub fn shutdown(&self) {
        self.drivers.stop_all();
    }
}

#[async_trait]
impl PageLauncher for WebDriverLauncher {
    type Page = Browser;

    async fn launch(&self, session: &SessionState) -> Result<Browser> {
        let url = match &self.settings.webdriver_url {
            Some(url) => url.clone(),
            None => self.drivers.ensure_driver(self.settings.browser_type).await?,
        };

        let browser = Browser::connect(&self.settings, &url).await?;
        if let Err(e) = browser.restore_session(session).await {
            if let Err(close_err) = browser.close().await {
                warn!("Failed to close browser after restore error: {}", close_err);
            }
            return Err(e);
        }
        Ok(browser)
    }
}

/// Summary of one run, as reported to callers
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub succeeded_steps: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<FailedStep>,
    pub skipped_steps: Vec<usize>,
    pub artifacts: Vec<String>,
    pub saved_to: Vec<PathBuf>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// One-line outcome for humans
    pub fn summary(&self) -> String {
        match &self.failed_step {
            None => format!(
                "Report captured: {} of {} steps ran, saved {}",
                self.succeeded_steps,
                self.total_steps,
                self.artifacts.join(", ")
            ),
            Some(failed) => format!(
                "Run aborted at step {} ({}): {}",
                failed.index, failed.kind, failed.reason
            ),
        }
    }
}

/// Something that can start a run on demand
#[async_trait]
pub trait RunTrigger: Send + Sync {
    async fn trigger(&self) -> Result<RunReport, RunError>;
}

/// Owns everything a run needs and allows one run at a time
pub struct Runner<L> {
    config: ReportConfig,
    sessions: SessionStore,
    launcher: L,
    sink: Arc<dyn ArtifactSink>,
    observer: Arc<dyn RunObserver>,
    cancel: CancelFlag,
    today: Option<NaiveDate>,
    gate: Mutex<()>,
}

impl<L: PageLauncher> Runner<L> {
    pub fn new(
        config: ReportConfig,
        sessions: SessionStore,
        launcher: L,
        sink: Arc<dyn ArtifactSink>,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            config,
            sessions,
            launcher,
            sink,
            observer,
            cancel: CancelFlag::new(),
            today: None,
            gate: Mutex::new(()),
        }
    }

    /// Pin the calendar day used for date-range policies
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Cancels the in-flight run at its next step boundary
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        // Session and page are exclusively owned by one run
        let _guard = self.gate.lock().await;
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", id = %&run_id[..8]);

        let result = self.run_exclusive(run_id).instrument(span).await;
        self.cancel.reset();
        result
    }

    async fn run_exclusive(&self, run_id: String) -> Result<RunReport, RunError> {
        let started_at = Utc::now();

        let session = self.sessions.load()?;
        let steps = report_plan(&self.config, self.today());
        info!(
            "Running report {} with {} steps",
            self.config.report_id,
            steps.len()
        );

        let page = self
            .launcher
            .launch(&session)
            .await
            .map_err(RunError::LaunchFailed)?;

        let executor = StepExecutor::new(ExecutorConfig {
            navigate_settle: self.config.navigate_settle(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        });
        let sequencer = RunSequencer::new(executor, self.observer.clone())
            .with_cancel_flag(self.cancel.clone());
        let result = sequencer.run(&page, &steps).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close browser: {:#}", e);
        }

        let saved_to = match self.sink.persist(&result.artifacts) {
            Ok(saved_to) => saved_to,
            Err(e) => {
                let unsaved = build_report(run_id, started_at, steps.len(), result, Vec::new());
                error!("{}", unsaved.summary());
                return Err(RunError::Sink(
                    e.context(format!("after run: {}", unsaved.summary())),
                ));
            }
        };
        let report = build_report(run_id, started_at, steps.len(), result, saved_to);
        info!("{}", report.summary());
        Ok(report)
    }
}

fn build_report(
    run_id: String,
    started_at: DateTime<Utc>,
    total_steps: usize,
    result: RunResult,
    saved_to: Vec<PathBuf>,
) -> RunReport {
    RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        status: result.status,
        succeeded_steps: result.succeeded_steps,
        total_steps,
        artifacts: result.artifact_names(),
        failed_step: result.failed_step,
        skipped_steps: result.skipped_steps,
        saved_to,
    }
}

#[async_trait]
impl<L: PageLauncher> RunTrigger for Runner<L> {
    async fn trigger(&self) -> Result<RunReport, RunError> {
        self.run().await
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
