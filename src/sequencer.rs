use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::errors::{FailureKind, StepFailure};
use crate::executor::StepExecutor;
use crate::observer::RunObserver;
use crate::page::Page;
use crate::types::{FailedStep, RunResult, RunStatus, StepSpec};

/// Diagnostic DOM dump captured when a run aborts
pub const DIAGNOSTIC_HTML: &str = "failure.html";
/// Diagnostic screenshot captured when a run aborts
pub const DIAGNOSTIC_SCREENSHOT: &str = "failure.png";

/// Lifecycle of a single run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

/// Cooperative cancellation, honored only between steps
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Walks a step list strictly in order against one page.
///
/// A required step failure aborts the run after capturing the page's HTML
/// and a screenshot; an optional step failure is reported and passed over.
pub struct RunSequencer {
    executor: StepExecutor,
    observer: Arc<dyn RunObserver>,
    cancel: CancelFlag,
}

impl RunSequencer {
    pub fn new(executor: StepExecutor, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            executor,
            observer,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn run<P>(&self, page: &P, steps: &[StepSpec]) -> RunResult
    where
        P: Page + ?Sized,
    {
        self.transition(RunState::Idle);
        self.transition(RunState::Running);

        let mut artifacts = BTreeMap::new();
        let mut succeeded_steps = 0;
        let mut skipped_steps = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let failure = StepFailure::new(
                    FailureKind::Cancelled,
                    format!("run cancelled before step {}", index),
                );
                self.observer.step_failed(index, step, &failure);
                return self
                    .abort(page, index, failure, succeeded_steps, skipped_steps, artifacts)
                    .await;
            }

            self.observer.step_started(index, step);

            match self.executor.execute(step, page).await {
                Ok(artifact) => {
                    self.observer.step_succeeded(index, step, artifact.as_ref());
                    if let Some(artifact) = artifact {
                        artifacts.insert(artifact.name, artifact.bytes);
                    }
                    succeeded_steps += 1;
                }
                Err(failure) if step.optional => {
                    self.observer.step_skipped(index, step, &failure);
                    skipped_steps.push(index);
                }
                Err(failure) => {
                    self.observer.step_failed(index, step, &failure);
                    return self
                        .abort(page, index, failure, succeeded_steps, skipped_steps, artifacts)
                        .await;
                }
            }
        }

        self.transition(RunState::Completed);
        RunResult {
            status: RunStatus::Completed,
            succeeded_steps,
            failed_step: None,
            skipped_steps,
            artifacts,
        }
    }

    async fn abort<P>(
        &self,
        page: &P,
        index: usize,
        failure: StepFailure,
        succeeded_steps: usize,
        skipped_steps: Vec<usize>,
        mut artifacts: BTreeMap<String, Vec<u8>>,
    ) -> RunResult
    where
        P: Page + ?Sized,
    {
        let html = match page.html().await {
            Ok(html) => Some(html),
            Err(e) => {
                debug!("Could not capture diagnostic HTML: {:#}", e);
                None
            }
        };
        let screenshot = match page.screenshot().await {
            Ok(png) => Some(png),
            Err(e) => {
                debug!("Could not capture diagnostic screenshot: {:#}", e);
                None
            }
        };

        self.observer
            .diagnostics_captured(html.as_deref(), screenshot.as_deref());

        if let Some(html) = html {
            artifacts.insert(DIAGNOSTIC_HTML.to_string(), html.into_bytes());
        }
        if let Some(png) = screenshot {
            artifacts.insert(DIAGNOSTIC_SCREENSHOT.to_string(), png);
        }

        self.transition(RunState::Aborted);
        RunResult {
            status: RunStatus::Aborted,
            succeeded_steps,
            failed_step: Some(FailedStep::new(index, failure)),
            skipped_steps,
            artifacts,
        }
    }

    fn transition(&self, state: RunState) {
        self.observer.state_changed(state);
    }
}

#[cfg(test)]
#[path = "sequencer_test.rs"]
mod sequencer_test;
