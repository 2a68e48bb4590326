//! Run observation hooks.
//!
//! The sequencer reports progress through a [`RunObserver`] instead of
//! logging inline; [`TracingObserver`] is the default sink.

use base64::Engine;
use tracing::{debug, error, info, trace, warn};

use crate::errors::StepFailure;
use crate::sequencer::RunState;
use crate::types::{Artifact, StepSpec};

/// Characters of diagnostic HTML echoed into the log
pub const HTML_PREVIEW_CHARS: usize = 3_000;

/// Receives run progress. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    fn state_changed(&self, _state: RunState) {}

    fn step_started(&self, _index: usize, _step: &StepSpec) {}

    fn step_succeeded(&self, _index: usize, _step: &StepSpec, _artifact: Option<&Artifact>) {}

    /// An optional step failed and the run moves on
    fn step_skipped(&self, _index: usize, _step: &StepSpec, _failure: &StepFailure) {}

    /// A required step failed and the run is aborting
    fn step_failed(&self, _index: usize, _step: &StepSpec, _failure: &StepFailure) {}

    fn diagnostics_captured(&self, _html: Option<&str>, _screenshot: Option<&[u8]>) {}
}

/// Observer that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// Observer that turns run progress into tracing events
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn state_changed(&self, state: RunState) {
        debug!("Run state: {:?}", state);
    }

    fn step_started(&self, index: usize, step: &StepSpec) {
        info!("Step {}: {}", index, step.describe());
    }

    fn step_succeeded(&self, index: usize, _step: &StepSpec, artifact: Option<&Artifact>) {
        match artifact {
            Some(artifact) => info!(
                "Step {} captured {} ({} bytes)",
                index,
                artifact.name,
                artifact.bytes.len()
            ),
            None => debug!("Step {} done", index),
        }
    }

    fn step_skipped(&self, index: usize, step: &StepSpec, failure: &StepFailure) {
        warn!("Optional step {} ({}) skipped: {}", index, step.kind, failure);
    }

    fn step_failed(&self, index: usize, step: &StepSpec, failure: &StepFailure) {
        error!("Step {} ({}) failed: {}", index, step.kind, failure);
        if !failure.attempted_locators.is_empty() {
            error!("Tried: {}", failure.attempted_locators.join(", "));
        }
    }

    fn diagnostics_captured(&self, html: Option<&str>, screenshot: Option<&[u8]>) {
        if let Some(html) = html {
            debug!("Page HTML at failure:\n{}", preview(html, HTML_PREVIEW_CHARS));
        }
        if let Some(png) = screenshot {
            trace!(
                "Screenshot at failure (base64):\n{}",
                base64::engine::general_purpose::STANDARD.encode(png)
            );
        }
    }
}

/// Prefix of `html` cut at a char boundary
pub fn preview(html: &str, max_chars: usize) -> &str {
    match html.char_indices().nth(max_chars) {
        Some((end, _)) => &html[..end],
        None => html,
    }
}
