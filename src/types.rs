use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::{FailureKind, StepFailure};

/// Default per-step timeout in milliseconds
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 5_000;

/// Default artifact name for `dump-html` steps
pub const DEFAULT_HTML_ARTIFACT: &str = "report.html";

/// Default artifact name for `screenshot` steps
pub const DEFAULT_SCREENSHOT_ARTIFACT: &str = "screenshot.png";

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable simple format
    Simple,
}

/// Kind of UI interaction a step performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Load the URL in `value`
    Navigate,
    /// Click the first matching element
    Click,
    /// Clear and type `value` into the first matching element
    Fill,
    /// Press the key named by `value`
    KeyPress,
    /// Block until a locator resolves
    WaitFor,
    /// Capture page pixels
    Screenshot,
    /// Capture the serialized DOM
    DumpHtml,
    /// Sleep for the step timeout
    Pause,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepKind::Navigate => "navigate",
            StepKind::Click => "click",
            StepKind::Fill => "fill",
            StepKind::KeyPress => "key-press",
            StepKind::WaitFor => "wait-for",
            StepKind::Screenshot => "screenshot",
            StepKind::DumpHtml => "dump-html",
            StepKind::Pause => "pause",
        };
        f.write_str(name)
    }
}

/// One declarative browser action in a run sequence
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StepSpec {
    pub kind: StepKind,
    /// Tried in order, first match wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_locators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub timeout_ms: u64,
    /// Failure is logged and skipped instead of aborting the run
    #[serde(default)]
    pub optional: bool,
}

fn locators<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    candidates.into_iter().map(Into::into).collect()
}

impl StepSpec {
    fn new(kind: StepKind, candidate_locators: Vec<String>, value: Option<String>) -> Self {
        Self {
            kind,
            candidate_locators,
            value,
            timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            optional: false,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(StepKind::Navigate, Vec::new(), Some(url.into())).with_timeout_ms(60_000)
    }

    pub fn click<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StepKind::Click, locators(candidates), None)
    }

    pub fn fill<I, S>(candidates: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StepKind::Fill, locators(candidates), Some(value.into()))
    }

    /// Press `key` on the first matching element
    pub fn key_press<I, S>(candidates: I, key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StepKind::KeyPress, locators(candidates), Some(key.into()))
    }

    /// Press `key` on whatever element has focus
    pub fn key_press_active(key: impl Into<String>) -> Self {
        Self::new(StepKind::KeyPress, Vec::new(), Some(key.into()))
    }

    pub fn wait_for<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StepKind::WaitFor, locators(candidates), None)
    }

    pub fn screenshot(name: impl Into<String>) -> Self {
        Self::new(StepKind::Screenshot, Vec::new(), Some(name.into()))
    }

    pub fn dump_html(name: impl Into<String>) -> Self {
        Self::new(StepKind::DumpHtml, Vec::new(), Some(name.into()))
    }

    pub fn pause(delay: Duration) -> Self {
        Self::new(StepKind::Pause, Vec::new(), None).with_timeout(delay)
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_timeout_ms(timeout.as_millis() as u64)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Artifact name for capture steps, falling back to the well-known defaults
    pub fn artifact_name(&self) -> Option<&str> {
        match self.kind {
            StepKind::Screenshot => {
                Some(self.value.as_deref().unwrap_or(DEFAULT_SCREENSHOT_ARTIFACT))
            }
            StepKind::DumpHtml => Some(self.value.as_deref().unwrap_or(DEFAULT_HTML_ARTIFACT)),
            _ => None,
        }
    }

    /// Short human label used in logs
    pub fn describe(&self) -> String {
        match (&self.value, self.candidate_locators.first()) {
            (Some(value), Some(locator)) => format!("{} {} <- {}", self.kind, locator, value),
            (None, Some(locator)) => format!("{} {}", self.kind, locator),
            (Some(value), None) => format!("{} {}", self.kind, value),
            (None, None) => self.kind.to_string(),
        }
    }
}

/// Named bytes captured by a step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Terminal status of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// The step that aborted a run
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FailedStep {
    pub index: usize,
    pub kind: FailureKind,
    pub reason: String,
    pub attempted_locators: Vec<String>,
}

impl FailedStep {
    pub fn new(index: usize, failure: StepFailure) -> Self {
        Self {
            index,
            kind: failure.kind,
            reason: failure.reason,
            attempted_locators: failure.attempted_locators,
        }
    }
}

/// Outcome of one full sequence execution
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub succeeded_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<FailedStep>,
    /// Indices of optional steps that failed and were passed over
    pub skipped_steps: Vec<usize>,
    #[serde(skip)]
    pub artifacts: BTreeMap<String, Vec<u8>>,
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts.keys().cloned().collect()
    }
}

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Parse viewport size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
    pub fn parse(s: &str) -> Result<Self> {
        let Some((width, height)) = s.split_once('x') else {
            anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
        };

        let width = width
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
        let height = height
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

        Ok(ViewportSize { width, height })
    }
}

impl std::str::FromStr for ViewportSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
