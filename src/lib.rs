//! # reportgrab
#![allow(clippy::uninlined_format_args)]
//!
//! Drives a saved report on a field-service dashboard through WebDriver and
//! captures the rendered HTML and a full-page screenshot.
//!
//! The core is a small declarative step runner: each [`StepSpec`] names an
//! action and an ordered list of candidate locators, the
//! [`SelectorResolver`] picks the first candidate that shows up, and the
//! [`RunSequencer`] walks the plan, aborting on the first required failure
//! with a diagnostic HTML dump and screenshot.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Store the logged-in browser state once (Playwright storage-state JSON)
//! export REPORTGRAB_SESSION="$(base64 -w0 .auth/session.json)"
//!
//! # Check the stored session before launching anything
//! reportgrab session check
//!
//! # Print the step plan for the last 7 days
//! reportgrab plan --date-range last-7-days
//!
//! # Run once and write report.html / screenshot.png into ./artifacts
//! reportgrab run --output-dir artifacts
//!
//! # Serve GET /run and GET /artifacts/{name}
//! reportgrab serve --bind 0.0.0.0:8080
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use reportgrab::{RunSequencer, StepExecutor, StepSpec, TracingObserver};
//! use std::sync::Arc;
//!
//! # async fn example(page: reportgrab::Browser) -> anyhow::Result<()> {
//! let steps = vec![
//!     StepSpec::navigate("https://example.com"),
//!     StepSpec::wait_for(["h1"]),
//!     StepSpec::dump_html("page.html"),
//! ];
//! let sequencer = RunSequencer::new(StepExecutor::default(), Arc::new(TracingObserver));
//! let result = sequencer.run(&page, &steps).await;
//! println!("{} steps succeeded", result.succeeded_steps);
//! # Ok(())
//! # }
//! ```

/// Artifact persistence
pub mod artifacts;

/// Report configuration and date-range policies
pub mod config;

/// Automatic WebDriver process management
pub mod driver_manager;

/// Error taxonomy for steps and runs
pub mod errors;

/// Executes one step against a page
pub mod executor;

/// Run observation hooks
pub mod observer;

/// The page abstraction the core drives
pub mod page;

/// Step plan for the saved report
pub mod plan;

/// First-match-wins locator resolution
pub mod resolver;

/// Session, browser launch and exclusive run orchestration
pub mod runner;

/// Ordered step walk with fail-fast diagnostics
pub mod sequencer;

/// HTTP trigger
pub mod server;

/// Stored browser authentication state
pub mod session;

/// Step and run data types
pub mod types;

/// WebDriver implementation of the page abstraction
pub mod webdriver;

#[cfg(test)]
pub(crate) mod fake_page;

pub use artifacts::{ArtifactSink, DirectorySink};
pub use config::{DateRangePolicy, ReportConfig};
pub use errors::{FailureKind, RunError, StepFailure};
pub use executor::{ExecutorConfig, StepExecutor};
pub use observer::{RunObserver, TracingObserver};
pub use page::{Key, Page};
pub use resolver::{NotFound, Resolved, SelectorResolver};
pub use runner::{PageLauncher, RunReport, RunTrigger, Runner, WebDriverLauncher};
pub use sequencer::{CancelFlag, RunSequencer, RunState};
pub use session::{SessionState, SessionStore};
pub use types::{
    Artifact, FailedStep, OutputFormat, RunResult, RunStatus, StepKind, StepSpec, ViewportSize,
};
pub use webdriver::{Browser, BrowserSettings, BrowserType};
