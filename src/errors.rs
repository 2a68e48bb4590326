use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exit code for generic failures
pub const EXIT_COMMAND_ERROR: i32 = 1;
/// Exit code when the stored session is missing or unreadable
pub const EXIT_SESSION: i32 = 2;
/// Exit code when a run aborted on a required step
pub const EXIT_RUN_ABORTED: i32 = 3;
/// Exit code when the browser could not be launched
pub const EXIT_WEBDRIVER_FAILED: i32 = 4;

/// Why a step failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An interaction step exhausted its candidate locators
    SelectorNotFound,
    /// The target resolved but the action itself failed
    ActionFailed,
    /// A wait exceeded its budget
    Timeout,
    /// The run was cancelled at a step boundary
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::SelectorNotFound => "selector not found",
            FailureKind::ActionFailed => "action failed",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Failure of a single step
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {reason}")]
pub struct StepFailure {
    pub kind: FailureKind,
    pub reason: String,
    pub attempted_locators: Vec<String>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            attempted_locators: Vec::new(),
        }
    }

    pub fn with_locators(mut self, attempted: Vec<String>) -> Self {
        self.attempted_locators = attempted;
        self
    }

    pub fn action_failed(err: anyhow::Error) -> Self {
        Self::new(FailureKind::ActionFailed, format!("{err:#}"))
    }
}

/// Errors that stop a run before or around the step walk
#[derive(Debug, Error)]
pub enum RunError {
    /// No stored session was found (exit code 2)
    #[error("Session state missing: {0}")]
    SessionMissing(String),
    /// The stored session could not be decoded (exit code 2)
    #[error("Session state invalid: {0}")]
    SessionInvalid(String),
    /// Browser or WebDriver could not be started (exit code 4)
    #[error("Failed to launch browser: {0:#}")]
    LaunchFailed(anyhow::Error),
    /// Artifacts could not be written (exit code 1)
    #[error("Failed to persist artifacts: {0:#}")]
    Sink(anyhow::Error),
}

impl RunError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::SessionMissing(_) | RunError::SessionInvalid(_) => EXIT_SESSION,
            RunError::LaunchFailed(_) => EXIT_WEBDRIVER_FAILED,
            RunError::Sink(_) => EXIT_COMMAND_ERROR,
        }
    }

    /// Whether the run failed before any browser was launched
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            RunError::SessionMissing(_) | RunError::SessionInvalid(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunError::SessionMissing("x".into()).exit_code(), EXIT_SESSION);
        assert_eq!(RunError::SessionInvalid("x".into()).exit_code(), EXIT_SESSION);
        assert_eq!(
            RunError::LaunchFailed(anyhow::anyhow!("no driver")).exit_code(),
            EXIT_WEBDRIVER_FAILED
        );
        assert_eq!(
            RunError::Sink(anyhow::anyhow!("disk full")).exit_code(),
            EXIT_COMMAND_ERROR
        );
        assert!(RunError::SessionMissing("x".into()).is_preflight());
        assert!(!RunError::LaunchFailed(anyhow::anyhow!("x")).is_preflight());
    }

    #[test]
    fn test_step_failure_display() {
        let failure = StepFailure::new(FailureKind::Timeout, "no rows after 20s")
            .with_locators(vec!["tr".into()]);
        assert_eq!(failure.to_string(), "timeout: no rows after 20s");
        assert_eq!(failure.attempted_locators, vec!["tr".to_string()]);

        let failure = StepFailure::action_failed(anyhow::anyhow!("element detached"));
        assert_eq!(failure.kind, FailureKind::ActionFailed);
        assert_eq!(failure.reason, "element detached");
    }
}
