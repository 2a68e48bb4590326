//! Stored browser authentication state.
//!
//! The session is a Playwright-style `storage_state` document captured by a
//! one-time interactive login. It is read before every run and never written.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::RunError;

/// Environment variable holding the session (raw or base64 JSON)
pub const SESSION_ENV_VAR: &str = "REPORTGRAB_SESSION";

/// Default session file, relative to the working directory
pub const DEFAULT_SESSION_FILE: &str = ".auth/session.json";

/// Cookies and per-origin localStorage of a logged-in browser
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Unix seconds; -1 for a session cookie
    #[serde(default = "session_cookie_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn session_cookie_expiry() -> f64 {
    -1.0
}

impl StoredCookie {
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires > 0.0 && self.expires < now_unix as f64
    }

    /// Host to visit before the browser will accept this cookie
    pub fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl SessionState {
    /// Decode raw JSON, or base64-encoded JSON
    pub fn parse(raw: &str) -> Result<Self, RunError> {
        let trimmed = raw.trim();
        let json = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|e| RunError::SessionInvalid(format!("not JSON or base64: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| RunError::SessionInvalid(format!("decoded session is not UTF-8: {e}")))?
        };

        let state: SessionState = serde_json::from_str(&json)
            .map_err(|e| RunError::SessionInvalid(format!("malformed storage state: {e}")))?;

        if state.is_empty() {
            return Err(RunError::SessionInvalid(
                "storage state has no cookies or origins".to_string(),
            ));
        }
        Ok(state)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }

    /// Cookies that have not expired at `now_unix`
    pub fn live_cookies(&self, now_unix: i64) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.iter().filter(move |c| !c.is_expired(now_unix))
    }

    /// Distinct cookie hosts, in first-seen order
    pub fn cookie_hosts(&self, now_unix: i64) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for cookie in self.live_cookies(now_unix) {
            if !hosts.iter().any(|h| h == cookie.host()) {
                hosts.push(cookie.host().to_string());
            }
        }
        hosts
    }
}

/// Where the session is read from: the env var wins over the file
#[derive(Debug, Clone)]
pub struct SessionStore {
    env_var: Option<String>,
    file: PathBuf,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Some(SESSION_ENV_VAR.to_string()), DEFAULT_SESSION_FILE)
    }
}

impl SessionStore {
    pub fn new(env_var: Option<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            env_var,
            file: file.into(),
        }
    }

    /// File-only store
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        Self::new(None, file)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn load(&self) -> Result<SessionState, RunError> {
        if let Some(var) = &self.env_var
            && let Ok(raw) = std::env::var(var)
            && !raw.trim().is_empty()
        {
            debug!("Loading session from ${}", var);
            let state = SessionState::parse(&raw)?;
            info!(
                "Loaded session from ${} ({} cookies, {} origins)",
                var,
                state.cookies.len(),
                state.origins.len()
            );
            return Ok(state);
        }

        if !self.file.exists() {
            let mut msg = format!("{} does not exist", self.file.display());
            if let Some(var) = &self.env_var {
                msg.push_str(&format!(" and ${} is not set", var));
            }
            return Err(RunError::SessionMissing(msg));
        }

        let raw = std::fs::read_to_string(&self.file).map_err(|e| {
            RunError::SessionMissing(format!("cannot read {}: {}", self.file.display(), e))
        })?;
        let state = SessionState::parse(&raw)?;
        info!(
            "Loaded session from {} ({} cookies, {} origins)",
            self.file.display(),
            state.cookies.len(),
            state.origins.len()
        );
        Ok(state)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
