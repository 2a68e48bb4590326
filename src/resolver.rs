use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::page::Page;

/// Default interval between visibility polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An element found by one of the candidate locators
#[derive(Debug)]
pub struct Resolved<E> {
    pub element: E,
    /// The locator that matched
    pub locator: String,
    /// Position of that locator in the candidate list
    pub candidate_index: usize,
}

/// No candidate produced a visible element in time
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("no visible element for any of [{}] within {timeout_ms}ms", attempted.join(", "))]
pub struct NotFound {
    pub attempted: Vec<String>,
    pub timeout_ms: u64,
    /// Page errors seen while polling, one per failing locator
    pub errors: Vec<String>,
}

/// Finds the first candidate locator that matches a visible element.
///
/// Candidates are polled one after another, each for an equal share of the
/// overall timeout. Priority is purely ordinal: a later candidate is only
/// tried once every earlier one has used up its share.
#[derive(Clone, Debug)]
pub struct SelectorResolver {
    poll_interval: Duration,
}

impl Default for SelectorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl SelectorResolver {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn resolve<P>(
        &self,
        page: &P,
        candidates: &[String],
        timeout: Duration,
    ) -> Result<Resolved<P::Element>, NotFound>
    where
        P: Page + ?Sized,
    {
        let mut errors = Vec::new();

        if candidates.is_empty() {
            return Err(NotFound {
                attempted: Vec::new(),
                timeout_ms: timeout.as_millis() as u64,
                errors,
            });
        }

        let share = timeout / candidates.len() as u32;

        for (candidate_index, locator) in candidates.iter().enumerate() {
            let deadline = Instant::now() + share;
            let mut last_error = None;

            loop {
                match page.find_visible(locator).await {
                    Ok(Some(element)) => {
                        debug!("Resolved '{}' (candidate {})", locator, candidate_index);
                        return Ok(Resolved {
                            element,
                            locator: locator.clone(),
                            candidate_index,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => last_error = Some(format!("{locator}: {e:#}")),
                }

                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            }

            debug!("Locator '{}' did not match within {:?}", locator, share);
            errors.extend(last_error);
        }

        Err(NotFound {
            attempted: candidates.to_vec(),
            timeout_ms: timeout.as_millis() as u64,
            errors,
        })
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;
