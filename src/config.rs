use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::executor::normalize_date;

/// Which dates the report is generated for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRangePolicy {
    /// Start and end are today
    #[default]
    Today,
    /// The last `n` days, today included
    LastDays(u32),
    /// Explicit inclusive range
    Between(NaiveDate, NaiveDate),
}

impl DateRangePolicy {
    /// Concrete `(start, end)` for the given day
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            DateRangePolicy::Today => (today, today),
            DateRangePolicy::LastDays(n) => {
                let back = u64::from(n.saturating_sub(1));
                (today.checked_sub_days(Days::new(back)).unwrap_or(today), today)
            }
            DateRangePolicy::Between(start, end) => (start, end),
        }
    }
}

impl std::str::FromStr for DateRangePolicy {
    type Err = anyhow::Error;

    /// `today`, `last-<n>-days`, or `<start>..<end>`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("today") {
            return Ok(DateRangePolicy::Today);
        }

        if let Some(n) = s
            .strip_prefix("last-")
            .and_then(|rest| rest.strip_suffix("-days"))
        {
            let n: u32 = n
                .parse()
                .with_context(|| format!("Invalid day count in '{}'", s))?;
            if n == 0 {
                anyhow::bail!("Day count must be at least 1");
            }
            return Ok(DateRangePolicy::LastDays(n));
        }

        if let Some((start, end)) = s.split_once("..") {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            if end < start {
                anyhow::bail!("Date range ends before it starts: {}", s);
            }
            return Ok(DateRangePolicy::Between(start, end));
        }

        anyhow::bail!(
            "Invalid date range '{}'. Use today, last-<n>-days or <start>..<end>",
            s
        )
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let normalized = normalize_date(s);
    NaiveDate::parse_from_str(&normalized, crate::executor::CALENDAR_DATE_FORMAT)
        .with_context(|| format!("Invalid date: {}", s.trim()))
}

/// What to run: dashboard, report and timing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Dashboard root, e.g. `https://go.example.com`
    pub base_url: Url,
    /// Saved report identifier
    pub report_id: String,
    pub date_range: DateRangePolicy,
    /// Fixed wait after each navigation
    pub navigate_settle_ms: u64,
    /// How long the generated report may take to render
    pub report_timeout_ms: u64,
}

impl ReportConfig {
    pub fn new(base_url: &str, report_id: impl Into<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        Ok(Self {
            base_url,
            report_id: report_id.into(),
            date_range: DateRangePolicy::default(),
            navigate_settle_ms: 5_000,
            report_timeout_ms: 20_000,
        })
    }

    /// Single-page-app route of the saved report
    pub fn report_url(&self) -> String {
        let mut url = self.base_url.clone();
        url.set_fragment(Some(&format!("/new/reports/{}", self.report_id)));
        url.to_string()
    }

    pub fn navigate_settle(&self) -> Duration {
        Duration::from_millis(self.navigate_settle_ms)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }
}
