//! Step plan for generating the saved report.
//!
//! Locator lists are ordered by how reliably they have matched the
//! dashboard's markup; the resolver tries them first to last.

use chrono::NaiveDate;
use std::time::Duration;

use crate::config::ReportConfig;
use crate::executor::CALENDAR_DATE_FORMAT;
use crate::types::StepSpec;

pub const DATE_RANGE_INPUT: &[&str] = &[
    "input[data-cy=\"qa-daterange-input\"]",
    "input[name=\"dateRange\"]",
];

pub const CALENDAR_POPUP: &[&str] = &[
    "div[data-cy=\"qa-daterange-calendar\"]",
    "div.react-datepicker__calendar",
    "div.react-datepicker",
    "div.MuiPopover-root",
];

pub const START_DATE_INPUT: &[&str] = &[
    "input[placeholder=\"Start date\"]",
    "input[data-cy=\"qa-daterange-start\"]",
];

pub const END_DATE_INPUT: &[&str] = &[
    "input[placeholder=\"End date\"]",
    "input[data-cy=\"qa-daterange-end\"]",
];

pub const RUN_REPORT_BUTTON: &[&str] = &[
    "button.qa-run-button",
    "button[data-cy=\"qa-run-button\"]",
];

pub const REPORT_ROWS: &[&str] = &[
    "div[data-cy=\"qa-report-grid\"] [role=\"row\"]",
    "table tbody tr",
];

/// Debug dump of the opened calendar
pub const CALENDAR_ARTIFACT: &str = "calendar.html";
pub const REPORT_ARTIFACT: &str = "report.html";
pub const SCREENSHOT_ARTIFACT: &str = "screenshot.png";

/// Each calendar locator gets this long before the next is tried
const CALENDAR_WAIT_PER_LOCATOR: Duration = Duration::from_secs(5);

/// Build the report's step list for the given day
pub fn report_plan(config: &ReportConfig, today: NaiveDate) -> Vec<StepSpec> {
    let (start, end) = config.date_range.resolve(today);
    let start = start.format(CALENDAR_DATE_FORMAT).to_string();
    let end = end.format(CALENDAR_DATE_FORMAT).to_string();

    vec![
        StepSpec::navigate(config.base_url.as_str()),
        StepSpec::navigate(config.report_url()),
        StepSpec::click(DATE_RANGE_INPUT.iter().copied()).with_timeout(Duration::from_secs(10)),
        StepSpec::wait_for(CALENDAR_POPUP.iter().copied())
            .with_timeout(CALENDAR_WAIT_PER_LOCATOR * CALENDAR_POPUP.len() as u32),
        StepSpec::dump_html(CALENDAR_ARTIFACT).optional(),
        StepSpec::fill(START_DATE_INPUT.iter().copied(), start),
        StepSpec::key_press(START_DATE_INPUT.iter().copied(), "Tab"),
        StepSpec::fill(END_DATE_INPUT.iter().copied(), end),
        StepSpec::key_press(END_DATE_INPUT.iter().copied(), "Enter"),
        StepSpec::click(RUN_REPORT_BUTTON.iter().copied()),
        StepSpec::wait_for(REPORT_ROWS.iter().copied()).with_timeout(config.report_timeout()),
        StepSpec::dump_html(REPORT_ARTIFACT),
        StepSpec::screenshot(SCREENSHOT_ARTIFACT),
    ]
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
