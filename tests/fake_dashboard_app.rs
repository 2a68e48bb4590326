// Scripted dashboard shared between the end-to-end tests and the standalone binary.
//
// The page mimics the saved-report screen: a date-range input that opens a
// react-datepicker style popup, start/end fields, a run button, and a grid
// that renders a moment after the run is requested. Without the session
// token in localStorage it shows a login wall instead.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

/// localStorage key the page treats as a login
pub const SESSION_TOKEN_KEY: &str = "dashboard-token";

/// Delay between clicking Run and the grid rendering
pub const GRID_DELAY_MS: u64 = 500;

#[derive(Clone, Default)]
pub struct DashboardState {
    runs: Arc<Mutex<Vec<ReportRun>>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReportRun {
    pub report_id: String,
    pub start: String,
    pub end: String,
}

pub fn create_app() -> Router {
    create_app_with_state(DashboardState::default())
}

pub fn create_app_with_state(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/reports/:id/runs", post(record_run).get(list_runs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn record_run(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
    Json(mut run): Json<ReportRun>,
) -> Json<ReportRun> {
    run.report_id = id;
    state.runs.lock().await.push(run.clone());
    Json(run)
}

async fn list_runs(State(state): State<DashboardState>, Path(id): Path<String>) -> Json<Vec<ReportRun>> {
    let runs = state.runs.lock().await;
    Json(runs.iter().filter(|r| r.report_id == id).cloned().collect())
}

async fn dashboard_page() -> Html<String> {
    Html(DASHBOARD_HTML.replace("{{TOKEN_KEY}}", SESSION_TOKEN_KEY).replace(
        "{{GRID_DELAY_MS}}",
        &GRID_DELAY_MS.to_string(),
    ))
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Fake Dashboard</title>
    <style>
        body { font-family: sans-serif; margin: 20px; }
        .hidden { display: none; }
        .react-datepicker { border: 1px solid #ccc; padding: 10px; width: 320px; }
        [role="row"] { padding: 4px; border-bottom: 1px solid #eee; }
    </style>
</head>
<body>
    <div id="login" class="hidden">
        <h1>Sign in</h1>
        <p>Your session has expired.</p>
    </div>

    <div id="app" class="hidden">
        <h1 id="report-title">Report</h1>
        <label>Date range
            <input data-cy="qa-daterange-input" readonly value="">
        </label>

        <div id="calendar" class="react-datepicker hidden">
            <input placeholder="Start date">
            <input placeholder="End date">
        </div>

        <button class="qa-run-button">Run Report</button>
        <div id="grid-host"></div>
    </div>

    <script>
        const tokenKey = '{{TOKEN_KEY}}';
        const gridDelay = {{GRID_DELAY_MS}};

        function reportId() {
            const match = window.location.hash.match(/#\/new\/reports\/([^/?]+)/);
            return match ? match[1] : null;
        }

        function render() {
            const loggedIn = !!window.localStorage.getItem(tokenKey);
            document.getElementById('login').classList.toggle('hidden', loggedIn);
            document.getElementById('app').classList.toggle('hidden', !loggedIn || !reportId());
            document.getElementById('report-title').textContent = 'Report ' + (reportId() || '');
        }

        const rangeInput = document.querySelector('[data-cy="qa-daterange-input"]');
        const calendar = document.getElementById('calendar');
        const startInput = document.querySelector('input[placeholder="Start date"]');
        const endInput = document.querySelector('input[placeholder="End date"]');

        rangeInput.addEventListener('click', () => {
            setTimeout(() => calendar.classList.remove('hidden'), 200);
        });

        endInput.addEventListener('keydown', (e) => {
            if (e.key === 'Enter') {
                rangeInput.value = startInput.value + ' - ' + endInput.value;
                calendar.classList.add('hidden');
            }
        });

        document.querySelector('.qa-run-button').addEventListener('click', () => {
            const run = { report_id: reportId(), start: startInput.value, end: endInput.value };
            fetch('/api/reports/' + run.report_id + '/runs', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(run),
            });

            setTimeout(() => {
                const grid = document.createElement('div');
                grid.setAttribute('data-cy', 'qa-report-grid');
                for (let i = 1; i <= 3; i++) {
                    const row = document.createElement('div');
                    row.setAttribute('role', 'row');
                    row.textContent = 'Job ' + i + ': ' + run.start + ' to ' + run.end;
                    grid.appendChild(row);
                }
                const host = document.getElementById('grid-host');
                host.innerHTML = '';
                host.appendChild(grid);
            }, gridDelay);
        });

        window.addEventListener('hashchange', render);
        render();
    </script>
</body>
</html>"#;
