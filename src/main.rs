#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reportgrab::errors::{EXIT_COMMAND_ERROR, EXIT_RUN_ABORTED, RunError};
use reportgrab::plan::report_plan;
use reportgrab::server::{self, AppState};
use reportgrab::session::{DEFAULT_SESSION_FILE, SESSION_ENV_VAR};
use reportgrab::{
    BrowserSettings, BrowserType, DateRangePolicy, DirectorySink, OutputFormat, ReportConfig,
    RunReport, Runner, SessionStore, TracingObserver, ViewportSize, WebDriverLauncher,
};

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "reportgrab")]
#[command(about = "Capture a saved dashboard report through WebDriver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    report: ReportArgs,

    #[command(flatten)]
    browser: BrowserArgs,
}

#[derive(Args)]
struct ReportArgs {
    /// Dashboard root URL
    #[arg(long, env = "REPORTGRAB_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Saved report identifier
    #[arg(long, env = "REPORTGRAB_REPORT_ID", global = true)]
    report_id: Option<String>,

    /// today, last-<n>-days or <start>..<end>
    #[arg(long, env = "REPORTGRAB_DATE_RANGE", default_value = "today", global = true)]
    date_range: String,

    /// Wait after each navigation, in milliseconds
    #[arg(long, env = "REPORTGRAB_SETTLE_MS", default_value_t = 5_000, global = true)]
    settle_ms: u64,

    /// How long the report may take to render, in milliseconds
    #[arg(
        long,
        env = "REPORTGRAB_REPORT_TIMEOUT_MS",
        default_value_t = 20_000,
        global = true
    )]
    report_timeout_ms: u64,

    /// Storage-state file used when the session env var is unset
    #[arg(
        long,
        env = "REPORTGRAB_SESSION_FILE",
        default_value = DEFAULT_SESSION_FILE,
        global = true
    )]
    session_file: PathBuf,

    /// Env var holding the session as raw or base64 JSON (empty to disable)
    #[arg(long, default_value = SESSION_ENV_VAR, global = true)]
    session_env: String,

    /// Directory artifacts are written to
    #[arg(long, env = "REPORTGRAB_OUTPUT_DIR", default_value = "artifacts", global = true)]
    output_dir: PathBuf,
}

#[derive(Args)]
struct BrowserArgs {
    /// Browser to use (chrome or firefox)
    #[arg(long, env = "REPORTGRAB_BROWSER", default_value = "chrome", global = true)]
    browser: String,

    /// Existing WebDriver endpoint; a local driver is started when omitted
    #[arg(long, env = "REPORTGRAB_WEBDRIVER_URL", global = true)]
    webdriver_url: Option<String>,

    /// Show browser window
    #[arg(long, global = true)]
    no_headless: bool,

    /// Viewport size (e.g., 1920x1080)
    #[arg(long, default_value = "1920x1080", global = true)]
    viewport: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /run and GET /artifacts/{name}
    Serve {
        /// Address to listen on
        #[arg(long, env = "REPORTGRAB_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },

    /// Run the report once and save its artifacts
    Run {
        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Print the step plan without launching a browser
    Plan {
        /// Resolve the date range against this day (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },

    /// Stored session operations
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Decode the stored session and summarize it
    Check,
}

impl ReportArgs {
    fn report_config(&self) -> Result<ReportConfig> {
        let base_url = self
            .base_url
            .as_deref()
            .context("--base-url (or REPORTGRAB_BASE_URL) is required")?;
        let report_id = self
            .report_id
            .clone()
            .context("--report-id (or REPORTGRAB_REPORT_ID) is required")?;

        let mut config = ReportConfig::new(base_url, report_id)?;
        config.date_range = self.date_range.parse::<DateRangePolicy>()?;
        config.navigate_settle_ms = self.settle_ms;
        config.report_timeout_ms = self.report_timeout_ms;
        Ok(config)
    }

    fn session_store(&self) -> SessionStore {
        let env_var = (!self.session_env.is_empty()).then(|| self.session_env.clone());
        SessionStore::new(env_var, &self.session_file)
    }
}

impl BrowserArgs {
    fn settings(&self) -> Result<BrowserSettings> {
        Ok(BrowserSettings {
            browser_type: self.browser.parse::<BrowserType>()?,
            webdriver_url: self.webdriver_url.clone(),
            headless: !self.no_headless,
            viewport: Some(ViewportSize::parse(&self.viewport)?),
        })
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            let exit_code = err
                .downcast_ref::<RunError>()
                .map(RunError::exit_code)
                .unwrap_or(EXIT_COMMAND_ERROR);

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": format!("{:#}", err),
                "exit_code": exit_code
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            // Also log to stderr for human reading
            eprintln!("Error: {:#}", err);
            exit_code
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    // Initialize tracing to stderr (so JSON output to stdout remains clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reportgrab=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => handle_serve(&cli.report, &cli.browser, bind).await,
        Commands::Run { format } => handle_run(&cli.report, &cli.browser, format).await,
        Commands::Plan { today } => handle_plan(&cli.report, today.as_deref()),
        Commands::Session {
            command: SessionCommands::Check,
        } => handle_session_check(&cli.report),
    }
}

fn build_runner(report: &ReportArgs, browser: &BrowserArgs) -> Result<Runner<WebDriverLauncher>> {
    let config = report.report_config()?;
    let launcher = WebDriverLauncher::new(browser.settings()?);
    let sink = DirectorySink::new(&report.output_dir);

    Ok(Runner::new(
        config,
        report.session_store(),
        launcher,
        Arc::new(sink),
        Arc::new(TracingObserver),
    ))
}

async fn handle_serve(report: &ReportArgs, browser: &BrowserArgs, bind: SocketAddr) -> Result<i32> {
    let runner = Arc::new(build_runner(report, browser)?);
    let state = AppState::new(runner.clone(), &report.output_dir);

    let served = server::serve(bind, state).await;
    runner.launcher().shutdown();
    served?;
    Ok(EXIT_SUCCESS)
}

async fn handle_run(report: &ReportArgs, browser: &BrowserArgs, format: OutputFormat) -> Result<i32> {
    let runner = build_runner(report, browser)?;

    let cancel = runner.cancel_flag();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step");
            cancel.cancel();
        }
    });

    let outcome = runner.run().await;
    watcher.abort();
    runner.launcher().shutdown();

    let report = outcome?;
    print_report(&report, format)?;

    if report.is_completed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_RUN_ABORTED)
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Simple => {
            println!("{}", report.summary());
            for path in &report.saved_to {
                println!("  {}", path.display());
            }
        }
    }
    Ok(())
}

fn handle_plan(report: &ReportArgs, today: Option<&str>) -> Result<i32> {
    let config = report.report_config()?;
    let today = match today {
        Some(day) => NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .with_context(|| format!("Invalid --today: {}", day))?,
        None => Local::now().date_naive(),
    };

    let steps = report_plan(&config, today);
    println!("{}", serde_json::to_string_pretty(&steps)?);
    Ok(EXIT_SUCCESS)
}

fn handle_session_check(report: &ReportArgs) -> Result<i32> {
    let store = report.session_store();
    let state = store.load()?;

    let now = chrono::Utc::now().timestamp();
    let live = state.live_cookies(now).count();
    info!("Session looks usable");

    let summary = json!({
        "cookies": state.cookies.len(),
        "expired_cookies": state.cookies.len() - live,
        "origins": state.origins.len(),
        "hosts": state.cookie_hosts(now),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(EXIT_SUCCESS)
}
