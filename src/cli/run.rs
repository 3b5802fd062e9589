use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::{load_case, ExecutionSummary, TestCase, TestRunner};
use action_primitives::PageDriver;
use anyhow::{bail, Context, Result};
use cdp_adapter::ChromiumSession;
use clap::Args;
use serde::Serialize;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::{render, OutputFormat};
use healwright::StoreBackend;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Test case files (YAML or JSON)
    #[arg(required = true)]
    pub cases: Vec<PathBuf>,

    /// Suite scope for selector history (overrides the case's suite_id)
    #[arg(long)]
    pub suite: Option<String>,

    /// Base URL for relative navigation (overrides the case's base_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Show the browser window
    #[arg(long, conflicts_with = "headless")]
    pub headed: bool,

    /// Force headless mode
    #[arg(long)]
    pub headless: bool,

    /// Selector store backend for this run
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Retry rounds after the first
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-test timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write execution summaries to this file as JSON
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Test case files (YAML or JSON)
    #[arg(required = true)]
    pub cases: Vec<PathBuf>,
}

#[derive(Serialize)]
struct CaseOverview<'a> {
    path: String,
    id: &'a str,
    name: &'a str,
    steps: usize,
}

pub fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let cases = load_cases(&args.cases, None, None)?;
    let overview: Vec<CaseOverview<'_>> = args
        .cases
        .iter()
        .zip(&cases)
        .map(|(path, case)| CaseOverview {
            path: path.display().to_string(),
            id: &case.id,
            name: &case.name,
            steps: case.steps.len(),
        })
        .collect();

    match render(format, &overview)? {
        Some(text) => println!("{}", text),
        None => {
            for case in &overview {
                println!("{}  {} ({} steps) - {}", case.id, case.name, case.steps, case.path);
            }
        }
    }
    Ok(())
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let cases = load_cases(&args.cases, args.suite.as_deref(), args.url.as_deref())?;

    let mut config = ctx.config().clone();
    if args.headed {
        config.browser.headless = false;
    } else if args.headless {
        config.browser.headless = true;
    }
    if let Some(max_retries) = args.max_retries {
        config.resolution.max_retries = max_retries;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.runner.test_timeout_ms = Some(timeout_ms);
    }

    let store = match args.store {
        Some(backend) if backend != config.store.backend => {
            let mut settings = config.store.clone();
            settings.backend = backend;
            settings.path = None;
            healwright::open_store(&settings)
                .with_context(|| format!("opening {:?} selector store", backend))?
        }
        _ => ctx.store().await?,
    };

    let runner = TestRunner::new(Some(store))
        .with_options(config.resolution.to_options())
        .with_timeout(config.runner.test_timeout());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let session = ChromiumSession::launch(&config.browser)
        .await
        .context("launching Chromium")?;

    let mut summaries = Vec::with_capacity(cases.len());
    let mut outcome: Result<()> = Ok(());
    for case in &cases {
        if cancel.is_cancelled() {
            break;
        }
        let page = match session.new_page().await {
            Ok(page) => page,
            Err(err) => {
                outcome = Err(err).context("opening a browser tab");
                break;
            }
        };
        let driver: Arc<dyn PageDriver> = Arc::new(page.clone());
        let result = runner.run(driver, case, cancel.clone()).await;
        if let Err(err) = page.close().await {
            warn!(test = %case.id, error = %err, "Failed to close tab");
        }
        match result {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                outcome = Err(err).with_context(|| format!("running {}", case.id));
                break;
            }
        }
    }

    if let Err(err) = session.close().await {
        warn!(error = %err, "Failed to close browser");
    }
    outcome?;

    if let Some(path) = &args.summary {
        write_summaries(path, &summaries).await?;
    }
    report(&summaries, format)?;

    let failed = summaries.iter().filter(|summary| !summary.passed()).count();
    if failed > 0 {
        bail!("{} of {} test(s) did not pass", failed, summaries.len());
    }
    Ok(())
}

fn load_cases(paths: &[PathBuf], suite: Option<&str>, url: Option<&str>) -> Result<Vec<TestCase>> {
    paths
        .iter()
        .map(|path| {
            let mut case = load_case(path).with_context(|| format!("loading {}", path.display()))?;
            if let Some(suite) = suite {
                case.suite_id = Some(suite.to_string());
            }
            if let Some(url) = url {
                case.base_url = Some(url.to_string());
            }
            Ok(case)
        })
        .collect()
}

async fn write_summaries(path: &Path, summaries: &[ExecutionSummary]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_vec_pretty(summaries)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote execution summaries");
    Ok(())
}

fn report(summaries: &[ExecutionSummary], format: OutputFormat) -> Result<()> {
    if let Some(text) = render(format, &summaries)? {
        println!("{}", text);
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{:<10} {} ({}ms, {} attempts, {:.0}% successful)",
            format!("{:?}", summary.status).to_uppercase(),
            summary.test_name,
            summary.duration_ms,
            summary.metrics.total_attempts,
            summary.metrics.success_rate * 100.0
        );
        for step in &summary.steps {
            let mark = if step.success { "ok" } else { "FAILED" };
            let via = step
                .used_strategy
                .as_ref()
                .map(|strategy| format!(" via {}", strategy.locator.describe()))
                .unwrap_or_default();
            println!("  {:<6} {} [{}]{}", mark, step.step_id, step.action, via);
            if let Some(error) = &step.error {
                println!("         {}", error);
            }
        }
        if summary.skipped_steps > 0 {
            println!("  {} step(s) skipped", summary.skipped_steps);
        }
    }
    Ok(())
}
