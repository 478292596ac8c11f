//! Contabil DRE report driver.
//!
//! Loads ledger and chart-of-accounts snapshots from JSON files, builds one
//! report and prints it as JSON on stdout.
//!
//! Usage: dre-report <start> <end> [segment | --by-segment | --reconcile]

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contabil_core::dre::{
    Account, BuildOptions, CachedChartOfAccounts, DreError, DreReportBuilder,
    InMemoryChartOfAccounts, InMemoryLedger, ReportQuery, Segment, Transaction,
};
use contabil_shared::{AppConfig, AppError};

/// What to produce for the requested period.
enum Mode {
    Report(Option<i64>),
    BySegment,
    Reconcile(Option<i64>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(
            config
                .logging
                .json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!config.logging.json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (start, end, mode) = parse_args(&args)?;

    let transactions: Vec<Transaction> = read_json(&config.sources.ledger_path)?;
    let accounts: Vec<Account> = read_json(&config.sources.accounts_path)?;
    info!(
        transactions = transactions.len(),
        accounts = accounts.len(),
        "Loaded snapshots"
    );

    let builder = DreReportBuilder::new(
        InMemoryLedger::new(transactions),
        CachedChartOfAccounts::with_ttl(
            InMemoryChartOfAccounts::new(accounts),
            config.reports.accounts_cache_ttl_secs,
        ),
    )
    .with_fetch_timeout(Duration::from_millis(config.reports.fetch_timeout_ms));
    let options = BuildOptions::default();

    let output = match mode {
        Mode::Report(segment) => builder
            .build(&ReportQuery::new(start, end, segment), &options)
            .await
            .map(serde_json::to_value),
        Mode::Reconcile(segment) => builder
            .reconcile(&ReportQuery::new(start, end, segment), &options)
            .await
            .map(serde_json::to_value),
        Mode::BySegment => {
            let path = config
                .sources
                .segments_path
                .as_deref()
                .context("sources.segments_path is required for --by-segment")?;
            let segments: Vec<Segment> = read_json(path)?;
            builder
                .build_segment_breakdown(start, end, &segments, &options)
                .await
                .map(serde_json::to_value)
        }
    };

    match output {
        Ok(json) => {
            println!("{}", serde_json::to_string_pretty(&json?)?);
            Ok(())
        }
        Err(err) => report_failure(err),
    }
}

fn report_failure(err: DreError) -> anyhow::Result<()> {
    let app_error = AppError::from(err);
    error!(
        status = app_error.status_code(),
        code = app_error.error_code(),
        error = %app_error,
        "DRE build failed"
    );
    Err(app_error.into())
}

fn parse_args(args: &[String]) -> anyhow::Result<(NaiveDate, NaiveDate, Mode)> {
    let [start, end, rest @ ..] = args else {
        bail!("usage: dre-report <start> <end> [segment | --by-segment | --reconcile]");
    };
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let mode = match rest {
        [] => Mode::Report(None),
        [flag] if flag == "--by-segment" => Mode::BySegment,
        [flag] if flag == "--reconcile" => Mode::Reconcile(None),
        [flag, segment] if flag == "--reconcile" => Mode::Reconcile(Some(parse_segment(segment)?)),
        [segment] => Mode::Report(Some(parse_segment(segment)?)),
        _ => bail!("unexpected arguments: {}", rest.join(" ")),
    };

    Ok((start, end, mode))
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

fn parse_segment(raw: &str) -> anyhow::Result<i64> {
    raw.parse()
        .with_context(|| format!("invalid segment id {raw:?}"))
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}
