// Poll detector entry point
// Single-shot: the external scheduler starts one process per trigger and reads
// only its exit status.

use anyhow::{Context, Result};
use chrono::Utc;
use common::config::{Credentials, Settings};
use common::detection::PollFilter;
use common::export::CsvExporter;
use common::runner::{run_once, RunOptions};
use common::schedule::{next_fire_time, HOURLY_CRON};
use common::state::GistStateStore;
use common::telegram::TelegramNotifier;
use common::telemetry;
use common::twitter::TwitterClient;
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    let (log_level, tracing_endpoint) = match &settings {
        Ok(s) => (
            s.observability.log_level.clone(),
            s.observability.tracing_endpoint.clone(),
        ),
        Err(_) => ("info".to_string(), None),
    };
    telemetry::init_logging(&log_level, tracing_endpoint.as_deref())?;

    let result = match settings {
        Ok(settings) => detect(settings).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to load configuration")),
    };

    if let Err(e) = &result {
        error!(error = %format!("{:#}", e), "Poll detection run failed");
    }

    telemetry::shutdown_tracer();
    result
}

async fn detect(settings: Settings) -> Result<()> {
    info!("Starting poll detection run");

    let credentials = Credentials::from_env().context("Failed to read credentials")?;
    info!(credentials = ?credentials, "Credentials loaded");

    let timeout = settings.detector.http_timeout_seconds;
    let source = TwitterClient::new(&settings.twitter, credentials.bearer_token.clone(), timeout)?;
    let notifier = TelegramNotifier::new(
        &settings.telegram,
        credentials.telegram_bot_token.clone(),
        credentials.telegram_chat_id.clone(),
        timeout,
    )?;
    let store = GistStateStore::new(
        &settings.github,
        credentials.gt_token.clone(),
        credentials.gist_id.clone(),
        timeout,
    )?;

    let options = RunOptions {
        filter: PollFilter::from_config(&settings.detector),
        timezone: settings.display_timezone(),
        dry_run: settings.detector.dry_run,
        exporter: settings.detector.output_csv.as_ref().map(CsvExporter::new),
    };

    let now = Utc::now();
    let summary = run_once(Uuid::new_v4(), &options, &source, &notifier, &store, now).await?;

    let next_run = next_fire_time(HOURLY_CRON, now)?;
    info!(
        run_id = %summary.run_id,
        tweets_scanned = summary.tweets_scanned,
        polls_seen = summary.polls_seen,
        alerts_sent = summary.alerts_sent,
        since_id = ?summary.since_id_after,
        next_scheduled_run = ?next_run,
        "Poll detection run finished"
    );
    Ok(())
}
