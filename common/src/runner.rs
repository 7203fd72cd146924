// One scheduled detection run: load state, search, filter, alert, persist

use crate::alert::format_alert;
use crate::detection::PollFilter;
use crate::errors::RunError;
use crate::export::CsvExporter;
use crate::models::{snowflake_time, DetectorState, RunSummary};
use crate::state::StateStore;
use crate::telegram::Notifier;
use crate::twitter::{SearchWindow, TweetSource};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// Recent search only reaches this far back and rejects older cursors
const SEARCH_RANGE_DAYS: i64 = 7;
// Keeps the lower bound inside the range by the time the request lands
const SEARCH_RANGE_MARGIN_MINUTES: i64 = 10;

/// Inputs of a run that are not service clients
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub filter: PollFilter,
    pub timezone: Tz,
    pub dry_run: bool,
    pub exporter: Option<CsvExporter>,
}

/// Execute one detection run
///
/// Alerts go out oldest first. If a send or export fails, the state is saved
/// with `since_id` at the last alerted tweet so the next run resumes after it,
/// and the error is returned.
#[instrument(name = "run", skip_all, fields(run_id = %run_id, dry_run = options.dry_run))]
pub async fn run_once(
    run_id: Uuid,
    options: &RunOptions,
    source: &dyn TweetSource,
    notifier: &dyn Notifier,
    store: &dyn StateStore,
    now: DateTime<Utc>,
) -> Result<RunSummary, RunError> {
    let state = store.load().await?;
    let since_id_before = state.since_id.clone();

    let window = search_window(since_id_before.as_deref(), now);
    let batch = source.search(&window).await?;
    let report = options.filter.detect(&batch);

    info!(
        tweets = batch.tweets.len(),
        polls_seen = report.polls_seen,
        detections = report.detections.len(),
        "Batch filtered"
    );

    let mut summary = RunSummary {
        run_id,
        tweets_scanned: batch.tweets.len(),
        polls_seen: report.polls_seen,
        alerts_sent: 0,
        since_id_before: since_id_before.clone(),
        since_id_after: since_id_before.clone(),
    };

    let mut cursor = since_id_before.clone();
    for detection in &report.detections {
        let text = format_alert(detection, options.timezone);

        if options.dry_run {
            info!(tweet_id = %detection.tweet_id, alert = %text, "Dry run, alert not sent");
        } else if let Err(e) = notifier.notify(&text).await {
            error!(tweet_id = %detection.tweet_id, error = %e, "Failed to send alert");
            save_progress(store, &state, cursor, summary.alerts_sent, now).await;
            return Err(e.into());
        }

        summary.alerts_sent += 1;
        cursor = Some(detection.tweet_id.clone());

        if let Some(exporter) = &options.exporter {
            if let Err(e) = exporter.append(detection) {
                error!(tweet_id = %detection.tweet_id, error = %e, "Failed to export poll");
                if !options.dry_run {
                    save_progress(store, &state, cursor, summary.alerts_sent, now).await;
                }
                return Err(e.into());
            }
        }
    }

    let newest = batch.newest_id.clone().or(cursor).or(since_id_before);
    let next_state = advance(&state, newest, summary.alerts_sent, now);
    summary.since_id_after = next_state.since_id.clone();

    if options.dry_run {
        info!(since_id = ?next_state.since_id, "Dry run, state not saved");
    } else {
        store.save(&next_state).await?;
    }

    info!(
        alerts_sent = summary.alerts_sent,
        since_id_after = ?summary.since_id_after,
        "Run completed"
    );
    Ok(summary)
}

/// Pick the search lower bound for a stored cursor
///
/// A cursor older than the recent-search range (or not a tweet id at all) is
/// replaced by a start time at the edge of the range.
pub fn search_window(since_id: Option<&str>, now: DateTime<Utc>) -> SearchWindow {
    let Some(id) = since_id else {
        return SearchWindow::Recent;
    };
    let oldest_allowed =
        now - Duration::days(SEARCH_RANGE_DAYS) + Duration::minutes(SEARCH_RANGE_MARGIN_MINUTES);
    match snowflake_time(id) {
        Some(created) if created >= oldest_allowed => SearchWindow::SinceId(id.to_string()),
        created => {
            warn!(
                since_id = id,
                created_at = ?created,
                "Stored since_id is outside the search range, searching from the range start"
            );
            SearchWindow::StartTime(oldest_allowed)
        }
    }
}

// Best effort: the run is already failing with a more useful error
async fn save_progress(
    store: &dyn StateStore,
    state: &DetectorState,
    cursor: Option<String>,
    alerts: usize,
    now: DateTime<Utc>,
) {
    let partial = advance(state, cursor, alerts, now);
    if let Err(e) = store.save(&partial).await {
        warn!(error = %e, "Failed to save partial progress");
    }
}

fn advance(
    state: &DetectorState,
    since_id: Option<String>,
    alerts: usize,
    now: DateTime<Utc>,
) -> DetectorState {
    DetectorState {
        since_id,
        last_run_at: Some(now),
        alerts_sent: state.alerts_sent + alerts as u64,
    }
}
