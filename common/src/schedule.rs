// Schedule helpers for the workflow trigger
//
// Workflow schedules use five-field POSIX cron in UTC. The `cron` crate expects a
// leading seconds field, so expressions are widened before parsing.

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// Top of every hour
pub const HOURLY_CRON: &str = "0 * * * *";

/// Parse a five-field workflow cron expression
pub fn parse_workflow_cron(expression: &str) -> Result<CronSchedule, ScheduleError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ScheduleError::InvalidCronExpression {
            expression: expression.to_string(),
            reason: format!("expected 5 fields, found {}", fields.len()),
        });
    }

    let widened = format!("0 {}", fields.join(" "));
    CronSchedule::from_str(&widened).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// The next `count` fire times strictly after `after`
pub fn next_fire_times(
    expression: &str,
    after: DateTime<Utc>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    let schedule = parse_workflow_cron(expression)?;
    Ok(schedule.after(&after).take(count).collect())
}

/// The next fire time strictly after `after`
pub fn next_fire_time(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ScheduleError> {
    Ok(next_fire_times(expression, after, 1)?.into_iter().next())
}
