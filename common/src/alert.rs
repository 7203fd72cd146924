// Telegram alert formatting (legacy Markdown parse mode)

use crate::models::PollDetection;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Escape the characters legacy Markdown treats as entity markers
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render an API timestamp in the display timezone, or echo it when unparseable
pub fn localize_timestamp(raw: Option<&str>, tz: Tz) -> String {
    let Some(raw) = raw else {
        return "unknown".to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .with_timezone(&tz)
            .format(TIME_FORMAT)
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Build the alert message for one detection
pub fn format_alert(detection: &PollDetection, tz: Tz) -> String {
    let duration = detection
        .duration_minutes
        .map(|d| d.to_string())
        .unwrap_or_else(|| "?".to_string());
    let status = detection.voting_status.as_deref().unwrap_or("unknown");

    let mut lines = vec![
        "📊 *Kenya President Poll Detected!*".to_string(),
        "✅ *Confirmed: Poll contains candidate names*".to_string(),
        format!("👤 Username: `@{}`", detection.username.replace('`', "'")),
        format!("🆔 Author ID: `{}`", detection.author_id),
        format!(
            "🕒 Created: `{}`",
            localize_timestamp(detection.created_at.as_deref(), tz)
        ),
        format!("🔗 [View Tweet]({})", detection.tweet_url()),
        format!("🗳️ *Poll Text:* {}", escape_markdown(&detection.text)),
        format!(
            "📅 Ends: `{}`",
            localize_timestamp(detection.end_datetime.as_deref(), tz)
        ),
        format!("⏱️ Duration: {} min", duration),
        format!("📌 Status: `{}`", status),
        "*Poll Options:*".to_string(),
    ];
    lines.extend(
        detection
            .options
            .iter()
            .map(|label| format!("- `{}`", label.replace('`', "'"))),
    );

    lines.join("\n")
}
