// Domain models shared by the detector pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A tweet as returned by the v2 search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub attachments: Option<Attachments>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub poll_ids: Vec<String>,
}

impl Tweet {
    pub fn poll_ids(&self) -> &[String] {
        self.attachments
            .as_ref()
            .map(|a| a.poll_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Numeric ordering key; tweet ids are snowflakes
    pub fn sort_key(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

// Twitter's snowflake epoch, 2010-11-04T01:42:54.657Z
const SNOWFLAKE_EPOCH_MS: i64 = 1_288_834_974_657;

/// Creation time encoded in a snowflake tweet id
pub fn snowflake_time(id: &str) -> Option<DateTime<Utc>> {
    let id: u64 = id.parse().ok()?;
    let millis = i64::try_from(id >> 22).ok()?.checked_add(SNOWFLAKE_EPOCH_MS)?;
    DateTime::from_timestamp_millis(millis)
}

/// A poll object from the `includes.polls` expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub voting_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(default)]
    pub position: u32,
    pub label: String,
    #[serde(default)]
    pub votes: u64,
}

/// A user object from the `includes.users` expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// All tweets, polls and users gathered by one search across its pages
#[derive(Debug, Clone, Default)]
pub struct SearchBatch {
    pub tweets: Vec<Tweet>,
    pub polls: HashMap<String, Poll>,
    pub users: HashMap<String, User>,
    pub newest_id: Option<String>,
}

impl SearchBatch {
    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }
}

/// A tweet whose poll names at least one tracked candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollDetection {
    pub tweet_id: String,
    pub author_id: String,
    pub username: String,
    pub text: String,
    pub created_at: Option<String>,
    pub end_datetime: Option<String>,
    pub duration_minutes: Option<u32>,
    pub voting_status: Option<String>,
    pub options: Vec<String>,
    pub matched_candidates: Vec<String>,
}

impl PollDetection {
    pub fn tweet_url(&self) -> String {
        format!("https://x.com/i/web/status/{}", self.tweet_id)
    }
}

/// Persisted between runs in the state gist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    #[serde(default)]
    pub since_id: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alerts_sent: u64,
}

/// Outcome of one detection run, logged on exit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub tweets_scanned: usize,
    pub polls_seen: usize,
    pub alerts_sent: usize,
    pub since_id_before: Option<String>,
    pub since_id_after: Option<String>,
}
