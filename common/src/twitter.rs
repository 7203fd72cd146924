// Twitter/X v2 recent-search client
// Pulls poll tweets posted since the last handled tweet id.

use crate::config::TwitterConfig;
use crate::errors::TwitterError;
use crate::models::{Poll, SearchBatch, Tweet, User};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const TWEET_FIELDS: &str = "created_at,attachments,author_id,text";
const EXPANSIONS: &str = "attachments.poll_ids,author_id";
const POLL_FIELDS: &str = "duration_minutes,end_datetime,voting_status,options";
const USER_FIELDS: &str = "username";

/// Lower bound of a recent search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchWindow {
    /// Tweets newer than this id; the id must be inside the 7-day search range
    SinceId(String),
    /// Tweets created at or after this instant
    StartTime(DateTime<Utc>),
    /// The endpoint's own range, the last 7 days
    Recent,
}

/// TweetSource trait defines where candidate poll tweets come from
#[async_trait]
pub trait TweetSource: Send + Sync {
    /// Fetch every matching tweet inside `window`
    async fn search(&self, window: &SearchWindow) -> Result<SearchBatch, TwitterError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    polls: Vec<Poll>,
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    newest_id: Option<String>,
    #[serde(default)]
    next_token: Option<String>,
    #[serde(default)]
    result_count: u32,
}

/// TwitterClient queries `/2/tweets/search/recent` with bearer authentication
pub struct TwitterClient {
    client: Client,
    api_base: String,
    bearer_token: String,
    query: String,
    max_results: u32,
    max_pages: u32,
}

impl TwitterClient {
    /// Create a new TwitterClient with the specified timeout
    pub fn new(
        config: &TwitterConfig,
        bearer_token: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, TwitterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            query: config.query.clone(),
            max_results: config.max_results,
            max_pages: config.max_pages,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_page(
        &self,
        window: &SearchWindow,
        pagination_token: Option<&str>,
    ) -> Result<SearchResponse, TwitterError> {
        let url = format!("{}/2/tweets/search/recent", self.api_base);
        let max_results = self.max_results.to_string();

        let mut request = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", self.query.as_str()),
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", EXPANSIONS),
                ("poll.fields", POLL_FIELDS),
                ("user.fields", USER_FIELDS),
                ("max_results", max_results.as_str()),
            ]);

        match window {
            SearchWindow::SinceId(id) => {
                request = request.query(&[("since_id", id.as_str())]);
            }
            SearchWindow::StartTime(start) => {
                let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
                request = request.query(&[("start_time", start.as_str())]);
            }
            SearchWindow::Recent => {}
        }
        if let Some(token) = pagination_token {
            request = request.query(&[("pagination_token", token)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            warn!(?reset_at, "Twitter rate limit hit");
            return Err(TwitterError::RateLimited { reset_at });
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(TwitterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TwitterError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TweetSource for TwitterClient {
    #[instrument(skip(self))]
    async fn search(&self, window: &SearchWindow) -> Result<SearchBatch, TwitterError> {
        let mut batch = SearchBatch::default();
        let mut pagination_token: Option<String> = None;

        for page in 0..self.max_pages {
            let response = self
                .fetch_page(window, pagination_token.as_deref())
                .await?;

            debug!(
                page,
                result_count = response.meta.result_count,
                "Fetched search page"
            );

            // Results are newest first, so the first page carries the newest id
            if batch.newest_id.is_none() {
                batch.newest_id = response.meta.newest_id.clone();
            }
            batch.tweets.extend(response.data);
            for poll in response.includes.polls {
                batch.polls.insert(poll.id.clone(), poll);
            }
            for user in response.includes.users {
                batch.users.insert(user.id.clone(), user);
            }

            pagination_token = response.meta.next_token;
            if pagination_token.is_none() {
                break;
            }
        }

        if pagination_token.is_some() {
            warn!(
                max_pages = self.max_pages,
                "Stopped paging before the end of the result set"
            );
        }

        info!(
            tweets = batch.tweets.len(),
            polls = batch.polls.len(),
            newest_id = ?batch.newest_id,
            "Search completed"
        );
        Ok(batch)
    }
}
