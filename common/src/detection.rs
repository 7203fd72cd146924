// Poll detection
// A tweet is relevant when its poll has options, its text avoids every blocklist
// word, and at least one option names a tracked candidate.

use crate::config::DetectorConfig;
use crate::models::{PollDetection, PollOption, SearchBatch, Tweet};
use tracing::{debug, info, warn};

const UNKNOWN_USERNAME: &str = "Unknown";

/// Result of filtering one search batch
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Tweets that carried at least one resolvable poll
    pub polls_seen: usize,
    /// Relevant polls, oldest tweet first
    pub detections: Vec<PollDetection>,
}

/// Case-insensitive candidate and blocklist matcher
#[derive(Debug, Clone)]
pub struct PollFilter {
    candidates: Vec<(String, String)>,
    blocklist: Vec<String>,
}

impl PollFilter {
    pub fn new(candidates: &[String], blocklist: &[String]) -> Self {
        Self {
            candidates: candidates
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(|c| (c.to_string(), c.to_lowercase()))
                .collect(),
            blocklist: blocklist
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(&config.candidates, &config.blocklist)
    }

    /// True when the text contains any blocklist word
    pub fn is_blocked(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.blocklist.iter().any(|word| text.contains(word.as_str()))
    }

    /// Candidate names found in any option label, in configured order
    pub fn matched_candidates(&self, options: &[PollOption]) -> Vec<String> {
        let labels: Vec<String> = options.iter().map(|o| o.label.to_lowercase()).collect();
        self.candidates
            .iter()
            .filter(|(_, lower)| labels.iter().any(|label| label.contains(lower.as_str())))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Evaluate a single tweet against the polls and users of its batch
    pub fn evaluate(&self, tweet: &Tweet, batch: &SearchBatch) -> Option<PollDetection> {
        for poll_id in tweet.poll_ids() {
            let Some(poll) = batch.polls.get(poll_id) else {
                debug!(tweet_id = %tweet.id, poll_id = %poll_id, "Poll not present in includes");
                continue;
            };

            if poll.options.is_empty() {
                warn!(tweet_id = %tweet.id, "Poll has no options, skipping");
                continue;
            }

            if self.is_blocked(&tweet.text) {
                info!(tweet_id = %tweet.id, "Poll text contains blocklist words");
                continue;
            }

            let matched = self.matched_candidates(&poll.options);
            if matched.is_empty() {
                info!(
                    tweet_id = %tweet.id,
                    options = %poll.options.iter().map(|o| o.label.as_str()).collect::<Vec<_>>().join(", "),
                    "Poll has no candidate names in options"
                );
                continue;
            }

            let author_id = tweet.author_id.clone().unwrap_or_default();
            let username = batch
                .users
                .get(&author_id)
                .map(|u| u.username.clone())
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_string());

            return Some(PollDetection {
                tweet_id: tweet.id.clone(),
                author_id,
                username,
                text: tweet.text.clone(),
                created_at: tweet.created_at.clone(),
                end_datetime: poll.end_datetime.clone(),
                duration_minutes: poll.duration_minutes,
                voting_status: poll.voting_status.clone(),
                options: poll.options.iter().map(|o| o.label.clone()).collect(),
                matched_candidates: matched,
            });
        }

        None
    }

    /// Filter a whole batch
    pub fn detect(&self, batch: &SearchBatch) -> DetectionReport {
        let mut tweets: Vec<&Tweet> = batch.tweets.iter().collect();
        tweets.sort_by_key(|t| t.sort_key());

        let mut report = DetectionReport::default();
        for tweet in tweets {
            if tweet.poll_ids().iter().any(|id| batch.polls.contains_key(id)) {
                report.polls_seen += 1;
            }
            if let Some(detection) = self.evaluate(tweet, batch) {
                info!(
                    tweet_id = %detection.tweet_id,
                    candidates = ?detection.matched_candidates,
                    "Relevant poll detected"
                );
                report.detections.push(detection);
            }
        }

        report
    }
}
