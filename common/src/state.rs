// Detector state persisted in a GitHub Gist between scheduled runs

use crate::config::GithubConfig;
use crate::errors::StateError;
use crate::models::DetectorState;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// StateStore trait defines how detector state survives between runs
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<DetectorState, StateError>;
    async fn save(&self, state: &DetectorState) -> Result<(), StateError>;
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// GistStateStore keeps a single JSON file inside one gist
pub struct GistStateStore {
    client: Client,
    api_base: String,
    token: String,
    gist_id: String,
    file_name: String,
}

impl GistStateStore {
    /// Create a new GistStateStore with the specified timeout
    pub fn new(
        config: &GithubConfig,
        token: impl Into<String>,
        gist_id: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, StateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            gist_id: gist_id.into(),
            file_name: config.state_file.clone(),
        })
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_base, self.gist_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, StateError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StateError::MissingGist(self.gist_id.clone()));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn file_content(&self, file: GistFile) -> Result<Option<String>, StateError> {
        match (file.truncated, file.raw_url) {
            (true, Some(raw_url)) => {
                debug!(raw_url = %raw_url, "State file truncated, fetching raw content");
                let response = self.authorized(self.client.get(&raw_url)).send().await?;
                Ok(Some(self.read_body(response).await?))
            }
            _ => Ok(file.content),
        }
    }
}

/// Parse stored state; an empty document means a first run
pub fn parse_state(content: &str) -> Result<DetectorState, StateError> {
    if content.trim().is_empty() {
        return Ok(DetectorState::default());
    }
    Ok(serde_json::from_str(content)?)
}

#[async_trait]
impl StateStore for GistStateStore {
    #[instrument(skip(self), fields(gist_id = %self.gist_id, file = %self.file_name))]
    async fn load(&self) -> Result<DetectorState, StateError> {
        let response = self.authorized(self.client.get(self.gist_url())).send().await?;
        let body = self.read_body(response).await?;
        let mut gist: Gist = serde_json::from_str(&body)?;

        let state = match gist.files.remove(&self.file_name) {
            Some(file) => match self.file_content(file).await? {
                Some(content) => parse_state(&content)?,
                None => DetectorState::default(),
            },
            None => {
                info!("State file not present in gist, starting fresh");
                DetectorState::default()
            }
        };

        info!(since_id = ?state.since_id, alerts_sent = state.alerts_sent, "Detector state loaded");
        Ok(state)
    }

    #[instrument(skip(self, state), fields(gist_id = %self.gist_id, file = %self.file_name))]
    async fn save(&self, state: &DetectorState) -> Result<(), StateError> {
        let content = serde_json::to_string_pretty(state)?;
        let payload = json!({
            "files": {
                self.file_name.as_str(): { "content": content }
            }
        });

        let response = self
            .authorized(self.client.patch(self.gist_url()))
            .json(&payload)
            .send()
            .await?;
        self.read_body(response).await?;

        info!(since_id = ?state.since_id, "Detector state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_is_fresh_state() {
        assert_eq!(parse_state("  \n").unwrap(), DetectorState::default());
    }

    #[test]
    fn test_stored_state_parses() {
        let state = parse_state(
            r#"{"since_id":"1790","last_run_at":"2027-08-01T10:00:00Z","alerts_sent":3}"#,
        )
        .unwrap();
        assert_eq!(state.since_id.as_deref(), Some("1790"));
        assert_eq!(state.alerts_sent, 3);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_state("not json"),
            Err(StateError::Malformed(_))
        ));
    }
}
