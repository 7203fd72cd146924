// Configuration management with layered configuration (defaults, file, env)
// Credentials come from plain environment variables injected by the scheduler.

use crate::errors::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Environment variables the scheduler must inject into every run
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    "BEARER_TOKEN",
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_CHAT_ID",
    "GT_TOKEN",
    "GIST_ID",
];

/// Main settings structure containing all non-secret configuration options
///
/// Every section falls back to its `Default`, so a list given in a file or the
/// environment replaces the built-in list instead of merging into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub twitter: TwitterConfig,
    pub telegram: TelegramConfig,
    pub github: GithubConfig,
    pub detector: DetectorConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_base: String,
    pub query: String,
    pub max_results: u32,
    pub max_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    pub state_file: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub candidates: Vec<String>,
    pub blocklist: Vec<String>,
    pub timezone: String,
    pub output_csv: Option<String>,
    pub dry_run: bool,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("detector.candidates")
                    .with_list_parse_key("detector.blocklist")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=100).contains(&self.twitter.max_results) {
            return Err(invalid(
                "twitter.max_results",
                "must be between 10 and 100",
            ));
        }
        if self.twitter.max_pages == 0 {
            return Err(invalid("twitter.max_pages", "must be greater than 0"));
        }
        if self.twitter.query.trim().is_empty() {
            return Err(invalid("twitter.query", "cannot be empty"));
        }
        if self.github.state_file.trim().is_empty() {
            return Err(invalid("github.state_file", "cannot be empty"));
        }
        if self.detector.candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(invalid(
                "detector.candidates",
                "at least one candidate name is required",
            ));
        }
        if self.detector.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(invalid(
                "detector.timezone",
                &format!("unknown IANA timezone '{}'", self.detector.timezone),
            ));
        }
        if self.detector.http_timeout_seconds == 0 {
            return Err(invalid(
                "detector.http_timeout_seconds",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Parsed display timezone; `validate` guarantees it parses
    pub fn display_timezone(&self) -> chrono_tz::Tz {
        self.detector
            .timezone
            .parse()
            .unwrap_or(chrono_tz::Africa::Nairobi)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
            query: "-is:retweet has:polls (vote OR pick OR choose OR candidate)".to_string(),
            max_results: 100,
            max_pages: 5,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            state_file: "poll_state.json".to_string(),
            user_agent: concat!("poll-detector/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            candidates: [
                "Ruto", "Gachagua", "Matiangi", "Musyoka", "Omtatah", "Maraga", "Kalonzo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            blocklist: ["movie", "food", "sport", "city", "music"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timezone: "Africa/Nairobi".to_string(),
            output_csv: None,
            dry_run: false,
            http_timeout_seconds: 30,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tracing_endpoint: None,
        }
    }
}

/// Secrets injected by the scheduler as plain environment variables
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
    #[serde(default)]
    pub gt_token: String,
    #[serde(default)]
    pub gist_id: String,
}

impl Credentials {
    /// Read all five credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Self::read(Environment::default())?;
        credentials.require(&REQUIRED_ENV_VARS)?;
        Ok(credentials)
    }

    /// Read credentials from an explicit variable map instead of the process environment
    pub fn from_source(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        let credentials = Self::read(Environment::default().source(Some(vars)))?;
        credentials.require(&REQUIRED_ENV_VARS)?;
        Ok(credentials)
    }

    /// Read whatever credentials are present without checking them
    pub fn from_env_unchecked() -> Result<Self, ConfigError> {
        Self::read(Environment::default())
    }

    fn read(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(environment).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Fail on the first listed variable that is absent or blank
    pub fn require(&self, names: &[&str]) -> Result<(), ConfigError> {
        for name in names {
            let present = self
                .value_of(name)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(ConfigError::MissingCredential(name.to_string()));
            }
        }
        Ok(())
    }

    /// Look a credential up by its environment variable name
    pub fn value_of(&self, name: &str) -> Option<&str> {
        match name {
            "BEARER_TOKEN" => Some(&self.bearer_token),
            "TELEGRAM_BOT_TOKEN" => Some(&self.telegram_bot_token),
            "TELEGRAM_CHAT_ID" => Some(&self.telegram_chat_id),
            "GT_TOKEN" => Some(&self.gt_token),
            "GIST_ID" => Some(&self.gist_id),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"***")
            .field("telegram_bot_token", &"***")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("gt_token", &"***")
            .field("gist_id", &self.gist_id)
            .finish()
    }
}
