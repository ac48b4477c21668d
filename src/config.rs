use std::fmt;
use std::path::PathBuf;
use teloxide::types::ChatId;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but could not be parsed.
    Invalid { name: &'static str, value: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "{} not found in environment or .env", name),
            Self::Invalid { name, value } => write!(f, "invalid value for {}: '{}'", name, value),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub google_api_key: String,
    pub telegram_token: String,
    /// Port for the keep-alive endpoint.
    pub port: u16,
    /// Gemini model name used for every analysis.
    pub gemini_model: String,
    /// Directory for the operator log file.
    pub log_dir: PathBuf,
    /// Chat that receives operator log records, if any.
    pub log_chat_id: Option<ChatId>,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Variables already in the environment win over .env entries.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_api_key = required(&lookup, "GOOGLE_API_KEY")?;
        let telegram_token = required(&lookup, "TELEGRAM_TOKEN")?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let port = match optional(&lookup, "PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let log_chat_id = match optional(&lookup, "LOG_CHAT_ID") {
            Some(value) => Some(ChatId(
                value
                    .parse::<i64>()
                    .map_err(|_| ConfigError::Invalid { name: "LOG_CHAT_ID", value })?,
            )),
            None => None,
        };

        Ok(Self {
            google_api_key,
            telegram_token,
            port,
            gemini_model: optional(&lookup, "GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            log_dir: optional(&lookup, "LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            log_chat_id,
        })
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}
