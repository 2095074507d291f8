use crate::error::{AppError, Result};
use crate::profile::FilterProfile;

pub const BID_CARS_BASE_URL: &str = "https://bid.cars";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Listings requested per search page (the source paginates; one page is enough
/// for the narrow filter profiles we track).
pub const SEARCH_PAGE_SIZE: usize = 50;

/// Scheduled check interval (seconds).
pub const CHECK_INTERVAL_SECS: u64 = 1800;

/// Pause after each successful Telegram delivery (milliseconds) to respect
/// the transport's rate limits.
pub const NOTIFY_PACING_MS: u64 = 500;

/// Per-call timeout for seen-set store round trips (seconds).
pub const STORE_TIMEOUT_SECS: u64 = 10;

/// Per-call timeout for Telegram sendMessage (seconds).
pub const TELEGRAM_TIMEOUT_SECS: u64 = 10;

/// Whole-fetch timeout for one browser session (seconds). Generous, since
/// the anti-bot challenge can take tens of seconds to clear.
pub const SOURCE_FETCH_TIMEOUT_SECS: u64 = 300;

/// Wait after navigation before issuing the in-page search request, giving the
/// challenge script time to finish (milliseconds).
pub const CHALLENGE_SETTLE_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub log_level: String,
    pub api_port: u16,
    pub store_url: String,
    pub store_token: String,
    pub profiles: Vec<ProfileConfig>,
}

/// One watched filter profile plus the Telegram credentials it alerts with.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub profile: FilterProfile,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl Config {
    /// Reads configuration from the environment. All missing required keys are
    /// collected and reported together so one restart fixes everything.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();

        let store_url = require_env("UPSTASH_REDIS_REST_URL", &mut missing);
        let store_token = require_env("UPSTASH_REDIS_REST_TOKEN", &mut missing);

        let mut profiles = Vec::new();
        for profile in FilterProfile::all() {
            let suffix = profile.env_suffix();
            let telegram_bot_token =
                require_env(&format!("TELEGRAM_BOT_TOKEN__{suffix}"), &mut missing);
            let telegram_chat_id =
                require_env(&format!("TELEGRAM_CHAT_ID__{suffix}"), &mut missing);
            profiles.push(ProfileConfig {
                profile,
                telegram_bot_token,
                telegram_chat_id,
            });
        }

        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            base_url: std::env::var("BID_CARS_BASE_URL")
                .unwrap_or_else(|_| BID_CARS_BASE_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
            store_url,
            store_token,
            profiles,
        })
    }
}

fn require_env(key: &str, missing: &mut Vec<String>) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => {
            missing.push(key.to_string());
            String::new()
        }
    }
}
