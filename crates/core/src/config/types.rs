use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub transmission: TransmissionConfig,
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Telegram transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub token: String,
    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
}

fn default_poll_timeout() -> u32 {
    30
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// User ids that skip the one-time code challenge
    #[serde(default)]
    pub allowed_user_ids: Vec<i64>,
}

/// Transmission RPC endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    /// Base URL of the daemon (e.g. "http://localhost:9091")
    pub url: String,
    /// Optional basic auth credentials
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Destination directories for categorized downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    pub movies_dir: String,
    pub tv_shows_dir: String,
}

/// Storage report configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Mount points to report on; empty reports the header only
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Engine behavior configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub on_backend_error: BackendErrorPolicy,
}

/// What to do when a torrent-control call fails mid-command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorPolicy {
    /// Reply with a one-line failure message and return to the main menu.
    #[default]
    Report,
    /// Propagate the error to the host loop, which logs and exits.
    Fail,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub telegram: SanitizedTelegramConfig,
    pub auth: AuthConfig,
    pub transmission: SanitizedTransmissionConfig,
    pub downloads: DownloadsConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub token_configured: bool,
    pub poll_timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTransmissionConfig {
    pub url: String,
    pub credentials_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            telegram: SanitizedTelegramConfig {
                token_configured: !config.telegram.token.is_empty(),
                poll_timeout_secs: config.telegram.poll_timeout_secs,
            },
            auth: config.auth.clone(),
            transmission: SanitizedTransmissionConfig {
                url: config.transmission.url.clone(),
                credentials_configured: config.transmission.username.is_some(),
                timeout_secs: config.transmission.timeout_secs,
            },
            downloads: config.downloads.clone(),
            storage: config.storage.clone(),
            engine: config.engine.clone(),
        }
    }
}
