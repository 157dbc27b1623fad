//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Battle rules.
    #[serde(default)]
    pub battles: BattleConfig,
    /// Voter identity headers.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://...` or `sqlite://...`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Battle lifecycle and ranking rules.
#[derive(Debug, Clone, Deserialize)]
pub struct BattleConfig {
    /// Longest voting window a battle may be created with.
    #[serde(default = "default_max_duration_hours")]
    pub max_duration_hours: i64,
    /// Flat score bonus for battles created inside the trending window.
    #[serde(default = "default_recency_bonus")]
    pub trending_recency_bonus: i64,
    /// Trending window used when the request does not name one.
    #[serde(default = "default_trending_window")]
    pub default_trending_window: String,
    /// Number of trending battles returned when the request does not say.
    #[serde(default = "default_trending_limit")]
    pub default_trending_limit: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_duration_hours: default_max_duration_hours(),
            trending_recency_bonus: default_recency_bonus(),
            default_trending_window: default_trending_window(),
            default_trending_limit: default_trending_limit(),
        }
    }
}

/// Where voter identities are read from.
///
/// The account header must only be set by a trusted upstream that has
/// already verified the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Header carrying a verified account id.
    #[serde(default = "default_account_header")]
    pub account_header: String,
    /// Header carrying an anonymous session token.
    #[serde(default = "default_session_header")]
    pub session_header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            account_header: default_account_header(),
            session_header: default_session_header(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_duration_hours() -> i64 {
    720
}

const fn default_recency_bonus() -> i64 {
    10
}

fn default_trending_window() -> String {
    "24h".to_string()
}

const fn default_trending_limit() -> u64 {
    12
}

fn default_account_header() -> String {
    "x-authenticated-user".to_string()
}

fn default_session_header() -> String {
    "x-session-id".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `RTR_ENV`)
    /// 4. Environment variables with `RTR__` prefix, e.g. `RTR__DATABASE__URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("RTR_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RTR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
