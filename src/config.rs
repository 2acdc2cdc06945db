//! Configuration loading and validation.
//!
//! Every knob in this module corresponds to one of the enumerated
//! environment variables in the external interfaces contract. Values are
//! read once at startup via [`Config::from_env`]; there is no live reload.

use std::time::Duration;

/// Logging output format, selected independently of `LOG_LEVEL`'s verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Rate limit caps for one action class: `limit` actions per `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub limit: usize,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub messages: RateLimitRule,
    pub skips: RateLimitRule,
    pub reports: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages: RateLimitRule {
                limit: 30,
                window: Duration::from_secs(60),
            },
            skips: RateLimitRule {
                limit: 10,
                window: Duration::from_secs(60),
            },
            reports: RateLimitRule {
                limit: 3,
                window: Duration::from_secs(3600),
            },
        }
    }
}

/// Top-level server configuration, assembled from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Secret used for bearer-token minting. Required only if that optional
    /// surface is exercised; must be at least 32 bytes when present.
    pub jwt_secret: Option<String>,
    pub queue_timeout: Duration,
    /// Not part of the enumerated external config surface; added so the
    /// mode-switch-pending expiry (B5) is tunable like every other timeout.
    pub mode_switch_timeout: Duration,
    pub max_queue_size: usize,
    pub max_connections_per_ip: usize,
    pub ban_duration: Duration,
    pub heartbeat_interval: Duration,
    pub connection_timeout: Duration,
    pub rate_limits: RateLimitConfig,
    pub max_message_size: usize,
    pub max_message_length: usize,
    pub cleanup_interval: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Build configuration from environment variables, falling back to the
    /// documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000u16),
            jwt_secret: std::env::var("JWT_SECRET").ok(),
            queue_timeout: Duration::from_millis(env_or("QUEUE_TIMEOUT_MS", 300_000u64)),
            mode_switch_timeout: Duration::from_millis(env_or("MODE_SWITCH_TIMEOUT_MS", 30_000u64)),
            max_queue_size: env_or("MAX_QUEUE_SIZE", 10_000usize),
            max_connections_per_ip: env_or("MAX_CONNECTIONS_PER_IP", 20usize),
            ban_duration: Duration::from_millis(env_or("BAN_DURATION_MS", 86_400_000u64)),
            heartbeat_interval: Duration::from_millis(env_or("HEARTBEAT_INTERVAL_MS", 30_000u64)),
            connection_timeout: Duration::from_millis(env_or("CONNECTION_TIMEOUT_MS", 60_000u64)),
            rate_limits: RateLimitConfig {
                messages: RateLimitRule {
                    limit: env_or("RATE_LIMIT_MESSAGES_PER_MINUTE", 30usize),
                    window: Duration::from_secs(60),
                },
                skips: RateLimitRule {
                    limit: env_or("RATE_LIMIT_SKIPS_PER_MINUTE", 10usize),
                    window: Duration::from_secs(60),
                },
                reports: RateLimitRule {
                    limit: env_or("RATE_LIMIT_REPORTS_PER_HOUR", 3usize),
                    window: Duration::from_secs(3600),
                },
            },
            max_message_size: env_or("MAX_MESSAGE_SIZE", 10_240usize),
            max_message_length: env_or("MAX_MESSAGE_LENGTH", 500usize),
            cleanup_interval: Duration::from_millis(env_or("CLEANUP_INTERVAL_MS", 60_000u64)),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            jwt_secret: None,
            queue_timeout: Duration::from_millis(300_000),
            mode_switch_timeout: Duration::from_millis(30_000),
            max_queue_size: 10_000,
            max_connections_per_ip: 20,
            ban_duration: Duration::from_millis(86_400_000),
            heartbeat_interval: Duration::from_millis(30_000),
            connection_timeout: Duration::from_millis(60_000),
            rate_limits: RateLimitConfig::default(),
            max_message_size: 10_240,
            max_message_length: 500,
            cleanup_interval: Duration::from_millis(60_000),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// A single configuration problem, logged and aggregated before refusing to start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be at least 32 bytes, got {0}")]
    WeakJwtSecret(usize),
    #[error("MAX_QUEUE_SIZE must be greater than zero")]
    ZeroQueueSize,
    #[error("MAX_MESSAGE_LENGTH must be greater than zero")]
    ZeroMessageLength,
}

/// Validate a loaded configuration, returning every problem found rather
/// than failing fast on the first one.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(secret) = &config.jwt_secret {
        if secret.len() < 32 {
            errors.push(ConfigError::WeakJwtSecret(secret.len()));
        }
    }
    if config.max_queue_size == 0 {
        errors.push(ConfigError::ZeroQueueSize);
    }
    if config.max_message_length == 0 {
        errors.push(ConfigError::ZeroMessageLength);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
