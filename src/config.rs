//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "learn.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://learn.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Object storage configuration (S3-compatible, e.g. Cloudflare R2)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Private bucket holding course images, signatures, hero images and videos
    pub bucket: String,
    /// S3 endpoint, e.g. "https://{account_id}.r2.cloudflarestorage.com"
    pub endpoint: String,
    /// Region ("auto" for R2)
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Lifetime of presigned URLs (default: 86400 = 24h)
    pub signed_url_ttl_seconds: u64,
    /// Ceiling for image uploads (default: 2 MiB)
    pub max_image_bytes: usize,
    /// Ceiling for video uploads (default: 200 MiB)
    pub max_video_bytes: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Sign-in attempts allowed per email within one window
    pub sign_in_max_attempts: u32,
    /// Sign-in rate limit window in seconds
    pub sign_in_window_seconds: u64,
}

/// Administrator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Accounts signing up with this email are granted the admin role
    pub email: String,
}

/// Notification feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Seconds before a notification removes itself (default: 6)
    pub ttl_seconds: u64,
}

/// Generative model API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key; the assistant is disabled when unset
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
    /// Seconds a finished video job stays readable (default: 3600)
    #[serde(default = "default_job_retention_seconds")]
    pub job_retention_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            chat_model: default_chat_model(),
            video_model: default_video_model(),
            poll_interval_seconds: default_poll_interval_seconds(),
            poll_max_attempts: default_poll_max_attempts(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
            job_retention_seconds: default_job_retention_seconds(),
        }
    }
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_video_model() -> String {
    "veo-2.0-generate-001".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_poll_max_attempts() -> u32 {
    60
}

fn default_poll_timeout_seconds() -> u64 {
    900
}

fn default_job_retention_seconds() -> u64 {
    3600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (ACADEMY__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("storage.region", "auto")?
            .set_default("storage.signed_url_ttl_seconds", 86400)?
            .set_default("storage.max_image_bytes", 2 * 1024 * 1024)?
            .set_default("storage.max_video_bytes", 200 * 1024 * 1024)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.sign_in_max_attempts", 5)?
            .set_default("auth.sign_in_window_seconds", 60)?
            .set_default("notifications.ttl_seconds", 6)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (ACADEMY__*)
            .add_source(
                Environment::with_prefix("ACADEMY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// Whether the generative model API is configured
    pub fn assistant_enabled(&self) -> bool {
        self.ai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.sign_in_max_attempts == 0 || self.auth.sign_in_window_seconds == 0 {
            return Err(AppError::Config(
                "auth.sign_in_max_attempts and auth.sign_in_window_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.storage.signed_url_ttl_seconds == 0 {
            return Err(AppError::Config(
                "storage.signed_url_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.notifications.ttl_seconds == 0 {
            return Err(AppError::Config(
                "notifications.ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.admin.email.contains('@') {
            return Err(AppError::Config(
                "admin.email must be an email address".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/academy-test.db"),
            },
            storage: StorageConfig {
                bucket: "academy-assets".to_string(),
                endpoint: "https://account.r2.cloudflarestorage.com".to_string(),
                region: "auto".to_string(),
                access_key_id: "access-key".to_string(),
                secret_access_key: "secret-key".to_string(),
                signed_url_ttl_seconds: 86_400,
                max_image_bytes: 2 * 1024 * 1024,
                max_video_bytes: 200 * 1024 * 1024,
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 604_800,
                sign_in_max_attempts: 5,
                sign_in_window_seconds: 60,
            },
            admin: AdminConfig {
                email: "admin@inst.example".to_string(),
            },
            notifications: NotificationConfig { ttl_seconds: 6 },
            ai: AiConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "learn.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_zero_notification_ttl() {
        let mut config = valid_config();
        config.notifications.ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn assistant_is_disabled_without_api_key() {
        let mut config = valid_config();
        assert!(!config.assistant_enabled());

        config.ai.api_key = Some("  ".to_string());
        assert!(!config.assistant_enabled());

        config.ai.api_key = Some("key".to_string());
        assert!(config.assistant_enabled());
    }
}
