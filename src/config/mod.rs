//! Configuration management
//!
//! Configuration is read from `config.yml` and can be overridden through
//! `LEXSITE_*` environment variables. Every field is optional; anything
//! missing falls back to a default suitable for a local single-binary
//! deployment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Public site identity, used for SEO metadata and the sitemap
    #[serde(default)]
    pub site: SiteConfig,
    /// Outgoing mail for contact-form notifications
    #[serde(default)]
    pub mail: MailConfig,
    /// Fee calculator price table overrides
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin dashboard, cookie auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Directory with the pre-built public site, served as a fallback
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            static_dir: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Pool size; defaults to 20 for SQLite files and 30 for MySQL.
    /// In-memory SQLite always uses a single connection.
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: None,
        }
    }
}

fn default_database_url() -> String {
    "data/lexsite.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Public site identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Absolute URL of the public site, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site_description")]
    pub description: String,
    /// Fallback Open Graph image
    #[serde(default)]
    pub default_image: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
            description: default_site_description(),
            default_image: None,
        }
    }
}

impl SiteConfig {
    /// Join a site-relative path onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() || path == "/" {
            format!("{}/", base)
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

fn default_site_name() -> String {
    "Law Office".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_description() -> String {
    "Legal counsel for individuals and businesses.".to_string()
}

/// SMTP settings for contact notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address, e.g. `Law Office <site@example.com>`
    #[serde(default)]
    pub from: String,
    /// Where new contact submissions are announced
    #[serde(default)]
    pub notify_to: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            notify_to: String::new(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Fee calculator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Base price overrides keyed by service type (e.g. `litigation: 6000`)
    #[serde(default)]
    pub base_prices: HashMap<String, f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            base_prices: HashMap::new(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid YAML
    /// is an error carrying the line and column of the problem.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file, then apply `LEXSITE_*` environment overrides
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LEXSITE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LEXSITE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LEXSITE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("LEXSITE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("LEXSITE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("LEXSITE_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = Some(max);
            }
        }

        if let Ok(ttl) = std::env::var("LEXSITE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(name) = std::env::var("LEXSITE_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(base_url) = std::env::var("LEXSITE_SITE_BASE_URL") {
            self.site.base_url = base_url;
        }

        if let Ok(enabled) = std::env::var("LEXSITE_MAIL_ENABLED") {
            if let Ok(enabled) = enabled.parse::<bool>() {
                self.mail.enabled = enabled;
            }
        }
        if let Ok(host) = std::env::var("LEXSITE_MAIL_SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        if let Ok(port) = std::env::var("LEXSITE_MAIL_SMTP_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mail.smtp_port = port;
            }
        }
        if let Ok(username) = std::env::var("LEXSITE_MAIL_USERNAME") {
            self.mail.username = username;
        }
        if let Ok(password) = std::env::var("LEXSITE_MAIL_PASSWORD") {
            self.mail.password = password;
        }
        if let Ok(notify_to) = std::env::var("LEXSITE_MAIL_NOTIFY_TO") {
            self.mail.notify_to = notify_to;
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests that touch process environment must not run concurrently.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
