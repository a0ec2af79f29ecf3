use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::i18n::SupportedLanguage;
use crate::workflow::UploadPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub notifications: NotificationConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_photo_size_mb: u64,
    pub allowed_photo_types: Vec<String>,
    pub max_document_size_mb: u64,
    pub allowed_document_types: Vec<String>,
    /// Prefix for the urls handed back for stored files.
    pub public_base_url: String,
    pub geotag_extraction_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub channel_capacity: usize,
    /// How often undelivered notifications are re-sent.
    pub retry_interval: Duration,
    /// Undelivered events kept for retry; the oldest is dropped beyond this.
    pub failed_delivery_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    /// Language used to render notification text.
    pub language: SupportedLanguage,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl UploadConfig {
    pub fn photo_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_size_mb: self.max_photo_size_mb,
            allowed_types: self.allowed_photo_types.clone(),
        }
    }

    pub fn document_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_size_mb: self.max_document_size_mb,
            allowed_types: self.allowed_document_types.clone(),
        }
    }

    /// Largest request body the upload routes need to accept.
    pub fn body_limit_bytes(&self) -> usize {
        let largest_mb = self.max_photo_size_mb.max(self.max_document_size_mb);
        // Headroom for multipart framing and the caption field.
        (largest_mb.saturating_mul(1024 * 1024) as usize).saturating_add(64 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 8000,
            },
            uploads: UploadConfig {
                max_photo_size_mb: 10,
                allowed_photo_types: vec!["image/*".to_string()],
                max_document_size_mb: 25,
                allowed_document_types: vec!["application/pdf".to_string(), "image/*".to_string()],
                public_base_url: "/files".to_string(),
                geotag_extraction_timeout: Duration::from_millis(5000),
            },
            notifications: NotificationConfig {
                channel_capacity: 100,
                retry_interval: Duration::from_secs(30),
                failed_delivery_capacity: 1000,
            },
            app: AppConfig {
                name: "Site Review".to_string(),
                environment: Environment::Development,
                language: SupportedLanguage::English,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Upload configuration
        let max_photo_size_mb = parse_or("UPLOAD_MAX_PHOTO_SIZE_MB", defaults.uploads.max_photo_size_mb)?;
        let max_document_size_mb =
            parse_or("UPLOAD_MAX_DOCUMENT_SIZE_MB", defaults.uploads.max_document_size_mb)?;
        let allowed_photo_types = list_or("UPLOAD_ALLOWED_PHOTO_TYPES", defaults.uploads.allowed_photo_types);
        let allowed_document_types =
            list_or("UPLOAD_ALLOWED_DOCUMENT_TYPES", defaults.uploads.allowed_document_types);
        let public_base_url = env::var("UPLOAD_PUBLIC_BASE_URL")
            .unwrap_or(defaults.uploads.public_base_url)
            .trim_end_matches('/')
            .to_string();
        let extraction_timeout_ms = parse_or(
            "GEOTAG_EXTRACTION_TIMEOUT_MS",
            defaults.uploads.geotag_extraction_timeout.as_millis() as u64,
        )?;

        // Notification configuration
        let channel_capacity =
            parse_or("NOTIFICATION_CHANNEL_CAPACITY", defaults.notifications.channel_capacity)?;
        let retry_interval_secs = parse_or(
            "NOTIFICATION_RETRY_INTERVAL_SECS",
            defaults.notifications.retry_interval.as_secs(),
        )?;
        let failed_delivery_capacity = parse_or(
            "NOTIFICATION_FAILED_QUEUE_CAPACITY",
            defaults.notifications.failed_delivery_capacity,
        )?;

        // App configuration
        let environment_str = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());
        let environment = environment_str.parse::<Environment>().unwrap_or_default();

        let language = match env::var("APP_LANGUAGE") {
            Ok(val) => val
                .parse::<SupportedLanguage>()
                .map_err(anyhow::Error::msg)
                .context("Failed to parse APP_LANGUAGE")?,
            Err(_) => defaults.app.language,
        };

        let app_name = env::var("APP_NAME").unwrap_or(defaults.app.name);

        Ok(Config {
            server: ServerConfig { host, port },
            uploads: UploadConfig {
                max_photo_size_mb,
                allowed_photo_types,
                max_document_size_mb,
                allowed_document_types,
                public_base_url,
                geotag_extraction_timeout: Duration::from_millis(extraction_timeout_ms),
            },
            notifications: NotificationConfig {
                channel_capacity,
                retry_interval: Duration::from_secs(retry_interval_secs.max(1)),
                failed_delivery_capacity,
            },
            app: AppConfig {
                name: app_name,
                environment,
                language,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}

fn list_or(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(val) => val
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect(),
        Err(_) => default,
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}
