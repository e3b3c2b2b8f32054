use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Request logging settings, resolved once at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Write log files (typically only in production-like deployments)
    pub file_logging: bool,
    /// Directory for the log files; unset means console only
    pub dir: Option<PathBuf>,
    /// Request header carrying the caller identity
    pub identity_header: Option<String>,
    pub error_max_size: u64,
    pub warn_max_size: u64,
    pub info_max_size: u64,
    /// Character classes for correlation tokens: `a` lower, `A` upper,
    /// `#` digits, `!` symbols
    pub token_charset: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_logging: false,
            dir: None,
            identity_header: None,
            error_max_size: 10 * MIB,
            warn_max_size: 10 * MIB,
            info_max_size: 1000 * MIB,
            token_charset: "Aa#".to_string(),
        }
    }
}

impl LoggerConfig {
    /// Whether file sinks will be created
    pub fn file_logging_active(&self) -> bool {
        self.file_logging && self.dir.is_some()
    }
}

/// Load configuration from an optional `request-logger` file and
/// `REQUEST_LOGGER__*` environment variables
pub fn load_config() -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("request-logger").required(false))
        .add_source(config::Environment::with_prefix("REQUEST_LOGGER").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    let logging = &cfg.logging;

    if logging.error_max_size == 0 || logging.warn_max_size == 0 || logging.info_max_size == 0 {
        anyhow::bail!("Log file max sizes must be greater than zero");
    }

    if let Some(header) = &logging.identity_header {
        if header.trim().is_empty() {
            anyhow::bail!("Identity header name cannot be empty");
        }
        if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
            anyhow::bail!("Identity header '{}' is not a valid header name", header);
        }
    }

    if !logging.token_charset.chars().any(|c| matches!(c, 'a' | 'A' | '#' | '!')) {
        anyhow::bail!(
            "Token charset '{}' selects no characters (use a, A, # or !)",
            logging.token_charset
        );
    }

    Ok(())
}
