//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments
//!
//! JWT secret is never read from config files for security - it must come from
//! environment variable or CLI argument.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Minimum accepted length of a configured JWT secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub broker: Broker,
    #[serde(default)]
    pub auth: Auth,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Honour `X-Forwarded-Proto` when deciding whether a request arrived
    /// over HTTPS. Only enable behind a proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_proto: bool,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trust_forwarded_proto: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data.db".to_string()
}

/// Broker endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    /// Path the broker answers on. Matched case-insensitively.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_require_https")]
    pub require_https: bool,
    #[serde(default)]
    pub enable_help: bool,
    /// When set, help requests must carry this value in `x-spapi-key`.
    #[serde(default)]
    pub help_key: Option<String>,
}

impl Default for Broker {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            require_https: default_require_https(),
            enable_help: false,
            help_key: None,
        }
    }
}

fn default_endpoint() -> String {
    "/api/data".to_string()
}

fn default_require_https() -> bool {
    true
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    /// JWT secret for token signing/verification. Empty disables
    /// authentication and every caller is anonymous.
    /// Must be provided via environment variable or CLI - never from config file.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token expiry in days.
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_days: default_token_expiry_days(),
        }
    }
}

fn default_token_expiry_days() -> u32 {
    30
}

/// CLI-level overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub endpoint: Option<String>,
    pub require_https: Option<bool>,
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct Loader {
    /// Environment variable prefix (e.g., "MYAPP" -> MYAPP_HOST, MYAPP_PORT)
    pub env_prefix: String,
    /// Name of the JWT secret environment variable (without prefix)
    pub jwt_secret_env: String,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            env_prefix: "SPAPI".to_string(),
            jwt_secret_env: "JWT_SECRET".to_string(),
        }
    }
}

impl Loader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
            ..Default::default()
        }
    }

    /// Load configuration from file, environment, and CLI overrides.
    pub fn load(&self, config_path: Option<&Path>, cli: &Overrides) -> crate::Result<Config> {
        // Start with file config or defaults
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        // Clear any jwt_secret from config file - security requirement
        config.auth.jwt_secret = String::new();

        self.apply_env(&mut config)?;

        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(url) = &cli.database_url {
            config.database.url = url.clone();
        }
        if let Some(secret) = &cli.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }
        if let Some(endpoint) = &cli.endpoint {
            config.broker.endpoint = endpoint.clone();
        }
        if let Some(require_https) = cli.require_https {
            config.broker.require_https = require_https;
        }

        self.validate(&config)?;
        Ok(config)
    }

    fn apply_env(&self, config: &mut Config) -> crate::Result<()> {
        let prefix = &self.env_prefix;

        if let Ok(host) = std::env::var(format!("{prefix}_HOST")) {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var(format!("{prefix}_PORT"))
            && let Ok(p) = port.parse()
        {
            config.server.port = p;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(secret) = std::env::var(format!("{}_{}", prefix, self.jwt_secret_env)) {
            config.auth.jwt_secret = secret;
        }
        if let Ok(endpoint) = std::env::var(format!("{prefix}_ENDPOINT")) {
            config.broker.endpoint = endpoint;
        }
        if let Some(flag) = env_flag(&format!("{prefix}_REQUIRE_HTTPS"))? {
            config.broker.require_https = flag;
        }
        if let Some(flag) = env_flag(&format!("{prefix}_ENABLE_HELP"))? {
            config.broker.enable_help = flag;
        }
        if let Ok(key) = std::env::var(format!("{prefix}_HELP_KEY")) {
            config.broker.help_key = Some(key);
        }
        Ok(())
    }

    fn validate(&self, config: &Config) -> crate::Result<()> {
        if !config.broker.endpoint.starts_with('/') {
            return Err(Error::Config(format!(
                "endpoint must start with '/', got {:?}",
                config.broker.endpoint
            )));
        }
        let secret = &config.auth.jwt_secret;
        if !secret.is_empty() && secret.len() < MIN_SECRET_LENGTH {
            return Err(Error::Config(format!(
                "{}_{} must be at least {MIN_SECRET_LENGTH} bytes",
                self.env_prefix, self.jwt_secret_env
            )));
        }
        Ok(())
    }
}

/// Read a boolean environment variable. Unset yields `None`.
fn env_flag(name: &str) -> crate::Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(Error::Config(format!("{name}: expected a boolean, got {other:?}"))),
        },
        Err(_) => Ok(None),
    }
}
