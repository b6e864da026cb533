//! Gateway configuration.
//!
//! Loaded from an optional YAML file and environment variables. Only the
//! external client is affected: region, credential profile, endpoint.

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "dynamo-gateway.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "DYNAMO_GATEWAY_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "DYNAMO_GATEWAY";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "DYNAMO_GATEWAY_LOG";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Document store client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// AWS region (e.g., "us-east-1"). Uses default provider chain if not set.
    pub region: Option<String>,
    /// Named profile from the shared credentials file.
    pub profile: Option<String>,
    /// Custom endpoint URL (for DynamoDB Local or LocalStack).
    pub endpoint_url: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `DEFAULT_CONFIG_FILE` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Set AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set named credential profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set custom endpoint URL (for DynamoDB Local or testing).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }
}
