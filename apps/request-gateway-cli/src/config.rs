use anyhow::Result;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use request_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides; `__` separates nested keys
/// (`REQUEST_GATEWAY__GATEWAY__TIMEOUT=10s`).
pub const ENV_PREFIX: &str = "REQUEST_GATEWAY__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    /// Humantime duration, e.g. `10s` or `1m 30s`
    pub timeout: Option<String>,
}

impl AppConfig {
    /// Load the layered configuration:
    /// defaults -> YAML file (if given) -> env (`REQUEST_GATEWAY__*`) -> CLI overrides.
    ///
    /// # Errors
    /// Fails if the file does not exist or any layer holds an invalid value.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        Self::load_with_env_prefix(path, overrides, ENV_PREFIX)
    }

    fn load_with_env_prefix(
        path: Option<&Path>,
        overrides: &CliOverrides,
        env_prefix: &str,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(env_prefix).split("__"));

        if let Some(base_url) = &overrides.base_url {
            figment = figment.merge(Serialized::default("gateway.base_url", base_url));
        }
        if let Some(timeout) = &overrides.timeout {
            figment = figment.merge(Serialized::default("gateway.timeout", timeout));
        }

        Ok(figment.extract()?)
    }
}
