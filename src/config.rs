//! Configuration loading and management.
//!
//! Loads configuration from a TOML file with environment variable overrides.
//! The four required properties keep the names `clientId`, `tenantId`,
//! `clientSecret` and `nickname`.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::AppCredentials;
use crate::error::ConfigError;
use crate::secret::SecretString;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "AADLOOKUP_CONFIG";

/// Configuration file used when neither an argument nor `AADLOOKUP_CONFIG` is given.
const DEFAULT_CONFIG_FILE: &str = "config.toml";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application identity. `Debug` is safe to print: the secret is redacted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupConfig {
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub authority_host: String,
    pub graph_base_url: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl ApiConfig {
    /// Authority identifier for a tenant, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub fn authority_url(&self, tenant_id: &str) -> String {
        format!("{}/{}", self.authority_host.trim_end_matches('/'), tenant_id)
    }

    /// OAuth2 v2.0 token endpoint for a tenant.
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/oauth2/v2.0/token", self.authority_url(tenant_id))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Pick the configuration file: first CLI argument, then `AADLOOKUP_CONFIG`, then `config.toml`.
pub fn resolve_config_path(arg: Option<String>, env_value: Option<String>) -> PathBuf {
    arg.or(env_value)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl Config {
    /// Load configuration from `path` with environment variable overrides, then validate it.
    ///
    /// A missing file is tolerated so that every property can come from the environment;
    /// validation still rejects the result if anything required is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Configuration file '{}' found. Loading properties...", path.display());
                Self::from_toml_str(&content)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Configuration file '{}' not found, relying on environment",
                    path.display()
                );
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration without applying overrides or validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(client_id) = lookup("AZURE_CLIENT_ID") {
            self.credentials.client_id = Some(client_id);
        }

        if let Some(tenant_id) = lookup("AZURE_TENANT_ID") {
            self.credentials.tenant_id = Some(tenant_id);
        }

        if let Some(secret) = lookup("AZURE_CLIENT_SECRET") {
            self.credentials.client_secret = Some(SecretString::new(secret));
        }

        if let Some(nickname) = lookup("AZURE_MAIL_NICKNAME") {
            self.lookup.nickname = Some(nickname);
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present and the endpoints are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        self.nickname()?;

        check_url("authority_host", &self.api.authority_host)?;
        check_url("graph_base_url", &self.api.graph_base_url)?;

        debug!("Configuration validated");
        Ok(())
    }

    /// Build the immutable credentials used for token acquisition.
    pub fn credentials(&self) -> Result<AppCredentials, ConfigError> {
        let client_id = self
            .credentials
            .client_id
            .clone()
            .ok_or(ConfigError::MissingKey("clientId"))?;
        let tenant_id = self
            .credentials
            .tenant_id
            .clone()
            .ok_or(ConfigError::MissingKey("tenantId"))?;
        let client_secret = self
            .credentials
            .client_secret
            .clone()
            .ok_or(ConfigError::MissingKey("clientSecret"))?;

        AppCredentials::new(client_id, tenant_id, client_secret)
    }

    /// The mail nickname to search for.
    pub fn nickname(&self) -> Result<&str, ConfigError> {
        match self.lookup.nickname.as_deref() {
            Some(nickname) if !nickname.trim().is_empty() => Ok(nickname),
            _ => Err(ConfigError::MissingKey("nickname")),
        }
    }

    /// Echo the loaded properties. The secret is never printed.
    pub fn log_summary(&self) {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "<unset>".to_string());
        info!("clientId: {}", show(&self.credentials.client_id));
        info!("tenantId: {}", show(&self.credentials.tenant_id));
        info!("clientSecret: [HIDDEN]");
        info!("nickname: {}", show(&self.lookup.nickname));
        debug!(
            "authority: {}, graph: {}",
            self.api.authority_host, self.api.graph_base_url
        );
    }
}

fn check_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            key,
            reason: format!("'{}' is not a base URL", value),
        });
    }

    Ok(())
}

#[cfg(test)]
impl Config {
    /// Complete configuration pointing both endpoints at local test servers.
    pub(crate) fn for_tests(authority_host: &str, graph_base_url: &str) -> Self {
        Self {
            credentials: CredentialsConfig {
                client_id: Some("test-client".into()),
                tenant_id: Some("test-tenant".into()),
                client_secret: Some(SecretString::new("test-secret")),
            },
            lookup: LookupConfig {
                nickname: Some("alice".into()),
            },
            api: ApiConfig {
                authority_host: authority_host.to_string(),
                graph_base_url: graph_base_url.to_string(),
                timeout_seconds: 5,
                connect_timeout_seconds: 2,
            },
            logging: LoggingConfig::default(),
        }
    }
}
