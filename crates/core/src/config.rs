//! Configuration management
//!
//! Configuration is stored as TOML in `config.toml` under the directory
//! named by `OBJREF_CONFIG_DIR`, or `<config dir>/objref` otherwise.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolver::{AliasResolver, DefaultResolver, Resolver};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "OBJREF_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection used when an address names none
    pub default_connection: String,

    /// Bucket used for bare keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_bucket: Option<String>,

    /// Connection alias table (alias -> connection)
    pub aliases: HashMap<String, String>,

    pub cache: CacheConfig,

    /// Store endpoints keyed by connection name
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap providers in caching decorators
    pub enabled: bool,

    /// Metadata time-to-live in seconds
    pub metadata_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metadata_ttl_secs: 300,
        }
    }
}

/// Connection details for one S3-compatible endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Endpoint URL, empty for the SDK default
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Static credentials; the SDK credential chain is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Bucket lookup style: auto, path or dns
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl ConnectionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: default_region(),
            access_key: None,
            secret_key: None,
            bucket_lookup: default_bucket_lookup(),
        }
    }

    /// Attach static credentials
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Whether requests should use path-style addressing
    pub fn force_path_style(&self) -> bool {
        self.bucket_lookup == "path" || self.bucket_lookup == "auto"
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        for (name, conn) in &self.connections {
            if !matches!(conn.bucket_lookup.as_str(), "auto" | "path" | "dns") {
                return Err(Error::Config(format!(
                    "connection '{name}': bucket_lookup must be 'auto', 'path', or 'dns'"
                )));
            }
            if conn.access_key.is_some() != conn.secret_key.is_some() {
                return Err(Error::Config(format!(
                    "connection '{name}': access_key and secret_key must be set together"
                )));
            }
        }
        if self.default_bucket.as_deref() == Some("") {
            return Err(Error::Config("default_bucket cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.metadata_ttl_secs)
    }

    /// Build the resolver described by this configuration
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        let mut base = DefaultResolver::new(&self.default_connection);
        if let Some(bucket) = &self.default_bucket {
            base = base.with_default_bucket(bucket);
        }

        if self.aliases.is_empty() {
            Arc::new(base)
        } else {
            Arc::new(AliasResolver::new(base, self.aliases.clone()))
        }
    }
}

/// Loads and saves the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use the default configuration location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("objref"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, or the defaults if no file exists
    pub fn load(&self) -> Result<Config> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Config::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No config file, using defaults");
                Ok(Config::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, config.to_toml()?)?;
        tracing::debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
default_connection = "main"
default_bucket = "assets"

[aliases]
prod = "production-account"

[cache]
metadata_ttl_secs = 30

[connections.main]
endpoint = "http://localhost:9000"
access_key = "minio"
secret_key = "minio123"
bucket_lookup = "path"

[connections.production-account]
region = "eu-west-1"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.default_connection, "main");
        assert_eq!(config.default_bucket.as_deref(), Some("assets"));
        assert_eq!(config.metadata_ttl(), Duration::from_secs(30));
        assert!(config.cache.enabled);

        let prod = &config.connections["production-account"];
        assert_eq!(prod.region, "eu-west-1");
        assert_eq!(prod.bucket_lookup, "auto");
        assert!(prod.access_key.is_none());
        assert!(config.connections["main"].force_path_style());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.metadata_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_validation() {
        let err = Config::from_toml("[connections.x]\nbucket_lookup = \"vhost\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_toml("[connections.x]\naccess_key = \"a\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_toml("default_bucket = \"\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        assert!(matches!(
            Config::from_toml("cache = 5").unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_resolver_from_config() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let resolver = config.resolver();

        let r = resolver.resolve("images/logo.png").unwrap();
        assert_eq!(r.to_string(), "s3://main@assets/images/logo.png");

        let r = resolver.resolve("s3://prod@b/k").unwrap();
        assert_eq!(r.connection, "production-account");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested").join(CONFIG_FILE));

        assert_eq!(manager.load().unwrap(), Config::default());

        let mut config = Config::from_toml(SAMPLE).unwrap();
        config.connections.insert(
            "backup".to_string(),
            ConnectionConfig::new("https://s3.example.com").with_credentials("ak", "sk"),
        );
        manager.save(&config).unwrap();

        assert_eq!(manager.load().unwrap(), config);
    }
}
