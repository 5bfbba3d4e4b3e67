//! Factory configuration
//!
//! Configuration is layered with figment: struct defaults, then an optional
//! TOML file, then `LEARNLAB_DATABASE_*` environment variables, highest layer
//! winning. Construction of the factory itself never dials the database;
//! credentials are only exercised when the first query runs.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Environment variable prefix for all configuration values.
pub const ENV_PREFIX: &str = "LEARNLAB_DATABASE_";

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value with no usable default was absent from every layer.
    #[error("missing required configuration value {0} (set the environment variable or a config file entry)")]
    MissingValue(&'static str),

    /// Extraction or file parsing failed.
    #[error("configuration error: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        // Boxed: figment errors are large and this keeps the enum small.
        Self::Figment(Box::new(err))
    }
}

/// The kind of backing store a factory dispatches to.
///
/// Only `postgresql` is implemented; the other kinds are recognized by
/// configuration and dispatch so the factory can report them as explicit
/// extension points instead of misconfiguration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[default]
    PostgreSql,
    MongoDb,
    MySql,
}

impl DatabaseKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSql => "postgresql",
            Self::MongoDb => "mongodb",
            Self::MySql => "mysql",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings handed to [`crate::factory::RepositoryFactory`].
///
/// `url` carries the server address and database; `key` and
/// `service_role_key` are the credentials for the restricted and elevated
/// database roles, spliced into the connection string as the `anon` and
/// `service_role` users respectively. An empty `url`/`key` never fails
/// construction; pools are lazy and the failure surfaces on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryFactoryConfig {
    /// Backing store to dispatch to.
    pub kind: DatabaseKind,
    /// Server connection URL, e.g. `postgres://db.learnlab.internal:5432/learnlab`.
    pub url: String,
    /// Credential for the restricted role used by reads.
    pub key: String,
    /// Credential for the elevated role used by writes, when configured.
    pub service_role_key: Option<String>,
    /// Maximum connections per pool.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing.
    pub acquire_timeout_secs: u64,
}

impl Default for RepositoryFactoryConfig {
    fn default() -> Self {
        Self {
            kind: DatabaseKind::PostgreSql,
            url: String::new(),
            key: String::new(),
            service_role_key: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

impl RepositoryFactoryConfig {
    /// Configuration for a PostgreSQL store at `url` with the restricted
    /// credential `key`.
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    /// Attaches the elevated service-role credential.
    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    /// Loads configuration from `LEARNLAB_DATABASE_*` environment variables
    /// over the struct defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingValue`] when `LEARNLAB_DATABASE_URL` or
    /// `LEARNLAB_DATABASE_KEY` is absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.require_credentials()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, with environment variables
    /// layered on top.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingValue`] when the merged layers leave `url` or
    /// `key` empty; [`ConfigError::Figment`] when the file does not parse.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.require_credentials()?;
        Ok(config)
    }

    fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::MissingValue("LEARNLAB_DATABASE_URL"));
        }
        if self.key.is_empty() {
            return Err(ConfigError::MissingValue("LEARNLAB_DATABASE_KEY"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_postgresql_with_lazy_credentials() {
        let config = RepositoryFactoryConfig::default();
        assert_eq!(config.kind, DatabaseKind::PostgreSql);
        assert!(config.url.is_empty());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 10);
    }

    #[test]
    fn from_env_reads_prefixed_variables() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEARNLAB_DATABASE_URL", "postgres://db.internal:5432/learnlab");
            jail.set_env("LEARNLAB_DATABASE_KEY", "anon-secret");
            jail.set_env("LEARNLAB_DATABASE_SERVICE_ROLE_KEY", "service-secret");
            jail.set_env("LEARNLAB_DATABASE_MAX_CONNECTIONS", "4");

            let config = RepositoryFactoryConfig::from_env().expect("config should load");
            assert_eq!(config.url, "postgres://db.internal:5432/learnlab");
            assert_eq!(config.key, "anon-secret");
            assert_eq!(config.service_role_key.as_deref(), Some("service-secret"));
            assert_eq!(config.max_connections, 4);
            assert_eq!(config.kind, DatabaseKind::PostgreSql);
            Ok(())
        });
    }

    #[test]
    fn from_env_requires_url_and_key() {
        figment::Jail::expect_with(|jail| {
            let err = RepositoryFactoryConfig::from_env().expect_err("url is missing");
            assert!(matches!(
                err,
                ConfigError::MissingValue("LEARNLAB_DATABASE_URL")
            ));

            jail.set_env("LEARNLAB_DATABASE_URL", "postgres://db.internal:5432/learnlab");
            let err = RepositoryFactoryConfig::from_env().expect_err("key is missing");
            assert!(matches!(
                err,
                ConfigError::MissingValue("LEARNLAB_DATABASE_KEY")
            ));
            Ok(())
        });
    }

    #[test]
    fn kind_parses_from_env_strings() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEARNLAB_DATABASE_URL", "postgres://db.internal:5432/learnlab");
            jail.set_env("LEARNLAB_DATABASE_KEY", "anon-secret");
            jail.set_env("LEARNLAB_DATABASE_KIND", "mongodb");

            let config = RepositoryFactoryConfig::from_env().expect("config should load");
            assert_eq!(config.kind, DatabaseKind::MongoDb);
            Ok(())
        });
    }

    #[test]
    fn file_layer_sits_under_the_environment() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "url = \"postgres://file.internal:5432/learnlab\"\nkey = \"file-key\"\nmax_connections = 2"
        )
        .expect("write config");

        figment::Jail::expect_with(|jail| {
            jail.set_env("LEARNLAB_DATABASE_KEY", "env-key");

            let config =
                RepositoryFactoryConfig::load_from(file.path()).expect("config should load");
            assert_eq!(config.url, "postgres://file.internal:5432/learnlab");
            // The environment overrides the file for the same key.
            assert_eq!(config.key, "env-key");
            assert_eq!(config.max_connections, 2);
            Ok(())
        });
    }

    #[test]
    fn kind_display_matches_config_strings() {
        assert_eq!(DatabaseKind::PostgreSql.to_string(), "postgresql");
        assert_eq!(DatabaseKind::MongoDb.to_string(), "mongodb");
        assert_eq!(DatabaseKind::MySql.to_string(), "mysql");
    }
}
