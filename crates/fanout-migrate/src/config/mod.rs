//! Configuration loading and validation.
//!
//! Configuration comes either from a YAML file or from the process
//! environment, using the variable names of the original migration script.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an environment-like lookup.
    ///
    /// `MYSQL_*` variables are required. The document and column-family
    /// destinations are enabled when `MONGO_HOST` and `CASSANDRA_HOSTS` are
    /// set. The file destination is always enabled and writes to
    /// `FANOUT_OUTPUT_DIR` (default: current directory).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                MigrateError::Config(format!("environment variable {} is required", key))
            })
        };
        let port = |key: &str, default: u16| -> Result<u16> {
            match var(key) {
                Some(v) => v.trim().parse().map_err(|_| {
                    MigrateError::Config(format!("{} must be a port number, got '{}'", key, v))
                }),
                None => Ok(default),
            }
        };

        let source = SourceConfig {
            r#type: "mysql".to_string(),
            host: required("MYSQL_HOST")?,
            port: port("MYSQL_PORT", 3306)?,
            database: required("MYSQL_DATABASE")?,
            user: required("MYSQL_USER")?,
            password: var("MYSQL_PASSWORD").unwrap_or_default(),
        };

        let mut file = FileSinkConfig::default();
        if let Some(dir) = var("FANOUT_OUTPUT_DIR") {
            file.output_dir = dir.into();
        }

        let document = match var("MONGO_HOST") {
            Some(host) => Some(DocumentConfig {
                host,
                port: port("MONGO_PORT", 27017)?,
                database: required("MONGO_DATABASE")?,
            }),
            None => None,
        };

        let column_family = match var("CASSANDRA_HOSTS") {
            Some(hosts) => Some(ColumnFamilyConfig {
                hosts: hosts.split(',').map(|h| h.trim().to_string()).collect(),
                port: 9042,
                keyspace: required("CASSANDRA_KEYSPACE")?,
                username: var("CASSANDRA_USERNAME"),
                password: var("CASSANDRA_PASSWORD"),
                require_primary_key: true,
            }),
            None => None,
        };

        let config = Config {
            source,
            file: Some(file),
            document,
            column_family,
            migration: MigrationConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
