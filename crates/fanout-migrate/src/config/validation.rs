//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.is_empty() {
        return Err(MigrateError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(MigrateError::Config("source.database is required".into()));
    }
    if config.source.user.is_empty() {
        return Err(MigrateError::Config("source.user is required".into()));
    }
    if config.source.r#type != "mysql" {
        return Err(MigrateError::Config(format!(
            "source.type must be 'mysql', got '{}'",
            config.source.r#type
        )));
    }

    // Destination validation
    if let Some(ref document) = config.document {
        if document.host.is_empty() {
            return Err(MigrateError::Config("document.host is required".into()));
        }
        if document.database.is_empty() {
            return Err(MigrateError::Config("document.database is required".into()));
        }
    }
    if let Some(ref cf) = config.column_family {
        if cf.contact_points().is_empty() {
            return Err(MigrateError::Config(
                "column_family.hosts must list at least one host".into(),
            ));
        }
        if cf.keyspace.is_empty() {
            return Err(MigrateError::Config(
                "column_family.keyspace is required".into(),
            ));
        }
    }
    if config.enabled_destinations().is_empty() {
        return Err(MigrateError::Config(
            "at least one destination must be configured and listed in migration.destinations"
                .into(),
        ));
    }

    // Migration config validation
    if config.migration.table_workers == 0 {
        return Err(MigrateError::Config(
            "migration.table_workers must be at least 1".into(),
        ));
    }
    for pattern in config
        .migration
        .include_tables
        .iter()
        .chain(&config.migration.exclude_tables)
    {
        glob::Pattern::new(pattern).map_err(|e| {
            MigrateError::Config(format!("invalid table pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}
