//! Connection acquisition.
//!
//! Turns configuration into the source reader and one sink per enabled
//! destination. Any failure here is a connection error and aborts the run
//! before a single table is touched.

use std::sync::Arc;

use tracing::info;

use super::Orchestrator;
use crate::config::Config;
use crate::core::{Destination, Sink, SourceReader};
use crate::error::{MigrateError, Result};
use crate::sink::FileSink;

impl Orchestrator {
    /// Connect to the source and every enabled destination.
    pub async fn connect(config: &Config) -> Result<Self> {
        let source = connect_source(config).await?;

        let mut sinks = Vec::new();
        for destination in config.enabled_destinations() {
            sinks.push(connect_sink(config, destination).await?);
        }

        Ok(Self::new(source, sinks, config.migration.clone()))
    }
}

/// Open the source connection pool.
pub async fn connect_source(config: &Config) -> Result<Arc<dyn SourceReader>> {
    #[cfg(feature = "mysql")]
    {
        let reader = crate::drivers::mysql::MysqlReader::connect(&config.source).await?;
        info!(
            "Connected to source {}:{}/{}",
            config.source.host, config.source.port, config.source.database
        );
        Ok(Arc::new(reader))
    }

    #[cfg(not(feature = "mysql"))]
    {
        let _ = config;
        Err(feature_missing("source", "mysql"))
    }
}

/// Build the sink of one destination, connecting to its store.
pub async fn connect_sink(config: &Config, destination: Destination) -> Result<Arc<dyn Sink>> {
    let missing = || MigrateError::Config(format!("{} destination is not configured", destination));

    match destination {
        Destination::File => {
            let file = config.file.as_ref().ok_or_else(missing)?;
            info!("Writing JSON files to {:?}", file.output_dir);
            Ok(Arc::new(
                FileSink::new(&file.output_dir).with_indent(file.indent),
            ))
        }
        Destination::Document => {
            let document = config.document.as_ref().ok_or_else(missing)?;
            connect_document(document).await
        }
        Destination::ColumnFamily => {
            let cf = config.column_family.as_ref().ok_or_else(missing)?;
            connect_column_family(cf).await
        }
    }
}

#[cfg(feature = "mongodb")]
async fn connect_document(config: &crate::config::DocumentConfig) -> Result<Arc<dyn Sink>> {
    let store = crate::drivers::mongodb::MongoDocumentStore::connect(config).await?;
    info!("Connected to document store {}/{}", config.uri(), config.database);
    Ok(Arc::new(crate::sink::DocumentSink::new(Arc::new(store))))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_document(_config: &crate::config::DocumentConfig) -> Result<Arc<dyn Sink>> {
    Err(feature_missing("document destination", "mongodb"))
}

#[cfg(feature = "scylla")]
async fn connect_column_family(
    config: &crate::config::ColumnFamilyConfig,
) -> Result<Arc<dyn Sink>> {
    let store = crate::drivers::scylla::ScyllaColumnFamilyStore::connect(config).await?;
    info!(
        "Connected to column-family store {:?}, keyspace {}",
        config.hosts, config.keyspace
    );
    Ok(Arc::new(
        crate::sink::ColumnFamilySink::new(Arc::new(store))
            .require_primary_key(config.require_primary_key),
    ))
}

#[cfg(not(feature = "scylla"))]
async fn connect_column_family(
    _config: &crate::config::ColumnFamilyConfig,
) -> Result<Arc<dyn Sink>> {
    Err(feature_missing("column_family destination", "scylla"))
}

#[allow(dead_code)]
fn feature_missing(what: &str, feature: &str) -> MigrateError {
    MigrateError::Config(format!(
        "{} requires the `{}` feature; rebuild with --features {}",
        what, feature, feature
    ))
}
