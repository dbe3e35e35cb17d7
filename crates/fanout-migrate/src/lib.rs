//! # fanout-migrate
//!
//! Copy every table of a MySQL database into three kinds of destination:
//!
//! - **JSON files**: one indented array per table
//! - **Document store** (MongoDB): one collection per table, one document per row
//! - **Column-family store** (Cassandra/Scylla): one table per source table, with
//!   a schema synthesized from the source columns and a primary key inferred
//!   from the `nid_` naming convention
//!
//! Every (destination, table) pair is isolated: a table that fails to read,
//! to get a schema, or to write some records is reported on its own and the
//! run moves on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fanout_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> fanout_migrate::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::connect(&config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Wrote {} records", result.records_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod sink;
pub mod synthesis;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{
    ColumnFamilyConfig, Config, DocumentConfig, FileSinkConfig, MigrationConfig, SourceConfig,
};
pub use crate::core::{
    ColumnDescriptor, ColumnFamilyStore, CqlType, CqlValue, Destination, DestinationSchema,
    DocumentStore, Record, Scalar, Sink, SourceReader, SourceTypeCode, SourceValue,
};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    DestinationReport, HealthCheck, MigrationResult, Orchestrator, OutcomeStatus, TableOutcome,
};
pub use sink::{ColumnFamilySink, DocumentSink, FileSink};
