//! Core traits for the migration pipeline.
//!
//! This module defines the seams between the orchestrator and the stores:
//!
//! - [`SourceReader`]: lists tables and streams rows from the relational source
//! - [`DocumentStore`]: schema-less destination handle (one document per record)
//! - [`ColumnFamilyStore`]: typed destination handle (schema statement + insert)
//! - [`Sink`]: the per-destination capability set the orchestrator drives
//!
//! Store traits model an already-established connection. Normalization and
//! schema synthesis happen above them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

use super::schema::{ColumnDescriptor, DestinationSchema, InsertStatement};
use super::value::{CqlValue, RawRow, Record};

/// Column metadata plus the lazily produced rows of one table.
///
/// The row sequence is consumed once; reading the same table again requires a
/// new [`SourceReader::read_table`] call. An `Err` item aborts the table.
pub struct TableRows {
    /// Columns in source order.
    pub columns: Vec<ColumnDescriptor>,

    /// Rows in source order.
    pub rows: mpsc::Receiver<Result<RawRow>>,
}

/// Read tables from the relational source.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// List table names in the source database.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Start reading a table.
    ///
    /// Returns the column descriptors immediately and streams rows through
    /// the returned receiver, which enables backpressure for large tables.
    async fn read_table(&self, table: &str) -> Result<TableRows>;

    /// Check that the source is reachable.
    async fn ping(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "mysql").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// A schema-less document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document into the named collection, creating the
    /// collection on first use.
    async fn insert_one(&self, collection: &str, document: &Record) -> Result<()>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// A column-family store that enforces typed schemas.
#[async_trait]
pub trait ColumnFamilyStore: Send + Sync {
    /// Issue `CREATE TABLE IF NOT EXISTS` for the schema.
    async fn execute_schema(&self, schema: &DestinationSchema) -> Result<()>;

    /// Execute a positional parameterized insert.
    async fn execute_insert(&self, insert: &InsertStatement, values: &[CqlValue]) -> Result<()>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// The three destination kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    File,
    Document,
    ColumnFamily,
}

impl Destination {
    /// Default processing order.
    pub const ALL: [Destination; 3] = [
        Destination::File,
        Destination::Document,
        Destination::ColumnFamily,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Destination::File => "file",
            Destination::Document => "document",
            Destination::ColumnFamily => "column_family",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "file" | "json" => Ok(Destination::File),
            "document" | "mongodb" => Ok(Destination::Document),
            "column_family" | "cassandra" | "scylla" => Ok(Destination::ColumnFamily),
            other => Err(format!("unknown destination '{}'", other)),
        }
    }
}

/// One destination as seen by the orchestrator.
///
/// # Lifecycle
///
/// For every table: `prepare` once, `write` once per record in source order,
/// then exactly one of `finish` (all rows were read) or `discard` (the table
/// was aborted). A `prepare` failure skips the table without further calls.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Which destination this sink writes to.
    fn destination(&self) -> Destination;

    /// Whether `write` only stages records that reach the store in `finish`.
    /// An aborted table then has nothing written.
    fn buffers_writes(&self) -> bool {
        false
    }

    /// Make the destination ready to receive the table's records.
    async fn prepare(&self, table: &str, columns: &[ColumnDescriptor]) -> Result<()>;

    /// Write one record.
    async fn write(&self, table: &str, record: &Record) -> Result<()>;

    /// Complete the table after its last record.
    async fn finish(&self, _table: &str) -> Result<()> {
        Ok(())
    }

    /// Drop any buffered state for an aborted table.
    async fn discard(&self, _table: &str) {}

    /// Check that the destination is usable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
