//! Store driver implementations.
//!
//! Each driver implements one of the core store traits:
//!
//! - [`memory`]: in-process source and stores, always available
//! - [`mysql`]: `SourceReader` over SQLx (feature `mysql`)
//! - [`mongodb`]: `DocumentStore` over the official driver (feature `mongodb`)
//! - [`scylla`]: `ColumnFamilyStore` over the Scylla driver, compatible with
//!   Cassandra (feature `scylla`)
//!
//! All three feature-gated drivers are enabled by the default `full` feature.
//!
//! # Adding New Stores
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement `SourceReader`, `DocumentStore` or `ColumnFamilyStore`
//! 3. Wire it into `orchestrator::connect_source` / `connect_sink`
//! 4. Gate the driver with a feature flag in `Cargo.toml`

pub mod memory;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mongodb")]
pub mod mongodb;

#[cfg(feature = "scylla")]
pub mod scylla;

pub use memory::{MemoryColumnFamilyStore, MemoryDocumentStore, MemoryRow, MemorySource};

#[cfg(feature = "mysql")]
pub use mysql::MysqlReader;

#[cfg(feature = "mongodb")]
pub use self::mongodb::MongoDocumentStore;

#[cfg(feature = "scylla")]
pub use self::scylla::ScyllaColumnFamilyStore;
