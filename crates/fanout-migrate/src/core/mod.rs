//! Core abstractions for the migration pipeline.
//!
//! - [`schema`]: column descriptors, source type codes, destination schemas
//! - [`value`]: raw source values, normalized scalars and records
//! - [`traits`]: the source reader, store handles and the sink capability set

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDescriptor, CqlType, DestinationSchema, InsertStatement, SourceTypeCode};
pub use traits::{ColumnFamilyStore, Destination, DocumentStore, Sink, SourceReader, TableRows};
pub use value::{CqlValue, RawRow, Record, Scalar, SourceValue};
