//! Sink implementations, one per destination kind.
//!
//! - [`FileSink`]: one pretty-printed JSON array per table
//! - [`DocumentSink`]: one document per record in a collection named after the table
//! - [`ColumnFamilySink`]: synthesized schema plus one positional insert per record

mod column_family;
mod document;
mod file;

pub use column_family::{bind_value, ColumnFamilySink};
pub use document::DocumentSink;
pub use file::FileSink;
