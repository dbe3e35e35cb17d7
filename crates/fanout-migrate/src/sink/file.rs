//! JSON file sink.
//!
//! Records are buffered per table and written as a single artifact when the
//! table completes, so an aborted table never leaves a partial file behind.
//! Table names that cannot be file names are refused in `prepare`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{ColumnDescriptor, Destination, Record, Sink};
use crate::error::{MigrateError, Result};

/// Writes `<output_dir>/<table>.json` per table.
pub struct FileSink {
    output_dir: PathBuf,
    indent: Vec<u8>,
    buffers: Mutex<HashMap<String, Vec<Record>>>,
}

impl FileSink {
    /// Create a sink writing into `output_dir` with 4-space indentation.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            indent: b"    ".to_vec(),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Override the indentation width.
    pub fn with_indent(mut self, width: usize) -> Self {
        self.indent = vec![b' '; width];
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Artifact path for a table, refusing names that would escape the
    /// output directory.
    pub fn artifact_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty()
            || table == "."
            || table == ".."
            || table.contains(['/', '\\', '\0'])
        {
            return Err(MigrateError::store(format!(
                "table name {:?} is not usable as a file name",
                table
            )));
        }
        Ok(self.output_dir.join(format!("{}.json", table)))
    }

    fn render(&self, records: &[Record]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&self.indent);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        records.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

#[async_trait]
impl Sink for FileSink {
    fn destination(&self) -> Destination {
        Destination::File
    }

    fn buffers_writes(&self) -> bool {
        true
    }

    async fn prepare(&self, table: &str, _columns: &[ColumnDescriptor]) -> Result<()> {
        self.artifact_path(table)?;
        Ok(())
    }

    async fn write(&self, table: &str, record: &Record) -> Result<()> {
        self.buffers
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn finish(&self, table: &str) -> Result<()> {
        let records = self
            .buffers
            .lock()
            .await
            .remove(table)
            .unwrap_or_default();

        let path = self.artifact_path(table)?;
        let content = self.render(&records)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Wrote {} records to {:?}", records.len(), path);
        Ok(())
    }

    async fn discard(&self, table: &str) {
        self.buffers.lock().await.remove(table);
    }

    async fn ping(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}
