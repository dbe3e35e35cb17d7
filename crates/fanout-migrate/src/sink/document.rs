//! Document store sink: one document per record, collection named after the table.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{ColumnDescriptor, Destination, DocumentStore, Record, Sink};
use crate::error::{MigrateError, Result};

pub struct DocumentSink {
    store: Arc<dyn DocumentStore>,
}

impl DocumentSink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Sink for DocumentSink {
    fn destination(&self) -> Destination {
        Destination::Document
    }

    // Collections are created implicitly on first insert.
    async fn prepare(&self, _table: &str, _columns: &[ColumnDescriptor]) -> Result<()> {
        Ok(())
    }

    async fn write(&self, table: &str, record: &Record) -> Result<()> {
        self.store
            .insert_one(table, record)
            .await
            .map_err(|e| match e {
                MigrateError::RecordWrite { .. } => e,
                other => MigrateError::record_write(table, other),
            })
    }

    async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Scalar;
    use crate::drivers::memory::MemoryDocumentStore;

    fn record(id: i64) -> Record {
        let columns: Arc<[String]> = vec!["nid_user".to_string(), "name".to_string()].into();
        Record::new(columns, vec![Scalar::Integer(id), Scalar::Text("Ana".into())])
    }

    #[tokio::test]
    async fn test_inserts_into_table_collection() {
        let store = Arc::new(MemoryDocumentStore::new());
        let sink = DocumentSink::new(store.clone());

        sink.prepare("users", &[]).await.unwrap();
        sink.write("users", &record(1)).await.unwrap();
        sink.write("users", &record(2)).await.unwrap();
        sink.finish("users").await.unwrap();

        let docs = store.documents("users");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].get("nid_user"), Some(&Scalar::Integer(2)));
    }

    #[tokio::test]
    async fn test_rejection_becomes_record_write_error() {
        let store = Arc::new(
            MemoryDocumentStore::new()
                .reject_when(|_, doc| doc.get("nid_user") == Some(&Scalar::Integer(2))),
        );
        let sink = DocumentSink::new(store.clone());

        sink.write("users", &record(1)).await.unwrap();
        let err = sink.write("users", &record(2)).await.unwrap_err();
        assert!(matches!(err, MigrateError::RecordWrite { ref table, .. } if table == "users"));
        sink.write("users", &record(3)).await.unwrap();

        assert_eq!(store.documents("users").len(), 2);
    }
}
