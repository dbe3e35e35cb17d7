//! MongoDB document store.

use async_trait::async_trait;
use ::mongodb::bson::{doc, Bson, Document};
use ::mongodb::{Client, Database};

use crate::config::DocumentConfig;
use crate::core::{DocumentStore, Record, Scalar};
use crate::error::{MigrateError, Result};

/// Document store backed by one MongoDB database.
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Connect and verify the server answers a ping.
    pub async fn connect(config: &DocumentConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.uri())
            .await
            .map_err(|e| MigrateError::connection("mongodb", e))?;
        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::connection("mongodb", e))?;

        Ok(Self { database })
    }
}

/// Convert a record into a BSON document, keeping column order.
pub fn to_document(record: &Record) -> Document {
    record
        .iter()
        .map(|(column, value)| (column.to_string(), to_bson(value)))
        .collect()
}

fn to_bson(value: &Scalar) -> Bson {
    match value {
        Scalar::Null => Bson::Null,
        Scalar::Bool(v) => Bson::Boolean(*v),
        Scalar::Integer(v) => match i32::try_from(*v) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(*v),
        },
        Scalar::Float(v) => Bson::Double(*v),
        Scalar::Text(v) => Bson::String(v.clone()),
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert_one(&self, collection: &str, document: &Record) -> Result<()> {
        self.database
            .collection::<Document>(collection)
            .insert_one(to_document(document))
            .await
            .map_err(|e| MigrateError::record_write(collection, e))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::connection("mongodb", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_to_document_keeps_order_and_types() {
        let columns: Arc<[String]> = vec![
            "nid_user".to_string(),
            "name".to_string(),
            "balance".to_string(),
            "visits".to_string(),
            "deleted".to_string(),
        ]
        .into();
        let record = Record::new(
            columns,
            vec![
                Scalar::Integer(1),
                Scalar::Text("Ana".into()),
                Scalar::Float(2.5),
                Scalar::Integer(i64::from(i32::MAX) + 1),
                Scalar::Null,
            ],
        );

        let doc = to_document(&record);
        let keys: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["nid_user", "name", "balance", "visits", "deleted"]);
        assert_eq!(doc.get("nid_user"), Some(&Bson::Int32(1)));
        assert_eq!(doc.get("visits"), Some(&Bson::Int64(2_147_483_648)));
        assert_eq!(doc.get("deleted"), Some(&Bson::Null));
    }
}
