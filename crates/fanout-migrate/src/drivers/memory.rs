//! In-memory source and stores.
//!
//! Used by the test suites and for dry runs. The column-family store mimics
//! the parts of a real store the pipeline depends on: `IF NOT EXISTS`
//! semantics, typed columns and primary-key requirements.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{
    ColumnDescriptor, ColumnFamilyStore, CqlType, CqlValue, DestinationSchema, DocumentStore,
    InsertStatement, RawRow, Record, SourceReader, TableRows,
};
use crate::error::{MigrateError, Result};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One row of a [`MemorySource`] table: either a row or an injected failure.
#[derive(Debug, Clone)]
pub enum MemoryRow {
    Row(RawRow),
    Fail(String),
}

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<MemoryRow>,
    read_error: Option<String>,
}

/// A source backed by in-memory tables, listed in insertion order.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: Vec<MemoryTable>,
    list_error: Option<String>,
    reads: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its rows.
    pub fn with_table(
        mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<RawRow>,
    ) -> Self {
        self.tables.push(MemoryTable {
            name: name.into(),
            columns,
            rows: rows.into_iter().map(MemoryRow::Row).collect(),
            read_error: None,
        });
        self
    }

    /// Add a table whose row stream may contain failures.
    pub fn with_rows(
        mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<MemoryRow>,
    ) -> Self {
        self.tables.push(MemoryTable {
            name: name.into(),
            columns,
            rows,
            read_error: None,
        });
        self
    }

    /// Add a table that cannot be opened at all.
    pub fn with_unreadable_table(
        mut self,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.tables.push(MemoryTable {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            read_error: Some(message.into()),
        });
        self
    }

    /// Make table enumeration fail.
    pub fn failing_list(mut self, message: impl Into<String>) -> Self {
        self.list_error = Some(message.into());
        self
    }

    /// How many times a table has been opened.
    pub fn read_count(&self, table: &str) -> usize {
        lock(&self.reads).get(table).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        if let Some(ref msg) = self.list_error {
            return Err(MigrateError::store(msg));
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn read_table(&self, table: &str) -> Result<TableRows> {
        let t = self
            .tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| MigrateError::table_read(table, "table does not exist"))?;

        *lock(&self.reads).entry(table.to_string()).or_default() += 1;

        if let Some(ref msg) = t.read_error {
            return Err(MigrateError::table_read(table, msg));
        }

        let (tx, rx) = mpsc::channel(t.rows.len().max(1));
        for row in &t.rows {
            let item = match row {
                MemoryRow::Row(values) => Ok(values.clone()),
                MemoryRow::Fail(msg) => Err(MigrateError::table_read(table, msg)),
            };
            let stop = item.is_err();
            if tx.send(item).await.is_err() || stop {
                break;
            }
        }

        Ok(TableRows {
            columns: t.columns.clone(),
            rows: rx,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

type DocumentFilter = Box<dyn Fn(&str, &Record) -> bool + Send + Sync>;

/// A document store keeping collections in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
    reject: Option<DocumentFilter>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents matching the predicate.
    pub fn reject_when(
        mut self,
        predicate: impl Fn(&str, &Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.reject = Some(Box::new(predicate));
        self
    }

    /// Documents of a collection in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Record> {
        lock(&self.collections)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<_> = lock(&self.collections).keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_one(&self, collection: &str, document: &Record) -> Result<()> {
        if self
            .reject
            .as_ref()
            .is_some_and(|reject| reject(collection, document))
        {
            return Err(MigrateError::store(format!(
                "document rejected by collection {}",
                collection
            )));
        }
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct ColumnFamilyTables {
    schemas: HashMap<String, DestinationSchema>,
    rows: HashMap<String, Vec<Vec<CqlValue>>>,
    schema_statements: usize,
}

/// A column-family store keeping tables in memory.
#[derive(Default)]
pub struct MemoryColumnFamilyStore {
    tables: Mutex<ColumnFamilyTables>,
    reject_keyless: bool,
}

impl MemoryColumnFamilyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse schemas without a primary key, like a real column-family store.
    pub fn rejecting_keyless(mut self) -> Self {
        self.reject_keyless = true;
        self
    }

    pub fn schema(&self, table: &str) -> Option<DestinationSchema> {
        lock(&self.tables).schemas.get(table).cloned()
    }

    /// Inserted rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Vec<CqlValue>> {
        lock(&self.tables).rows.get(table).cloned().unwrap_or_default()
    }

    /// Number of schema statements executed, including no-ops.
    pub fn schema_statements(&self) -> usize {
        lock(&self.tables).schema_statements
    }
}

fn value_fits(ty: CqlType, value: &CqlValue) -> bool {
    matches!(
        (ty, value),
        (_, CqlValue::Null)
            | (CqlType::Int, CqlValue::Int(_))
            | (CqlType::BigInt, CqlValue::BigInt(_))
            | (CqlType::Float, CqlValue::Float(_))
            | (CqlType::Double, CqlValue::Double(_))
            | (CqlType::Text, CqlValue::Text(_))
    )
}

#[async_trait]
impl ColumnFamilyStore for MemoryColumnFamilyStore {
    async fn execute_schema(&self, schema: &DestinationSchema) -> Result<()> {
        if self.reject_keyless && !schema.has_primary_key() {
            return Err(MigrateError::store(format!(
                "table {} requires a PRIMARY KEY",
                schema.table_name
            )));
        }

        let mut tables = lock(&self.tables);
        tables.schema_statements += 1;
        match tables.schemas.get(&schema.table_name) {
            // IF NOT EXISTS: an existing table is left untouched
            Some(existing) if existing == schema => Ok(()),
            Some(_) => Err(MigrateError::store(format!(
                "table {} already exists with a different definition",
                schema.table_name
            ))),
            None => {
                tables
                    .schemas
                    .insert(schema.table_name.clone(), schema.clone());
                Ok(())
            }
        }
    }

    async fn execute_insert(&self, insert: &InsertStatement, values: &[CqlValue]) -> Result<()> {
        let mut tables = lock(&self.tables);
        let schema = tables
            .schemas
            .get(&insert.table)
            .ok_or_else(|| MigrateError::store(format!("unknown table {}", insert.table)))?;

        if insert.columns.len() != values.len() {
            return Err(MigrateError::store(format!(
                "expected {} bind values, got {}",
                insert.columns.len(),
                values.len()
            )));
        }

        for (column, value) in insert.columns.iter().zip(values) {
            let ty = schema.column_type(column).ok_or_else(|| {
                MigrateError::store(format!("unknown column {}.{}", insert.table, column))
            })?;
            if !value_fits(ty, value) {
                return Err(MigrateError::store(format!(
                    "invalid value for {} column {}",
                    ty, column
                )));
            }
        }

        if let Some(ref pk) = schema.primary_key {
            let pk_missing = insert
                .columns
                .iter()
                .position(|c| c == pk)
                .map_or(true, |idx| values[idx] == CqlValue::Null);
            if pk_missing {
                return Err(MigrateError::store(format!(
                    "primary key {} must not be null",
                    pk
                )));
            }
        }

        tables
            .rows
            .entry(insert.table.clone())
            .or_default()
            .push(values.to_vec());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SourceTypeCode, SourceValue};
    use crate::synthesis::synthesize_schema;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("nid_x", SourceTypeCode::Long),
            ColumnDescriptor::new("label", SourceTypeCode::VarString),
        ]
    }

    #[tokio::test]
    async fn test_source_streams_rows_in_order() {
        let source = MemorySource::new().with_table(
            "t",
            columns(),
            vec![
                vec![SourceValue::Int(1), "a".into()],
                vec![SourceValue::Int(2), "b".into()],
            ],
        );

        let mut rows = source.read_table("t").await.unwrap();
        assert_eq!(rows.columns.len(), 2);
        assert_eq!(rows.rows.recv().await.unwrap().unwrap()[0], SourceValue::Int(1));
        assert_eq!(rows.rows.recv().await.unwrap().unwrap()[0], SourceValue::Int(2));
        assert!(rows.rows.recv().await.is_none());
        assert_eq!(source.read_count("t"), 1);
    }

    #[tokio::test]
    async fn test_source_injected_failure_ends_stream() {
        let source = MemorySource::new().with_rows(
            "t",
            columns(),
            vec![
                MemoryRow::Row(vec![SourceValue::Int(1), "a".into()]),
                MemoryRow::Fail("connection reset".into()),
                MemoryRow::Row(vec![SourceValue::Int(3), "c".into()]),
            ],
        );

        let mut rows = source.read_table("t").await.unwrap();
        assert!(rows.rows.recv().await.unwrap().is_ok());
        assert!(rows.rows.recv().await.unwrap().is_err());
        assert!(rows.rows.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_column_family_schema_if_not_exists() {
        let store = MemoryColumnFamilyStore::new();
        let schema = synthesize_schema("t", &columns());

        store.execute_schema(&schema).await.unwrap();
        store.execute_schema(&schema).await.unwrap();
        assert_eq!(store.schema_statements(), 2);

        let mut other = schema.clone();
        other.columns[1].1 = CqlType::Int;
        assert!(store.execute_schema(&other).await.is_err());
    }

    #[tokio::test]
    async fn test_column_family_type_checks_inserts() {
        let store = MemoryColumnFamilyStore::new();
        let schema = synthesize_schema("t", &columns());
        store.execute_schema(&schema).await.unwrap();
        let insert = schema.insert_statement();

        store
            .execute_insert(&insert, &[CqlValue::Int(1), CqlValue::Text("a".into())])
            .await
            .unwrap();
        assert!(store
            .execute_insert(&insert, &[CqlValue::Text("1".into()), CqlValue::Null])
            .await
            .is_err());
        assert!(store
            .execute_insert(&insert, &[CqlValue::Null, CqlValue::Text("a".into())])
            .await
            .is_err());
        assert_eq!(store.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn test_keyless_rejection() {
        let store = MemoryColumnFamilyStore::new().rejecting_keyless();
        let schema = synthesize_schema(
            "logs",
            &[ColumnDescriptor::new("id", SourceTypeCode::Long)],
        );
        assert!(store.execute_schema(&schema).await.is_err());
    }
}
