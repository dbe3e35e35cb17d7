//! Column-family sink.
//!
//! On `prepare` the destination schema is synthesized from the source columns
//! and created with `CREATE TABLE IF NOT EXISTS`; each record is then bound
//! positionally against the synthesized column types and inserted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{
    ColumnDescriptor, ColumnFamilyStore, CqlType, CqlValue, Destination, DestinationSchema,
    InsertStatement, Record, Scalar, Sink,
};
use crate::error::{MigrateError, Result};
use crate::synthesis::{synthesize_schema, KEY_PREFIX};

/// Schema and insert statement of a prepared table.
struct PreparedTable {
    schema: DestinationSchema,
    insert: InsertStatement,
}

pub struct ColumnFamilySink {
    store: Arc<dyn ColumnFamilyStore>,
    require_primary_key: bool,
    prepared: Mutex<HashMap<String, Arc<PreparedTable>>>,
}

impl ColumnFamilySink {
    pub fn new(store: Arc<dyn ColumnFamilyStore>) -> Self {
        Self {
            store,
            require_primary_key: true,
            prepared: Mutex::new(HashMap::new()),
        }
    }

    /// When false, keyless tables are sent to the store as-is and the store
    /// decides whether to accept them.
    pub fn require_primary_key(mut self, require: bool) -> Self {
        self.require_primary_key = require;
        self
    }

    async fn prepared(&self, table: &str) -> Result<Arc<PreparedTable>> {
        self.prepared
            .lock()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| MigrateError::record_write(table, "table was not prepared"))
    }
}

#[async_trait]
impl Sink for ColumnFamilySink {
    fn destination(&self) -> Destination {
        Destination::ColumnFamily
    }

    async fn prepare(&self, table: &str, columns: &[ColumnDescriptor]) -> Result<()> {
        let schema = synthesize_schema(table, columns);

        if !schema.has_primary_key() && self.require_primary_key {
            return Err(MigrateError::schema_synthesis(
                table,
                format!("no column starts with '{}' to use as primary key", KEY_PREFIX),
            ));
        }

        debug!("{}: {}", table, schema.create_statement());
        self.store
            .execute_schema(&schema)
            .await
            .map_err(|e| match e {
                MigrateError::SchemaSynthesis { .. } => e,
                other => MigrateError::schema_synthesis(table, other),
            })?;

        let insert = schema.insert_statement();
        self.prepared
            .lock()
            .await
            .insert(table.to_string(), Arc::new(PreparedTable { schema, insert }));
        Ok(())
    }

    async fn write(&self, table: &str, record: &Record) -> Result<()> {
        let prepared = self.prepared(table).await?;

        if record.columns() != prepared.insert.columns.as_slice() {
            return Err(MigrateError::record_write(
                table,
                "record columns do not match the destination schema",
            ));
        }

        let values = prepared
            .schema
            .columns
            .iter()
            .zip(record.values())
            .map(|((column, ty), value)| {
                bind_value(*ty, value)
                    .map_err(|msg| MigrateError::record_write(table, format!("{}: {}", column, msg)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.store
            .execute_insert(&prepared.insert, &values)
            .await
            .map_err(|e| match e {
                MigrateError::RecordWrite { .. } => e,
                other => MigrateError::record_write(table, other),
            })
    }

    async fn finish(&self, table: &str) -> Result<()> {
        self.prepared.lock().await.remove(table);
        Ok(())
    }

    async fn discard(&self, table: &str) {
        self.prepared.lock().await.remove(table);
    }

    async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// Bind a normalized scalar to a parameter of the given column type.
///
/// Text columns accept any scalar in its display form. Numeric columns accept
/// integers (range-checked for `int`) and, for floating types, floats.
pub fn bind_value(ty: CqlType, value: &Scalar) -> std::result::Result<CqlValue, String> {
    match (ty, value) {
        (_, Scalar::Null) => Ok(CqlValue::Null),
        (CqlType::Text, v) => Ok(CqlValue::Text(v.to_string())),
        (CqlType::Int, Scalar::Integer(v)) => i32::try_from(*v)
            .map(CqlValue::Int)
            .map_err(|_| format!("value {} out of range for int", v)),
        (CqlType::BigInt, Scalar::Integer(v)) => Ok(CqlValue::BigInt(*v)),
        (CqlType::Float, Scalar::Float(v)) => Ok(CqlValue::Float(*v as f32)),
        (CqlType::Float, Scalar::Integer(v)) => Ok(CqlValue::Float(*v as f32)),
        (CqlType::Double, Scalar::Float(v)) => Ok(CqlValue::Double(*v)),
        (CqlType::Double, Scalar::Integer(v)) => Ok(CqlValue::Double(*v as f64)),
        (ty, v) => Err(format!("cannot bind {} value to {} column", v.kind(), ty)),
    }
}
