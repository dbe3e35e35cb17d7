//! Cassandra/Scylla column-family store.

use std::collections::HashMap;

use async_trait::async_trait;
use ::scylla::client::session::Session;
use ::scylla::client::session_builder::SessionBuilder;
use ::scylla::statement::prepared::PreparedStatement;
use ::scylla::value::CqlValue as DriverValue;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ColumnFamilyConfig;
use crate::core::{ColumnFamilyStore, CqlValue, DestinationSchema, InsertStatement};
use crate::error::{MigrateError, Result};

/// Column-family store bound to one keyspace.
pub struct ScyllaColumnFamilyStore {
    session: Session,
    /// Prepared inserts keyed by CQL text.
    inserts: Mutex<HashMap<String, PreparedStatement>>,
}

impl ScyllaColumnFamilyStore {
    /// Connect to the contact points and switch to the keyspace.
    pub async fn connect(config: &ColumnFamilyConfig) -> Result<Self> {
        let mut builder = SessionBuilder::new().known_nodes(config.contact_points());
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.user(user, password);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| MigrateError::connection("scylla", e))?;
        session
            .use_keyspace(&config.keyspace, false)
            .await
            .map_err(|e| MigrateError::connection("scylla", e))?;

        Ok(Self {
            session,
            inserts: Mutex::new(HashMap::new()),
        })
    }

    /// Prepare an insert on first use and reuse it for every later record.
    async fn prepared_insert(&self, insert: &InsertStatement) -> Result<PreparedStatement> {
        let cached = self.inserts.lock().await.get(&insert.cql).cloned();
        if let Some(prepared) = cached {
            return Ok(prepared);
        }

        debug!("Preparing {}", insert.cql);
        let prepared = self
            .session
            .prepare(insert.cql.as_str())
            .await
            .map_err(|e| MigrateError::record_write(&insert.table, e))?;
        self.inserts
            .lock()
            .await
            .insert(insert.cql.clone(), prepared.clone());
        Ok(prepared)
    }
}

fn to_driver_value(value: &CqlValue) -> Option<DriverValue> {
    match value {
        CqlValue::Null => None,
        CqlValue::Int(v) => Some(DriverValue::Int(*v)),
        CqlValue::BigInt(v) => Some(DriverValue::BigInt(*v)),
        CqlValue::Float(v) => Some(DriverValue::Float(*v)),
        CqlValue::Double(v) => Some(DriverValue::Double(*v)),
        CqlValue::Text(v) => Some(DriverValue::Text(v.clone())),
    }
}

#[async_trait]
impl ColumnFamilyStore for ScyllaColumnFamilyStore {
    async fn execute_schema(&self, schema: &DestinationSchema) -> Result<()> {
        let cql = schema.create_statement();
        debug!("{}", cql);
        self.session
            .query_unpaged(cql, ())
            .await
            .map_err(|e| MigrateError::schema_synthesis(&schema.table_name, e))?;
        Ok(())
    }

    async fn execute_insert(&self, insert: &InsertStatement, values: &[CqlValue]) -> Result<()> {
        let prepared = self.prepared_insert(insert).await?;
        let bound: Vec<Option<DriverValue>> = values.iter().map(to_driver_value).collect();
        self.session
            .execute_unpaged(&prepared, bound)
            .await
            .map_err(|e| MigrateError::record_write(&insert.table, e))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.session
            .query_unpaged("SELECT release_version FROM system.local", ())
            .await
            .map_err(|e| MigrateError::connection("scylla", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDescriptor, SourceTypeCode};
    use crate::synthesis::synthesize_schema;

    #[test]
    fn test_prepared_inserts_are_keyed_per_table() {
        let columns = vec![
            ColumnDescriptor::new("nid_user", SourceTypeCode::Long),
            ColumnDescriptor::new("name", SourceTypeCode::VarString),
        ];
        let users = synthesize_schema("users", &columns);
        let first = users.insert_statement();
        let second = synthesize_schema("users", &columns).insert_statement();
        let other = synthesize_schema("admins", &columns).insert_statement();

        // Every record of a table reuses one prepared statement
        assert_eq!(first.cql, second.cql);
        assert_ne!(first.cql, other.cql);
    }

    #[test]
    fn test_to_driver_value() {
        assert_eq!(to_driver_value(&CqlValue::Null), None);
        assert_eq!(
            to_driver_value(&CqlValue::Int(7)),
            Some(DriverValue::Int(7))
        );
        assert_eq!(
            to_driver_value(&CqlValue::Text("Ana".into())),
            Some(DriverValue::Text("Ana".into()))
        );
    }
}
