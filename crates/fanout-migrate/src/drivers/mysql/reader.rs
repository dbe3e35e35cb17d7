//! MySQL/MariaDB source reader implementation.
//!
//! Implements the `SourceReader` trait for reading data from MySQL/MariaDB databases.
//! Uses SQLx for connection pooling and async query execution.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Row, ValueRef};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::core::{ColumnDescriptor, RawRow, SourceReader, SourceTypeCode, SourceValue, TableRows};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pooled connections; one cursor per concurrently migrated table.
const MAX_CONNECTIONS: u32 = 8;

/// Rows buffered between the cursor task and the orchestrator.
const ROW_BUFFER: usize = 1024;

/// MySQL/MariaDB source reader implementation.
pub struct MysqlReader {
    pool: MySqlPool,
    database: String,
}

impl MysqlReader {
    /// Connect to the source and verify the connection.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        // Default to Preferred SSL mode for source connections
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::connection("mysql", e))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::connection("mysql", e))?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    /// Load column names and type codes for a table, in ordinal order.
    async fn load_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        // CAST to CHAR to handle collation differences where information_schema
        // may return VARBINARY instead of VARCHAR
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::table_read(table, e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("COLUMN_NAME")
                .map_err(|e| MigrateError::table_read(table, e))?;
            let data_type: String = row
                .try_get("DATA_TYPE")
                .map_err(|e| MigrateError::table_read(table, e))?;
            columns.push(ColumnDescriptor::new(
                name,
                SourceTypeCode::from_data_type(&data_type),
            ));
        }

        if columns.is_empty() {
            return Err(MigrateError::table_read(table, "table has no columns"));
        }
        Ok(columns)
    }

    /// Stream every row of a table into the channel.
    async fn read_rows(
        pool: MySqlPool,
        table: String,
        columns: Vec<ColumnDescriptor>,
        tx: mpsc::Sender<Result<RawRow>>,
    ) {
        let col_list = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", col_list, quote_ident(&table));

        let mut rows = sqlx::query(&sql).fetch(&pool);
        let mut count: u64 = 0;
        loop {
            let item = match rows.try_next().await {
                Ok(Some(row)) => row_to_values(&row, &columns)
                    .map_err(|e| MigrateError::table_read(&table, e)),
                Ok(None) => break,
                Err(e) => Err(MigrateError::table_read(&table, e)),
            };
            let failed = item.is_err();
            if tx.send(item).await.is_err() || failed {
                // Receiver dropped or the table is aborted
                break;
            }
            count += 1;
        }

        debug!("{}: read {} rows", table, count);
    }
}

/// Quote a MySQL identifier.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Convert a MySQL row to raw source values.
fn row_to_values(
    row: &MySqlRow,
    columns: &[ColumnDescriptor],
) -> std::result::Result<RawRow, sqlx::Error> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            // Handle NULL values
            let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
            if is_null {
                return Ok(SourceValue::Null);
            }
            decode_value(row, i, col.type_code)
        })
        .collect()
}

/// Decode one non-null value according to its column type code.
fn decode_value(
    row: &MySqlRow,
    i: usize,
    code: SourceTypeCode,
) -> std::result::Result<SourceValue, sqlx::Error> {
    use SourceTypeCode as T;

    let value = match code {
        // Integer types; unsigned columns may exceed i64
        T::Tiny | T::Short | T::Long | T::Int24 | T::LongLong | T::Year => {
            match row.try_get::<i64, _>(i) {
                Ok(v) => SourceValue::Int(v),
                Err(_) => SourceValue::UInt(row.try_get::<u64, _>(i)?),
            }
        }

        // Floating point; FLOAT goes through its shortest text form so that
        // 0.1 stays 0.1 once widened
        T::Float => {
            let v = row.try_get::<f32, _>(i)?;
            SourceValue::Float(v.to_string().parse().unwrap_or(v as f64))
        }
        T::Double => SourceValue::Float(row.try_get::<f64, _>(i)?),

        // Decimal
        T::Decimal | T::NewDecimal => {
            SourceValue::Decimal(row.try_get::<rust_decimal::Decimal, _>(i)?)
        }

        // Date/Time types
        T::Date | T::NewDate => SourceValue::Date(row.try_get::<chrono::NaiveDate, _>(i)?),
        T::Time => match row.try_get::<chrono::NaiveTime, _>(i) {
            Ok(t) => SourceValue::Time(t),
            // Negative or >24h durations
            Err(_) => SourceValue::Opaque(
                row.try_get::<sqlx::mysql::types::MySqlTime, _>(i)?
                    .to_string(),
            ),
        },
        T::DateTime | T::Timestamp => {
            SourceValue::DateTime(row.try_get::<chrono::NaiveDateTime, _>(i)?)
        }

        T::Bit => match row.try_get::<u64, _>(i) {
            Ok(v) => SourceValue::UInt(v),
            Err(_) => SourceValue::Bool(row.try_get::<bool, _>(i)?),
        },

        // Character types, falling back to raw bytes for binary collations
        T::VarChar
        | T::VarString
        | T::String
        | T::TinyBlob
        | T::MediumBlob
        | T::LongBlob
        | T::Blob => match row.try_get::<String, _>(i) {
            Ok(s) => SourceValue::Text(s),
            Err(_) => SourceValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        },

        // JSON, geometry, enum/set and anything unrecognized
        _ => SourceValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
    };
    Ok(value)
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn list_tables(&self) -> Result<Vec<String>> {
        // CAST to CHAR to handle collation differences where information_schema
        // may return VARBINARY instead of VARCHAR
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::store(format!("listing MySQL tables: {}", e)))?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("TABLE_NAME"))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MigrateError::store(format!("listing MySQL tables: {}", e)))?;

        info!(
            "Found {} tables in MySQL database '{}'",
            tables.len(),
            self.database
        );
        Ok(tables)
    }

    async fn read_table(&self, table: &str) -> Result<TableRows> {
        let columns = self.load_columns(table).await?;

        let (tx, rx) = mpsc::channel(ROW_BUFFER);
        tokio::spawn(Self::read_rows(
            self.pool.clone(),
            table.to_string(),
            columns.clone(),
            tx,
        ));

        Ok(TableRows { columns, rows: rx })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::connection("mysql", e))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
