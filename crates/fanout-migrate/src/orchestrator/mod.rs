//! Migration orchestrator - main workflow coordinator.
//!
//! Destinations are processed one after another in configured order. Within
//! a destination every table runs through
//! `Pending -> Preparing -> Writing -> {Completed | Failed}` and ends with its
//! own [`TableOutcome`]; a failing table never affects another table.

mod pools;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::core::{Destination, Sink, SourceReader};
use crate::error::{MigrateError, Result};
use crate::normalize;

pub use pools::{connect_sink, connect_source};

/// Terminal state of one (destination, table) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Every record was written.
    Succeeded,

    /// The table was read completely but some records were rejected.
    Partial {
        failed_records: u64,
        first_error: String,
    },

    /// The table was aborted.
    Failed { reason: String },
}

/// Outcome of migrating one table to one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub table: String,
    pub destination: Destination,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Records accepted by the destination before the table ended.
    pub records_written: u64,
    pub duration_seconds: f64,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }
}

/// All table outcomes of one destination, in source table order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationReport {
    pub destination: Destination,
    pub outcomes: Vec<TableOutcome>,
}

impl DestinationReport {
    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.outcomes.iter().find(|o| o.table == table)
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: `completed`, `completed_with_errors` or `cancelled`.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Source tables selected for the run.
    pub tables_total: usize,

    /// (destination, table) pairs that fully succeeded.
    pub outcomes_succeeded: usize,

    /// (destination, table) pairs with rejected records.
    pub outcomes_partial: usize,

    /// (destination, table) pairs that were aborted.
    pub outcomes_failed: usize,

    /// Records written across all destinations.
    pub records_written: u64,

    /// Per-destination outcomes in processing order.
    pub destinations: Vec<DestinationReport>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether any table failed or lost records.
    pub fn has_failures(&self) -> bool {
        self.outcomes_partial > 0 || self.outcomes_failed > 0
    }

    pub fn destination(&self, destination: Destination) -> Option<&DestinationReport> {
        self.destinations
            .iter()
            .find(|d| d.destination == destination)
    }
}

/// Reachability of one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Migration orchestrator.
pub struct Orchestrator {
    source: Arc<dyn SourceReader>,
    sinks: Vec<Arc<dyn Sink>>,
    migration: MigrationConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator over established connections.
    ///
    /// Sinks run in the order given.
    pub fn new(
        source: Arc<dyn SourceReader>,
        sinks: Vec<Arc<dyn Sink>>,
        migration: MigrationConfig,
    ) -> Self {
        Self {
            source,
            sinks,
            migration,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Destinations in processing order.
    pub fn destinations(&self) -> Vec<Destination> {
        self.sinks.iter().map(|s| s.destination()).collect()
    }

    /// List source tables selected by the include/exclude patterns.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.source.list_tables().await?;
        filter_tables(
            tables,
            &self.migration.include_tables,
            &self.migration.exclude_tables,
        )
    }

    /// Run the migration.
    ///
    /// Only a failure to enumerate tables aborts the run; every table failure
    /// is reported in the result instead.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let timer = Instant::now();

        info!("Starting migration run: {}", run_id);

        let tables = self.list_tables().await?;
        info!(
            "Found {} tables to migrate to {} destinations",
            tables.len(),
            self.sinks.len()
        );

        let mut destinations = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, skipping {}", sink.destination());
                break;
            }
            destinations.push(self.migrate_destination(sink.as_ref(), &tables).await);
        }

        let completed_at = Utc::now();
        let duration = timer.elapsed().as_secs_f64();

        let all = destinations.iter().flat_map(|d| &d.outcomes);
        let mut outcomes_succeeded = 0;
        let mut outcomes_partial = 0;
        let mut outcomes_failed = 0;
        let mut records_written = 0;
        for outcome in all {
            records_written += outcome.records_written;
            match outcome.status {
                OutcomeStatus::Succeeded => outcomes_succeeded += 1,
                OutcomeStatus::Partial { .. } => outcomes_partial += 1,
                OutcomeStatus::Failed { .. } => outcomes_failed += 1,
            }
        }

        let status = if self.cancel.is_cancelled() {
            "cancelled"
        } else if outcomes_partial + outcomes_failed > 0 {
            "completed_with_errors"
        } else {
            "completed"
        };

        let result = MigrationResult {
            run_id,
            status: status.to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            tables_total: tables.len(),
            outcomes_succeeded,
            outcomes_partial,
            outcomes_failed,
            records_written,
            destinations,
        };

        info!(
            "Migration {}: {} tables, {} records written in {:.1}s ({} partial, {} failed)",
            result.status,
            result.tables_total,
            result.records_written,
            result.duration_seconds,
            result.outcomes_partial,
            result.outcomes_failed
        );

        Ok(result)
    }

    /// Migrate every table to one destination.
    ///
    /// Up to `table_workers` tables run at once; outcomes keep source order.
    async fn migrate_destination(&self, sink: &dyn Sink, tables: &[String]) -> DestinationReport {
        let destination = sink.destination();
        let workers = self.migration.table_workers.max(1);
        info!(
            "Migrating {} tables to {} with {} workers",
            tables.len(),
            destination,
            workers
        );

        let outcomes: Vec<TableOutcome> = stream::iter(tables)
            .map(|table| self.migrate_table(sink, table))
            .buffered(workers)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        DestinationReport {
            destination,
            outcomes,
        }
    }

    /// Run one table through the state machine. Returns `None` when the run
    /// was cancelled before the table started.
    async fn migrate_table(&self, sink: &dyn Sink, table: &str) -> Option<TableOutcome> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let destination = sink.destination();
        let timer = Instant::now();
        let mut written: u64 = 0;

        let status = match self.write_table(sink, table, &mut written).await {
            Ok((0, _)) => {
                info!("{} -> {}: completed ({} records)", table, destination, written);
                OutcomeStatus::Succeeded
            }
            Ok((failed_records, first_error)) => {
                warn!(
                    "{} -> {}: completed with {} rejected records ({} written)",
                    table, destination, failed_records, written
                );
                OutcomeStatus::Partial {
                    failed_records,
                    first_error: first_error.unwrap_or_default(),
                }
            }
            Err(e) => {
                if sink.buffers_writes() {
                    written = 0;
                }
                error!("{} -> {}: failed - {}", table, destination, e);
                OutcomeStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        debug!(
            "{} -> {}: {}",
            table,
            destination,
            if matches!(status, OutcomeStatus::Failed { .. }) {
                "Failed"
            } else {
                "Completed"
            }
        );

        Some(TableOutcome {
            table: table.to_string(),
            destination,
            status,
            records_written: written,
            duration_seconds: timer.elapsed().as_secs_f64(),
        })
    }

    /// Read, prepare and write one table. Returns the number of rejected
    /// records and the first rejection; `Err` aborts the table.
    async fn write_table(
        &self,
        sink: &dyn Sink,
        table: &str,
        written: &mut u64,
    ) -> Result<(u64, Option<String>)> {
        let destination = sink.destination();

        debug!("{} -> {}: Pending -> Preparing", table, destination);
        let mut rows = self.source.read_table(table).await?;
        sink.prepare(table, &rows.columns).await?;

        debug!("{} -> {}: Preparing -> Writing", table, destination);
        let names = normalize::column_names(&rows.columns);
        let mut failed: u64 = 0;
        let mut first_error = None;

        while let Some(row) = rows.rows.recv().await {
            let raw = match row {
                Ok(raw) if raw.len() == names.len() => raw,
                Ok(raw) => {
                    sink.discard(table).await;
                    return Err(MigrateError::table_read(
                        table,
                        format!(
                            "row has {} values but the table has {} columns",
                            raw.len(),
                            names.len()
                        ),
                    ));
                }
                Err(e) => {
                    sink.discard(table).await;
                    return Err(e);
                }
            };

            let record = normalize::normalize(&names, raw);
            match sink.write(table, &record).await {
                Ok(()) => *written += 1,
                Err(e) => {
                    warn!("{} -> {}: record rejected - {}", table, destination, e);
                    failed += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        sink.finish(table).await?;
        Ok((failed, first_error))
    }

    /// Ping the source and every destination.
    pub async fn health_check(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::with_capacity(self.sinks.len() + 1);
        checks.push(health(self.source.db_type().to_string(), self.source.ping().await));
        for sink in &self.sinks {
            checks.push(health(sink.destination().to_string(), sink.ping().await));
        }
        checks
    }

    /// Close the source connection.
    pub async fn close(&self) {
        self.source.close().await;
    }
}

fn health(component: String, result: Result<()>) -> HealthCheck {
    match result {
        Ok(()) => HealthCheck {
            component,
            ok: true,
            error: None,
        },
        Err(e) => HealthCheck {
            component,
            ok: false,
            error: Some(e.to_string()),
        },
    }
}

/// Apply include/exclude glob patterns, keeping source order.
fn filter_tables(
    tables: Vec<String>,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<String>> {
    let compile = |patterns: &[String]| -> Result<Vec<glob::Pattern>> {
        patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    MigrateError::Config(format!("invalid table pattern '{}': {}", p, e))
                })
            })
            .collect()
    };
    let include = compile(include)?;
    let exclude = compile(exclude)?;

    Ok(tables
        .into_iter()
        .filter(|t| include.is_empty() || include.iter().any(|p| p.matches(t)))
        .filter(|t| !exclude.iter().any(|p| p.matches(t)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDescriptor, SourceTypeCode, SourceValue};
    use crate::drivers::memory::{MemoryDocumentStore, MemoryRow, MemorySource};
    use crate::sink::{DocumentSink, FileSink};

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("nid_item", SourceTypeCode::Long),
            ColumnDescriptor::new("label", SourceTypeCode::VarString),
        ]
    }

    fn row(id: i64) -> Vec<SourceValue> {
        vec![SourceValue::Int(id), SourceValue::Text(format!("item {}", id))]
    }

    fn orchestrator(
        source: MemorySource,
        store: Arc<MemoryDocumentStore>,
        migration: MigrationConfig,
    ) -> Orchestrator {
        Orchestrator::new(
            Arc::new(source),
            vec![Arc::new(DocumentSink::new(store))],
            migration,
        )
    }

    #[test]
    fn test_filter_tables() {
        let tables = vec!["users".into(), "orders".into(), "tmp_x".into()];
        let out = filter_tables(tables.clone(), &[], &["tmp_*".into()]).unwrap();
        assert_eq!(out, vec!["users", "orders"]);

        let out = filter_tables(tables.clone(), &["o*".into(), "u*".into()], &[]).unwrap();
        assert_eq!(out, vec!["users", "orders"]);

        assert!(filter_tables(tables, &["[".into()], &[]).is_err());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_written_count() {
        let source = MemorySource::new().with_rows(
            "items",
            columns(),
            vec![
                MemoryRow::Row(row(1)),
                MemoryRow::Row(row(2)),
                MemoryRow::Fail("lost connection".into()),
            ],
        );
        let store = Arc::new(MemoryDocumentStore::new());
        let result = orchestrator(source, store.clone(), MigrationConfig::default())
            .run()
            .await
            .unwrap();

        let outcome = &result.destinations[0].outcomes[0];
        assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
        assert_eq!(outcome.records_written, 2);
        assert_eq!(store.documents("items").len(), 2);
        assert_eq!(result.status, "completed_with_errors");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_writes_nothing_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_rows(
            "items",
            columns(),
            vec![
                MemoryRow::Row(row(1)),
                MemoryRow::Row(row(2)),
                MemoryRow::Fail("lost connection".into()),
            ],
        );
        let result = Orchestrator::new(
            Arc::new(source),
            vec![Arc::new(FileSink::new(dir.path()))],
            MigrationConfig::default(),
        )
        .run()
        .await
        .unwrap();

        let outcome = &result.destinations[0].outcomes[0];
        assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
        assert_eq!(outcome.records_written, 0);
        assert_eq!(result.records_written, 0);
        assert!(!dir.path().join("items.json").exists());
    }

    #[tokio::test]
    async fn test_arity_mismatch_fails_table() {
        let source = MemorySource::new().with_table(
            "items",
            columns(),
            vec![row(1), vec![SourceValue::Int(2)]],
        );
        let store = Arc::new(MemoryDocumentStore::new());
        let result = orchestrator(source, store, MigrationConfig::default())
            .run()
            .await
            .unwrap();

        let outcome = &result.destinations[0].outcomes[0];
        match &outcome.status {
            OutcomeStatus::Failed { reason } => assert!(reason.contains("1 values")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_failure_is_fatal() {
        let source = MemorySource::new().failing_list("access denied");
        let store = Arc::new(MemoryDocumentStore::new());
        let err = orchestrator(source, store, MigrationConfig::default())
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = MemorySource::new().with_table("items", columns(), vec![row(1)]);
        let store = Arc::new(MemoryDocumentStore::new());
        let orch = orchestrator(source, store.clone(), MigrationConfig::default());
        orch.cancel_token().cancel();

        let result = orch.run().await.unwrap();
        assert_eq!(result.status, "cancelled");
        assert!(result.destinations.is_empty());
        assert!(store.documents("items").is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_in_source_order_with_workers() {
        let mut source = MemorySource::new();
        for name in ["a", "b", "c", "d", "e"] {
            source = source.with_table(name, columns(), (1..=20).map(row).collect());
        }
        let store = Arc::new(MemoryDocumentStore::new());
        let migration = MigrationConfig {
            table_workers: 3,
            ..Default::default()
        };
        let result = orchestrator(source, store.clone(), migration)
            .run()
            .await
            .unwrap();

        let order: Vec<_> = result.destinations[0]
            .outcomes
            .iter()
            .map(|o| o.table.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d", "e"]);
        for name in ["a", "b", "c", "d", "e"] {
            let ids: Vec<_> = store
                .documents(name)
                .iter()
                .map(|d| d.values()[0].clone())
                .collect();
            let expected: Vec<_> = (1..=20).map(crate::core::Scalar::Integer).collect();
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test]
    async fn test_result_json_shape() {
        let source = MemorySource::new().with_table("items", columns(), vec![row(1)]);
        let store = Arc::new(MemoryDocumentStore::new());
        let result = orchestrator(source, store, MigrationConfig::default())
            .run()
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["records_written"], 1);
        let outcome = &json["destinations"][0]["outcomes"][0];
        assert_eq!(outcome["destination"], "document");
        assert_eq!(outcome["status"], "succeeded");
    }

    #[tokio::test]
    async fn test_health_check() {
        let source = MemorySource::new();
        let store = Arc::new(MemoryDocumentStore::new());
        let checks = orchestrator(source, store, MigrationConfig::default())
            .health_check()
            .await;
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| c.ok));
        assert_eq!(checks[1].component, "document");
    }
}
