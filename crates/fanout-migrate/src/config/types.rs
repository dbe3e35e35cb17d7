//! Configuration types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Destination;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MySQL).
    pub source: SourceConfig,

    /// JSON file destination. Absent means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSinkConfig>,

    /// Document store destination. Absent means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentConfig>,

    /// Column-family store destination. Absent means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_family: Option<ColumnFamilyConfig>,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Whether a destination has a configuration block.
    pub fn is_configured(&self, destination: Destination) -> bool {
        match destination {
            Destination::File => self.file.is_some(),
            Destination::Document => self.document.is_some(),
            Destination::ColumnFamily => self.column_family.is_some(),
        }
    }

    /// Destinations to run, in processing order.
    ///
    /// Listed destinations without a configuration block are skipped.
    pub fn enabled_destinations(&self) -> Vec<Destination> {
        let mut out = Vec::new();
        for dest in &self.migration.destinations {
            if self.is_configured(*dest) && !out.contains(dest) {
                out.push(*dest);
            }
        }
        out
    }
}

/// Source database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database type (always "mysql" for now).
    #[serde(default = "default_mysql")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// JSON file destination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Directory receiving one `<table>.json` per table (default: ".").
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Indentation width of the JSON artifacts (default: 4).
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            indent: default_indent(),
        }
    }
}

/// Document store (MongoDB) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Store host.
    pub host: String,

    /// Store port (default: 27017).
    #[serde(default = "default_mongo_port")]
    pub port: u16,

    /// Database receiving one collection per table.
    pub database: String,
}

impl DocumentConfig {
    /// Connection URI for the document store driver.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

/// Column-family store (Cassandra/Scylla) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ColumnFamilyConfig {
    /// Contact points, `host`, `host:port` or an IPv6 literal.
    pub hosts: Vec<String>,

    /// Port used for contact points without one (default: 9042).
    #[serde(default = "default_cql_port")]
    pub port: u16,

    /// Keyspace receiving one table per source table.
    pub keyspace: String,

    /// Username for password authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for password authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Fail tables without an inferable primary key instead of sending a
    /// keyless schema to the store (default: true).
    #[serde(default = "default_true")]
    pub require_primary_key: bool,
}

impl ColumnFamilyConfig {
    /// Contact points with the default port applied.
    ///
    /// Accepts `host`, `host:port`, bare IPv6 literals and `[v6]:port`.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(|h| self.with_port(h))
            .collect()
    }

    fn with_port(&self, host: &str) -> String {
        if let Some(rest) = host.strip_prefix('[') {
            if rest.contains("]:") {
                return host.to_string();
            }
            return format!("{}:{}", host, self.port);
        }

        match host.matches(':').count() {
            0 => format!("{}:{}", host, self.port),
            1 => host.to_string(),
            // Bare IPv6 literal
            _ => format!("[{}]:{}", host, self.port),
        }
    }
}

impl fmt::Debug for ColumnFamilyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnFamilyConfig")
            .field("hosts", &self.hosts)
            .field("port", &self.port)
            .field("keyspace", &self.keyspace)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("require_primary_key", &self.require_primary_key)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Tables migrated concurrently within one destination (default: 1).
    #[serde(default = "default_table_workers")]
    pub table_workers: usize,

    /// Glob patterns of tables to migrate. Empty means all tables.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Glob patterns of tables to skip.
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Destination processing order.
    #[serde(default = "default_destinations")]
    pub destinations: Vec<Destination>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table_workers: default_table_workers(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            destinations: default_destinations(),
        }
    }
}

fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mongo_port() -> u16 {
    27017
}

fn default_cql_port() -> u16 {
    9042
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_indent() -> usize {
    4
}

fn default_table_workers() -> usize {
    1
}

fn default_destinations() -> Vec<Destination> {
    Destination::ALL.to_vec()
}

fn default_true() -> bool {
    true
}
