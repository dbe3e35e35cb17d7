//! Destination schema synthesis for the column-family store.
//!
//! The source exposes no key metadata through the row cursor, so the primary
//! key is inferred by naming convention: the first column (in source order)
//! whose name starts with [`KEY_PREFIX`].

use crate::core::{ColumnDescriptor, DestinationSchema, InsertStatement};
use crate::typemap::map_type;

/// Reserved column-name prefix marking key columns.
pub const KEY_PREFIX: &str = "nid_";

/// Pick the primary key column: first match in source order.
pub fn infer_primary_key(columns: &[ColumnDescriptor]) -> Option<&str> {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .find(|name| name.starts_with(KEY_PREFIX))
}

/// Build the destination schema for a table.
pub fn synthesize_schema(table: &str, columns: &[ColumnDescriptor]) -> DestinationSchema {
    DestinationSchema {
        table_name: table.to_string(),
        columns: columns
            .iter()
            .map(|c| (c.name.clone(), map_type(c.type_code)))
            .collect(),
        primary_key: infer_primary_key(columns).map(str::to_string),
    }
}

/// Quote a CQL identifier when it would not survive unquoted.
///
/// Unquoted CQL identifiers are case-folded, so anything that is not already
/// lowercase `[a-z_][a-z0-9_]*` is double-quoted.
pub fn quote_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

impl DestinationSchema {
    /// Render the idempotent `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_statement(&self) -> String {
        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
            .collect();

        if let Some(ref pk) = self.primary_key {
            clauses.push(format!("PRIMARY KEY ({})", quote_ident(pk)));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.table_name),
            clauses.join(", ")
        )
    }

    /// Build the positional insert for this schema, binding columns in
    /// schema order.
    pub fn insert_statement(&self) -> InsertStatement {
        let columns = self.column_names();
        let cql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table_name),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        InsertStatement {
            table: self.table_name.clone(),
            columns,
            cql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CqlType, SourceTypeCode};

    fn cols(names: &[(&str, SourceTypeCode)]) -> Vec<ColumnDescriptor> {
        names
            .iter()
            .map(|(n, t)| ColumnDescriptor::new(*n, *t))
            .collect()
    }

    #[test]
    fn test_first_prefixed_column_is_key() {
        let columns = cols(&[
            ("id_x", SourceTypeCode::Long),
            ("name", SourceTypeCode::VarString),
            ("nid_user", SourceTypeCode::Long),
            ("nid_order", SourceTypeCode::Long),
        ]);
        assert_eq!(infer_primary_key(&columns), Some("nid_user"));

        let schema = synthesize_schema("t", &columns);
        assert_eq!(schema.primary_key.as_deref(), Some("nid_user"));
    }

    #[test]
    fn test_no_prefixed_column_means_no_key() {
        let columns = cols(&[
            ("id", SourceTypeCode::Long),
            ("user_nid_", SourceTypeCode::VarString),
        ]);
        let schema = synthesize_schema("t", &columns);
        assert!(schema.primary_key.is_none());
        assert_eq!(
            schema.create_statement(),
            "CREATE TABLE IF NOT EXISTS t (id int, user_nid_ text)"
        );
    }

    #[test]
    fn test_users_schema() {
        let columns = cols(&[
            ("nid_user", SourceTypeCode::Long),
            ("name", SourceTypeCode::VarString),
            ("signup", SourceTypeCode::Date),
        ]);
        let schema = synthesize_schema("users", &columns);

        assert_eq!(
            schema.columns,
            vec![
                ("nid_user".to_string(), CqlType::Int),
                ("name".to_string(), CqlType::Text),
                ("signup".to_string(), CqlType::Text),
            ]
        );
        assert_eq!(
            schema.create_statement(),
            "CREATE TABLE IF NOT EXISTS users (nid_user int, name text, signup text, PRIMARY KEY (nid_user))"
        );
    }

    #[test]
    fn test_insert_statement_binds_in_schema_order() {
        let columns = cols(&[
            ("nid_user", SourceTypeCode::Long),
            ("name", SourceTypeCode::VarString),
        ]);
        let insert = synthesize_schema("users", &columns).insert_statement();
        assert_eq!(insert.columns, vec!["nid_user", "name"]);
        assert_eq!(insert.cql, "INSERT INTO users (nid_user, name) VALUES (?, ?)");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "name");
        assert_eq!(quote_ident("_x1"), "_x1");
        assert_eq!(quote_ident("FirstName"), "\"FirstName\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
