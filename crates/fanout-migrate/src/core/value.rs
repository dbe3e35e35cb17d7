//! Value types flowing through the pipeline.
//!
//! - [`SourceValue`]: a raw value as decoded from a source row
//! - [`Scalar`]: a destination-neutral value after normalization
//! - [`Record`]: one normalized row, keyed by column name in source order
//! - [`CqlValue`]: a value bound to a column-family insert parameter

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A raw value decoded from the source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer of any width.
    Int(i64),

    /// Unsigned integer of any width.
    UInt(u64),

    /// Binary floating point (float widened to double).
    Float(f64),

    /// Arbitrary-precision decimal.
    Decimal(Decimal),

    /// Character data.
    Text(String),

    /// Binary or undecoded character data.
    Bytes(Vec<u8>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// A value of a type the reader does not model, in its textual form.
    Opaque(String),
}

impl From<i64> for SourceValue {
    fn from(v: i64) -> Self {
        SourceValue::Int(v)
    }
}

impl From<i32> for SourceValue {
    fn from(v: i32) -> Self {
        SourceValue::Int(v as i64)
    }
}

impl From<f64> for SourceValue {
    fn from(v: f64) -> Self {
        SourceValue::Float(v)
    }
}

impl From<bool> for SourceValue {
    fn from(v: bool) -> Self {
        SourceValue::Bool(v)
    }
}

impl From<&str> for SourceValue {
    fn from(v: &str) -> Self {
        SourceValue::Text(v.to_string())
    }
}

impl From<String> for SourceValue {
    fn from(v: String) -> Self {
        SourceValue::Text(v)
    }
}

impl From<Decimal> for SourceValue {
    fn from(v: Decimal) -> Self {
        SourceValue::Decimal(v)
    }
}

impl From<NaiveDate> for SourceValue {
    fn from(v: NaiveDate) -> Self {
        SourceValue::Date(v)
    }
}

impl From<NaiveDateTime> for SourceValue {
    fn from(v: NaiveDateTime) -> Self {
        SourceValue::DateTime(v)
    }
}

impl From<Vec<u8>> for SourceValue {
    fn from(v: Vec<u8>) -> Self {
        SourceValue::Bytes(v)
    }
}

/// One raw source row, positionally aligned with the table's columns.
pub type RawRow = Vec<SourceValue>;

/// A destination-neutral scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Short name of the scalar kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(v) => serializer.serialize_bool(*v),
            Scalar::Integer(v) => serializer.serialize_i64(*v),
            Scalar::Float(v) => serializer.serialize_f64(*v),
            Scalar::Text(v) => serializer.serialize_str(v),
        }
    }
}

/// One normalized row.
///
/// The column names are shared by every record of a table, so the column
/// order of a record is the table's column order by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Scalar>,
}

impl Record {
    /// Build a record. `values` must be positionally aligned with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Scalar>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Value of a named column.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A value bound to a column-family insert parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Null,
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
}
