//! Column metadata and destination schema types.
//!
//! [`ColumnDescriptor`] describes a source column in source order. Column order
//! is significant everywhere: rows are decoded positionally, records keep the
//! same order, and column-family inserts bind parameters in that order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native column type code reported by the source.
///
/// The numeric values are the MySQL wire protocol field types, the stable
/// enumeration exposed by the source. Codes outside the known set decode to
/// [`SourceTypeCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTypeCode {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    LongLong,
    Int24,
    Date,
    Time,
    DateTime,
    Year,
    NewDate,
    VarChar,
    Bit,
    Json,
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
    Unknown,
}

impl SourceTypeCode {
    /// Decode a numeric protocol type code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Decimal,
            1 => Self::Tiny,
            2 => Self::Short,
            3 => Self::Long,
            4 => Self::Float,
            5 => Self::Double,
            6 => Self::Null,
            7 => Self::Timestamp,
            8 => Self::LongLong,
            9 => Self::Int24,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::DateTime,
            13 => Self::Year,
            14 => Self::NewDate,
            15 => Self::VarChar,
            16 => Self::Bit,
            245 => Self::Json,
            246 => Self::NewDecimal,
            247 => Self::Enum,
            248 => Self::Set,
            249 => Self::TinyBlob,
            250 => Self::MediumBlob,
            251 => Self::LongBlob,
            252 => Self::Blob,
            253 => Self::VarString,
            254 => Self::String,
            255 => Self::Geometry,
            _ => Self::Unknown,
        }
    }

    /// The numeric protocol type code, if this is a known code.
    pub fn code(self) -> Option<u8> {
        let code = match self {
            Self::Decimal => 0,
            Self::Tiny => 1,
            Self::Short => 2,
            Self::Long => 3,
            Self::Float => 4,
            Self::Double => 5,
            Self::Null => 6,
            Self::Timestamp => 7,
            Self::LongLong => 8,
            Self::Int24 => 9,
            Self::Date => 10,
            Self::Time => 11,
            Self::DateTime => 12,
            Self::Year => 13,
            Self::NewDate => 14,
            Self::VarChar => 15,
            Self::Bit => 16,
            Self::Json => 245,
            Self::NewDecimal => 246,
            Self::Enum => 247,
            Self::Set => 248,
            Self::TinyBlob => 249,
            Self::MediumBlob => 250,
            Self::LongBlob => 251,
            Self::Blob => 252,
            Self::VarString => 253,
            Self::String => 254,
            Self::Geometry => 255,
            Self::Unknown => return None,
        };
        Some(code)
    }

    /// Resolve an `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE` name to the type code
    /// the server reports for that column on the wire.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type.to_lowercase().as_str() {
            "tinyint" | "bool" | "boolean" => Self::Tiny,
            "smallint" => Self::Short,
            "int" | "integer" => Self::Long,
            "mediumint" => Self::Int24,
            "bigint" => Self::LongLong,
            "float" => Self::Float,
            "double" | "real" | "double precision" => Self::Double,
            "decimal" | "numeric" | "dec" | "fixed" => Self::NewDecimal,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "year" => Self::Year,
            "varchar" | "varbinary" => Self::VarString,
            "char" | "binary" | "enum" | "set" => Self::String,
            "tinytext" | "tinyblob" => Self::TinyBlob,
            "mediumtext" | "mediumblob" => Self::MediumBlob,
            "longtext" | "longblob" => Self::LongBlob,
            "text" | "blob" => Self::Blob,
            "bit" => Self::Bit,
            "json" => Self::Json,
            "geometry" | "point" | "linestring" | "polygon" | "multipoint"
            | "multilinestring" | "multipolygon" | "geometrycollection" => Self::Geometry,
            _ => Self::Unknown,
        }
    }

    /// Whether values of this type are whole numbers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Tiny | Self::Short | Self::Long | Self::Int24 | Self::LongLong | Self::Year
        )
    }

    /// Whether values of this type are binary floating point.
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

/// A source column: name and native type code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Native type code.
    pub type_code: SourceTypeCode,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_code: SourceTypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
        }
    }
}

/// Column types of the column-family store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CqlType {
    Int,
    BigInt,
    Float,
    Double,
    Text,
}

impl CqlType {
    /// CQL keyword for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            CqlType::Int => "int",
            CqlType::BigInt => "bigint",
            CqlType::Float => "float",
            CqlType::Double => "double",
            CqlType::Text => "text",
        }
    }
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination table definition for the column-family store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSchema {
    /// Destination table name (same as the source table).
    pub table_name: String,

    /// Columns in source order.
    pub columns: Vec<(String, CqlType)>,

    /// Inferred primary key column, if any.
    pub primary_key: Option<String>,
}

impl DestinationSchema {
    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Whether a primary key was inferred.
    pub fn has_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    /// Destination type of a column.
    pub fn column_type(&self, name: &str) -> Option<CqlType> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, ty)| *ty)
    }
}

/// A positional parameterized insert for one destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Destination table name.
    pub table: String,

    /// Bound columns, in parameter order.
    pub columns: Vec<String>,

    /// Rendered CQL text with `?` placeholders.
    pub cql: String,
}
