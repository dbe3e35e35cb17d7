//! Type mapping from source type codes to column-family types.

use crate::core::{CqlType, SourceTypeCode};

/// Map a source column type code to the column-family type vocabulary.
pub fn map_type(code: SourceTypeCode) -> CqlType {
    match code {
        // Integer types
        SourceTypeCode::Tiny
        | SourceTypeCode::Short
        | SourceTypeCode::Long
        | SourceTypeCode::Int24
        | SourceTypeCode::Year => CqlType::Int,
        SourceTypeCode::LongLong => CqlType::BigInt,

        // Floating point
        SourceTypeCode::Float => CqlType::Float,
        SourceTypeCode::Double => CqlType::Double,

        // Everything else, including all character and unknown types
        _ => CqlType::Text,
    }
}
