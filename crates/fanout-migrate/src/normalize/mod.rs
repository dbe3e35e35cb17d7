//! Record normalization.
//!
//! Converts raw source values into destination-neutral scalars. This is the
//! only place text is canonicalized; every sink can assume a [`Record`] holds
//! valid UTF-8 text, ISO-8601 dates and plain numbers.
//!
//! Rules:
//! - Dates: `YYYY-MM-DD`
//! - Times: `HH:MM:SS[.fraction]`
//! - Timestamps: `YYYY-MM-DDTHH:MM:SS[.fraction]`, offsets as RFC 3339
//! - Decimals: `f64` (lossy)
//! - Bytes: UTF-8 text when valid, standard base64 otherwise
//! - Unsigned integers above `i64::MAX`: decimal text

use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use rust_decimal::prelude::ToPrimitive;

use crate::core::{ColumnDescriptor, RawRow, Record, Scalar, SourceValue};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Shared, ordered column names of one table.
pub fn column_names(columns: &[ColumnDescriptor]) -> Arc<[String]> {
    columns.iter().map(|c| c.name.clone()).collect()
}

/// Normalize one raw row into a record.
///
/// `names` must come from [`column_names`] for the same table and `row` must
/// be positionally aligned with it; the caller checks arity.
pub fn normalize(names: &Arc<[String]>, row: RawRow) -> Record {
    let values = row.into_iter().map(normalize_value).collect();
    Record::new(Arc::clone(names), values)
}

/// Normalize a single value.
pub fn normalize_value(value: SourceValue) -> Scalar {
    match value {
        SourceValue::Null => Scalar::Null,
        SourceValue::Bool(v) => Scalar::Bool(v),
        SourceValue::Int(v) => Scalar::Integer(v),
        SourceValue::UInt(v) => match i64::try_from(v) {
            Ok(v) => Scalar::Integer(v),
            Err(_) => Scalar::Text(v.to_string()),
        },
        SourceValue::Float(v) => Scalar::Float(v),
        SourceValue::Decimal(d) => match d.to_f64() {
            Some(v) => Scalar::Float(v),
            None => Scalar::Text(d.to_string()),
        },
        SourceValue::Text(s) => Scalar::Text(s),
        SourceValue::Bytes(b) => Scalar::Text(canonical_text(b)),
        SourceValue::Date(d) => Scalar::Text(d.format(DATE_FORMAT).to_string()),
        SourceValue::Time(t) => Scalar::Text(t.format(TIME_FORMAT).to_string()),
        SourceValue::DateTime(dt) => Scalar::Text(dt.format(DATETIME_FORMAT).to_string()),
        SourceValue::DateTimeOffset(dt) => Scalar::Text(dt.to_rfc3339()),
        SourceValue::Opaque(s) => Scalar::Text(s),
    }
}

/// Decode character data delivered as bytes.
fn canonical_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => BASE64_STANDARD.encode(e.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceTypeCode;
    use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let Scalar::Text(text) = normalize_value(SourceValue::Date(date)) else {
            panic!("date should normalize to text");
        };
        assert_eq!(text, "2024-01-05");
        assert_eq!(NaiveDate::from_str(&text).unwrap(), date);
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 58, 250)
            .unwrap();
        let Scalar::Text(text) = normalize_value(SourceValue::DateTime(dt)) else {
            panic!("datetime should normalize to text");
        };
        assert_eq!(text, "2023-12-31T23:59:58.250");
        assert_eq!(text.parse::<NaiveDateTime>().unwrap(), dt);
    }

    #[test]
    fn test_datetime_without_fraction() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            normalize_value(SourceValue::DateTime(dt)),
            Scalar::Text("2024-01-05T08:30:00".into())
        );
    }

    #[test]
    fn test_time_and_offset() {
        let t = NaiveTime::from_hms_opt(7, 5, 3).unwrap();
        assert_eq!(
            normalize_value(SourceValue::Time(t)),
            Scalar::Text("07:05:03".into())
        );

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = offset.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            normalize_value(SourceValue::DateTimeOffset(dt)),
            Scalar::Text("2024-03-01T12:00:00+02:00".into())
        );
    }

    #[test]
    fn test_decimal_becomes_float() {
        let d = Decimal::from_str("2.50").unwrap();
        assert_eq!(normalize_value(SourceValue::Decimal(d)), Scalar::Float(2.5));
    }

    #[test]
    fn test_bytes_become_canonical_text() {
        assert_eq!(
            normalize_value(SourceValue::Bytes("Peñalolén".as_bytes().to_vec())),
            Scalar::Text("Peñalolén".into())
        );
        assert_eq!(
            normalize_value(SourceValue::Bytes(vec![0xff, 0x00, 0x10])),
            Scalar::Text("/wAQ".into())
        );
    }

    #[test]
    fn test_unsigned_overflow_is_text() {
        assert_eq!(normalize_value(SourceValue::UInt(7)), Scalar::Integer(7));
        assert_eq!(
            normalize_value(SourceValue::UInt(u64::MAX)),
            Scalar::Text("18446744073709551615".into())
        );
    }

    #[test]
    fn test_pass_through_kinds() {
        assert_eq!(normalize_value(SourceValue::Null), Scalar::Null);
        assert_eq!(normalize_value(SourceValue::Bool(true)), Scalar::Bool(true));
        assert_eq!(normalize_value(SourceValue::Int(-3)), Scalar::Integer(-3));
        assert_eq!(normalize_value(SourceValue::Float(0.5)), Scalar::Float(0.5));
        assert_eq!(
            normalize_value(SourceValue::Opaque("POINT(1 2)".into())),
            Scalar::Text("POINT(1 2)".into())
        );
    }

    #[test]
    fn test_normalize_keeps_column_order() {
        let columns = vec![
            ColumnDescriptor::new("nid_user", SourceTypeCode::Long),
            ColumnDescriptor::new("name", SourceTypeCode::VarString),
            ColumnDescriptor::new("signup", SourceTypeCode::Date),
        ];
        let names = column_names(&columns);
        let record = normalize(
            &names,
            vec![
                SourceValue::Int(1),
                SourceValue::Text("Ana".into()),
                SourceValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            ],
        );

        assert_eq!(record.columns(), &["nid_user", "name", "signup"]);
        assert_eq!(record.get("signup"), Some(&Scalar::Text("2024-01-05".into())));
    }
}
