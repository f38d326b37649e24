//! Typed wire values and text-to-binary field conversion.
//!
//! The second pass over a file runs every field through [`encode_field`],
//! which parses the text under the column's resolved type and yields a
//! [`WireValue`] ready for the binary COPY channel. Date text has two parse
//! paths: the ambiguous `M/d/yy` shape is decoded explicitly as
//! month/day/two-digit-year, everything else goes through the general format
//! table. The general grammar would silently accept the short form with month
//! and day transposed, so the shape check must run first.

use bytes::BytesMut;
use chrono::NaiveDate;
use postgres_types::{IsNull, ToSql, Type, to_sql_checked};
use thiserror::Error;

use crate::schema::ColumnType;

const GENERAL_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y"];
const AMBIGUOUS_DATE_FORMAT: &str = "%m/%d/%y";
/// Shortest value the ambiguous shape can take ("1/1/00").
const AMBIGUOUS_DATE_MIN_LEN: usize = 6;

/// A second-pass value failed to parse under the column's resolved type.
/// Inference fixed the type before any conversion started, so this means the
/// file changed between passes or the classifier accepted the value wrongly.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot convert '{value}' to {expected}")]
pub struct ConversionError {
    pub value: String,
    pub expected: &'static str,
}

/// One field in binary COPY form.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Text(String),
    Float(f64),
    Integer(i64),
    Date(NaiveDate),
    Boolean(bool),
    Null,
}

impl ToSql for WireValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            WireValue::Text(v) => v.to_sql(ty, out),
            WireValue::Float(v) => v.to_sql(ty, out),
            WireValue::Integer(v) => v.to_sql(ty, out),
            WireValue::Date(v) => v.to_sql(ty, out),
            WireValue::Boolean(v) => v.to_sql(ty, out),
            WireValue::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::FLOAT8
            || *ty == Type::INT8
            || *ty == Type::DATE
            || *ty == Type::BOOL
    }

    to_sql_checked!();
}

/// Wire type descriptor the COPY writer needs for each column.
pub fn wire_type(ty: ColumnType) -> Type {
    match ty {
        ColumnType::LongText => Type::TEXT,
        ColumnType::Text => Type::VARCHAR,
        ColumnType::Float => Type::FLOAT8,
        ColumnType::Integer => Type::INT8,
        ColumnType::Date => Type::DATE,
        ColumnType::Boolean => Type::BOOL,
    }
}

/// `M/d/yy`-shaped text: exactly two `/` separators, every other byte an
/// ASCII digit, and a `/` leaving a two-digit year. The length guard keeps
/// the fixed-offset check in bounds.
pub fn is_ambiguous_short_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() < AMBIGUOUS_DATE_MIN_LEN {
        return false;
    }
    let mut slashes = 0usize;
    for &b in bytes {
        match b {
            b'/' => slashes += 1,
            b'0'..=b'9' => {}
            _ => return false,
        }
    }
    slashes == 2 && bytes[bytes.len() - 3] == b'/'
}

pub fn parse_general_date(value: &str) -> Option<NaiveDate> {
    GENERAL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if is_ambiguous_short_date(value) {
        NaiveDate::parse_from_str(value, AMBIGUOUS_DATE_FORMAT).ok()
    } else {
        parse_general_date(value)
    }
}

/// Converts one text field into the wire form of its column's resolved type.
/// Blank and whitespace-only fields are null regardless of the type; text
/// columns pass the field through untrimmed.
pub fn encode_field(value: &str, ty: ColumnType) -> Result<WireValue, ConversionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(WireValue::Null);
    }
    let fail = || ConversionError {
        value: trimmed.to_string(),
        expected: ty.ddl(),
    };
    let encoded = match ty {
        ColumnType::LongText | ColumnType::Text => WireValue::Text(value.to_string()),
        ColumnType::Float => WireValue::Float(trimmed.parse().map_err(|_| fail())?),
        ColumnType::Integer => WireValue::Integer(trimmed.parse().map_err(|_| fail())?),
        ColumnType::Date => WireValue::Date(parse_date(trimmed).ok_or_else(fail)?),
        ColumnType::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                WireValue::Boolean(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                WireValue::Boolean(false)
            } else {
                return Err(fail());
            }
        }
    };
    Ok(encoded)
}
