//! Type inference: per-value classification and per-column resolution.
//!
//! The first pass over a file runs every field through [`classify`] and ORs
//! the results into one [`Capability`] mask per column. [`resolve`] then maps
//! each mask to a single [`ColumnType`] using an explicit precedence list,
//! most permissive first. The mask array is threaded through the scan and
//! returned, never shared.

use std::{
    fmt,
    io::Read,
    ops::{BitOr, BitOrAssign},
};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::{
    data, io_utils,
    schema::{ColumnType, SHORT_TEXT_MAX},
};

/// Bit set of the type capabilities observed in a column.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Capability(u8);

impl Capability {
    pub const NONE: Capability = Capability(0);
    pub const LONG_TEXT: Capability = Capability(1);
    pub const TEXT: Capability = Capability(1 << 1);
    pub const FLOAT: Capability = Capability(1 << 2);
    pub const INTEGER: Capability = Capability(1 << 3);
    pub const DATE: Capability = Capability(1 << 4);
    pub const BOOLEAN: Capability = Capability(1 << 5);
    /// The `M/d/yy` shape the general date grammar would mis-read; named so
    /// the second pass can be driven down the explicit parse path.
    pub const AMBIGUOUS_DATE: Capability = Capability(1 << 6);

    pub fn contains(self, other: Capability) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capability {
    type Output = Capability;

    fn bitor(self, rhs: Capability) -> Capability {
        Capability(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capability {
    fn bitor_assign(&mut self, rhs: Capability) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({:#09b})", self.0)
    }
}

/// A column whose capability mask stayed empty across the whole scan: every
/// value was blank, so no type can be determined. Never silently defaulted.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot infer a type for column '{column}': no non-empty values observed")]
pub struct SchemaInferenceError {
    pub column: String,
}

/// Classifies one field into a single capability by first-match precedence.
///
/// The ordering is deliberate: the length check runs before the numeric and
/// date checks so oversized fields are never typed numeric, the boolean check
/// runs before date parsing, and the ambiguous short-date shape is tested
/// before the general grammar gets a chance to accept the same string with
/// month and day transposed.
pub fn classify(value: &str) -> Capability {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Capability::NONE;
    }
    // The raw field is what a text column stores, so the raw length decides
    // whether VARCHAR(256) can hold it. Byte length is an upper bound on the
    // char count.
    if value.len() > SHORT_TEXT_MAX && value.chars().count() > SHORT_TEXT_MAX {
        return Capability::LONG_TEXT;
    }
    if trimmed.parse::<i64>().is_ok() {
        return Capability::INTEGER;
    }
    if trimmed.parse::<f64>().is_ok() {
        return Capability::FLOAT;
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return Capability::BOOLEAN;
    }
    if data::is_ambiguous_short_date(trimmed) {
        return Capability::DATE | Capability::AMBIGUOUS_DATE;
    }
    if data::parse_general_date(trimmed).is_some() {
        return Capability::DATE;
    }
    Capability::TEXT
}

/// Precedence order for mask resolution, most permissive first: any text
/// observation forces a text column, any float observation forces integers
/// up to float, and so on down the list.
const PRECEDENCE: &[(Capability, ColumnType)] = &[
    (Capability::LONG_TEXT, ColumnType::LongText),
    (Capability::TEXT, ColumnType::Text),
    (Capability::FLOAT, ColumnType::Float),
    (Capability::INTEGER, ColumnType::Integer),
    (Capability::DATE, ColumnType::Date),
    (Capability::BOOLEAN, ColumnType::Boolean),
];

pub fn resolve(column: &str, mask: Capability) -> Result<ColumnType, SchemaInferenceError> {
    PRECEDENCE
        .iter()
        .find(|(cap, _)| mask.contains(*cap))
        .map(|(_, ty)| *ty)
        .ok_or_else(|| SchemaInferenceError {
            column: column.to_string(),
        })
}

/// Header names and accumulated per-column masks from one full first pass.
#[derive(Debug)]
pub struct TableScan {
    pub headers: Vec<String>,
    pub masks: Vec<Capability>,
    pub rows: u64,
}

impl TableScan {
    pub fn resolve_columns(&self) -> Result<Vec<ColumnType>, SchemaInferenceError> {
        self.headers
            .iter()
            .zip(&self.masks)
            .map(|(name, mask)| resolve(name, *mask))
            .collect()
    }
}

/// Full first pass: reads every record and folds each field's classification
/// into its column's mask. Ragged rows surface as tokenizer errors.
pub fn scan<R: Read>(reader: &mut csv::Reader<R>) -> Result<TableScan> {
    let headers = io_utils::reader_headers(reader)?;
    let mut masks = vec![Capability::NONE; headers.len()];
    let mut rows = 0u64;

    let mut record = csv::StringRecord::new();
    while reader
        .read_record(&mut record)
        .with_context(|| format!("Reading CSV record {}", rows + 1))?
    {
        rows += 1;
        for (idx, field) in record.iter().enumerate() {
            masks[idx] |= classify(field);
        }
    }

    Ok(TableScan {
        headers,
        masks,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_contribute_nothing() {
        assert_eq!(classify(""), Capability::NONE);
        assert_eq!(classify("   "), Capability::NONE);
        assert_eq!(classify("\t"), Capability::NONE);
    }

    #[test]
    fn oversized_values_classify_long_text_before_anything_else() {
        let long_number = "9".repeat(SHORT_TEXT_MAX + 1);
        assert_eq!(classify(&long_number), Capability::LONG_TEXT);
        let at_limit = "9".repeat(SHORT_TEXT_MAX);
        assert_eq!(classify(&at_limit), Capability::FLOAT);
    }

    #[test]
    fn numeric_classification_is_exclusive_per_value() {
        assert_eq!(classify("5"), Capability::INTEGER);
        assert_eq!(classify("-17"), Capability::INTEGER);
        assert_eq!(classify("5.5"), Capability::FLOAT);
        assert_eq!(classify("1e3"), Capability::FLOAT);
        assert_eq!(classify("1,234"), Capability::TEXT);
    }

    #[test]
    fn booleans_classify_before_dates() {
        assert_eq!(classify("true"), Capability::BOOLEAN);
        assert_eq!(classify("FALSE"), Capability::BOOLEAN);
    }

    #[test]
    fn dates_classify_with_ambiguity_flag() {
        assert_eq!(classify("2021-01-05"), Capability::DATE);
        assert_eq!(classify("1/5/2021"), Capability::DATE);
        assert_eq!(
            classify("3/4/05"),
            Capability::DATE | Capability::AMBIGUOUS_DATE
        );
        assert_eq!(classify("hello"), Capability::TEXT);
    }

    #[test]
    fn text_dominates_integers() {
        let mask = classify("5") | classify("abc");
        assert_eq!(resolve("col", mask).unwrap(), ColumnType::Text);
    }

    #[test]
    fn floats_dominate_integers() {
        let mask = classify("5") | classify("5.5");
        assert_eq!(resolve("col", mask).unwrap(), ColumnType::Float);
    }

    #[test]
    fn pure_columns_resolve_to_their_own_type() {
        assert_eq!(
            resolve("col", Capability::INTEGER).unwrap(),
            ColumnType::Integer
        );
        assert_eq!(
            resolve("col", Capability::DATE | Capability::AMBIGUOUS_DATE).unwrap(),
            ColumnType::Date
        );
        assert_eq!(
            resolve("col", Capability::BOOLEAN).unwrap(),
            ColumnType::Boolean
        );
    }

    #[test]
    fn empty_mask_is_a_named_error() {
        let err = resolve("notes", Capability::NONE).unwrap_err();
        assert_eq!(err.column, "notes");
        assert!(err.to_string().contains("notes"));
    }

    #[test]
    fn scan_accumulates_masks_per_column() {
        let input = "id,amount,comment\n1,2.5,\n2,,ok\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input.as_bytes());
        let scan = scan(&mut reader).unwrap();
        assert_eq!(scan.rows, 2);
        assert_eq!(scan.headers, vec!["id", "amount", "comment"]);
        let types = scan.resolve_columns().unwrap();
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Text]
        );
    }

    #[test]
    fn scan_surfaces_all_blank_columns() {
        let input = "id,empty\n1,\n2,\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input.as_bytes());
        let scan = scan(&mut reader).unwrap();
        let err = scan.resolve_columns().unwrap_err();
        assert_eq!(err.column, "empty");
    }
}
