//! Resolved column types and per-table statement synthesis.
//!
//! A [`RelationMeta`] is built once per file after the inference scan and is
//! immutable afterwards: the encoder relies on its column order matching the
//! header row position-for-position, and on the CREATE and COPY statements
//! naming columns in that same order.

use std::fmt;

/// Values longer than this many characters force a column out of
/// `VARCHAR(256)` into `TEXT`.
pub const SHORT_TEXT_MAX: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    LongText,
    Text,
    Float,
    Integer,
    Date,
    Boolean,
}

impl ColumnType {
    /// DDL spelling of the destination column kind.
    pub fn ddl(&self) -> &'static str {
        match self {
            ColumnType::LongText => "TEXT",
            ColumnType::Text => "VARCHAR(256)",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Integer => "BIGINT",
            ColumnType::Date => "DATE",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ddl())
    }
}

/// Everything the importer needs to recreate and repopulate one table.
#[derive(Debug, Clone)]
pub struct RelationMeta {
    pub table: String,
    pub columns: Vec<String>,
    pub types: Vec<ColumnType>,
    pub create_statement: String,
    pub copy_statement: String,
    pub drop_statement: String,
}

impl RelationMeta {
    pub fn new(table: String, columns: Vec<String>, types: Vec<ColumnType>) -> Self {
        debug_assert_eq!(columns.len(), types.len());
        let create_statement = create_statement(&table, &columns, &types);
        let copy_statement = copy_statement(&table, &columns);
        let drop_statement = drop_statement(&table);
        Self {
            table,
            columns,
            types,
            create_statement,
            copy_statement,
            drop_statement,
        }
    }
}

/// Doubles embedded quotes so arbitrary header text survives as an identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// First column named `id` (case-insensitively) becomes the primary key.
/// This is a naming convention, not something derived from the data.
pub fn primary_key_column(columns: &[String]) -> Option<usize> {
    columns.iter().position(|name| name.eq_ignore_ascii_case("id"))
}

fn create_statement(table: &str, columns: &[String], types: &[ColumnType]) -> String {
    let pk = primary_key_column(columns);
    let body = columns
        .iter()
        .zip(types)
        .enumerate()
        .map(|(idx, (name, ty))| {
            if pk == Some(idx) {
                format!("{} {} PRIMARY KEY", quote_ident(name), ty.ddl())
            } else {
                format!("{} {}", quote_ident(name), ty.ddl())
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({});", quote_ident(table), body)
}

fn copy_statement(table: &str, columns: &[String]) -> String {
    let list = columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "COPY {} ({}) FROM STDIN (FORMAT BINARY);",
        quote_ident(table),
        list
    )
}

fn drop_statement(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", quote_ident(table))
}
