//! CSV reader construction and input decoding.
//!
//! Input files are decoded to UTF-8 before tokenization. A BOM selects the
//! encoding when present, and an explicit label overrides it; otherwise bytes
//! pass through as UTF-8. The delimiter is fixed; one import run handles
//! comma-separated files only.

use std::{fs::File, io::BufReader, io::Read, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;

pub const DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<Option<&'static Encoding>> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .map(Some)
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(None),
    }
}

pub fn open_csv_reader_from_path(
    path: &Path,
    encoding: Option<&'static Encoding>,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(encoding)
        .bom_sniffing(true)
        .build(BufReader::new(file));
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(DELIMITER)
        .double_quote(true)
        .flexible(false);
    Ok(builder.from_reader(Box::new(decoder) as Box<dyn Read>))
}

pub fn reader_headers<R>(reader: &mut csv::Reader<R>) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.headers().context("Reading CSV header row")?;
    Ok(headers.iter().map(|name| name.to_string()).collect())
}
