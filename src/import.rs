//! Per-file import orchestration against the destination database.
//!
//! Each file moves through the same stages: scan (first pass, capability
//! masks), resolve, synthesize statements, drop+create, stream (second pass
//! over the binary COPY channel), finalize. A failure at any stage stops that
//! file before the next stage; the run terminates on the first failed file.
//! Files share no state and each holds at most one connection and one COPY
//! channel at a time.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use log::{debug, info};
use postgres::{
    Client, NoTls,
    binary_copy::BinaryCopyInWriter,
    types::{ToSql, Type},
};

use crate::{cli::Cli, data, infer, io_utils, schema::RelationMeta};

pub fn execute(args: &Cli) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.encoding.as_deref())?;
    let files = discover(&args.directory)?;
    if files.is_empty() {
        info!("No .csv files found in {}", args.directory.display());
        return Ok(());
    }
    let config = destination_config(args);
    for path in &files {
        import_table(&config, path, encoding)?;
    }
    Ok(())
}

fn destination_config(args: &Cli) -> postgres::Config {
    let mut config = postgres::Config::new();
    config
        .host(&args.host)
        .port(args.port)
        .user(&args.username)
        .password(&args.password)
        .dbname(&args.database);
    config
}

/// Regular files directly inside `dir` with a case-insensitive `.csv`
/// extension, sorted for a deterministic import order.
fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Reading directory {dir:?}"))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Reading directory {dir:?}"))?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn table_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .ok_or_else(|| anyhow!("Cannot derive a table name from {path:?}"))
}

/// First pass: full scan, type resolution, statement synthesis. The returned
/// descriptor is fixed for the remainder of the file's import.
pub fn analyze_table(path: &Path, encoding: Option<&'static Encoding>) -> Result<RelationMeta> {
    let table = table_name(path)?;
    info!("Analyzing {table}...");
    let mut reader = io_utils::open_csv_reader_from_path(path, encoding)?;
    let scan = infer::scan(&mut reader).with_context(|| format!("Scanning {path:?}"))?;
    let types = scan
        .resolve_columns()
        .with_context(|| format!("Inferring column types for {path:?}"))?;
    debug!(
        "Scanned {} data row(s) across {} column(s)",
        scan.rows,
        scan.headers.len()
    );
    let meta = RelationMeta::new(table, scan.headers, types);
    info!("{}", meta.create_statement);
    Ok(meta)
}

fn import_table(
    config: &postgres::Config,
    path: &Path,
    encoding: Option<&'static Encoding>,
) -> Result<()> {
    let meta = analyze_table(path, encoding)?;
    let mut client = config
        .connect(NoTls)
        .context("Connecting to destination database")?;
    client
        .batch_execute(&meta.drop_statement)
        .with_context(|| format!("Dropping table {}", meta.table))?;
    client
        .batch_execute(&meta.create_statement)
        .with_context(|| format!("Creating table {}", meta.table))?;
    let loaded = stream_rows(&mut client, path, encoding, &meta)
        .with_context(|| format!("Bulk-loading {path:?} into table {}", meta.table))?;
    info!("Loaded {loaded} row(s) into {}", meta.table);
    Ok(())
}

/// Second pass: re-read the file and stream typed rows into the COPY channel.
/// A conversion failure aborts before the writer is finalized, so a failed
/// load leaves the freshly created table empty rather than half-populated.
fn stream_rows(
    client: &mut Client,
    path: &Path,
    encoding: Option<&'static Encoding>,
    meta: &RelationMeta,
) -> Result<u64> {
    let mut reader = io_utils::open_csv_reader_from_path(path, encoding)?;
    let headers = io_utils::reader_headers(&mut reader)?;
    if headers != meta.columns {
        bail!("Header row changed between passes in {path:?}");
    }
    let wire_types: Vec<Type> = meta.types.iter().copied().map(data::wire_type).collect();
    let sink = client
        .copy_in(meta.copy_statement.as_str())
        .context("Opening binary COPY channel")?;
    let mut writer = BinaryCopyInWriter::new(sink, &wire_types);

    let mut record = csv::StringRecord::new();
    let mut row = Vec::with_capacity(meta.columns.len());
    let mut row_number = 0u64;
    while reader
        .read_record(&mut record)
        .with_context(|| format!("Reading CSV record {}", row_number + 1))?
    {
        row_number += 1;
        row.clear();
        for (idx, column) in meta.columns.iter().enumerate() {
            let field = record.get(idx).unwrap_or_default();
            let value = data::encode_field(field, meta.types[idx])
                .with_context(|| format!("Row {row_number}, column '{column}'"))?;
            row.push(value);
        }
        let fields: Vec<&(dyn ToSql + Sync)> = row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        writer
            .write(&fields)
            .with_context(|| format!("Writing row {row_number} to the COPY channel"))?;
    }
    writer.finish().context("Finalizing the COPY channel")
}
