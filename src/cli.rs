use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Bulk-load CSV files into PostgreSQL with inferred column types",
    long_about = None
)]
pub struct Cli {
    /// Destination PostgreSQL host
    pub host: String,
    /// Destination PostgreSQL port
    pub port: u16,
    /// Role used to authenticate
    pub username: String,
    /// Password for the role
    pub password: String,
    /// Database that receives the imported tables
    pub database: String,
    /// Directory scanned (non-recursively) for .csv files
    pub directory: PathBuf,
    /// Character encoding of the input files (defaults to BOM sniffing, then utf-8)
    #[arg(long, value_name = "LABEL")]
    pub encoding: Option<String>,
}
