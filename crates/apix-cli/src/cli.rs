//! CLI argument definitions for apix.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tables` | List catalog tables with endpoint and date column |
//! | `splits` | Print the splits planned for a table and window |
//! | `fetch` | Fetch every split and print rows as NDJSON |
//!
//! # Examples
//!
//! ```bash
//! apix tables --pretty
//! apix --config apix.toml splits lista_lead --start 2025-01-01 --end 2025-02-15
//! APIX_AUTH_CODE=... apix fetch lista_protocolo --start 2025-01-01 \
//!     --columns id_protocoloatendimento,ds_protocolo
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use time::Date;

#[derive(Debug, Parser)]
#[command(
    name = "apix",
    author,
    version,
    about = "Fetch date-partitioned CRM tables from the REST API"
)]
pub struct Cli {
    /// TOML configuration file. `APIX_*` environment variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the tables exposed by the API.
    Tables,

    /// Print the splits a read of the table would issue.
    ///
    /// # Examples
    ///
    ///   apix splits lista_lead --start 2025-01-01 --end 2025-02-15
    Splits(WindowArgs),

    /// Fetch a table and print one JSON object per row.
    ///
    /// Splits are fetched concurrently through one shared client. Ctrl-C
    /// cancels in-flight requests.
    Fetch(FetchArgs),
}

/// Table and optional date window.
#[derive(Debug, Args)]
pub struct WindowArgs {
    /// Table name (case-insensitive).
    pub table: String,

    /// First day of the window (YYYY-MM-DD).
    #[arg(long, value_parser = parse_cli_date)]
    pub start: Option<Date>,

    /// Last day of the window (YYYY-MM-DD).
    #[arg(long, value_parser = parse_cli_date)]
    pub end: Option<Date>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Columns to project; every column when omitted.
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Maximum number of splits fetched at once.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,
}

fn parse_cli_date(value: &str) -> Result<Date, String> {
    apix_core::parse_date(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_arguments() {
        let cli = Cli::try_parse_from([
            "apix",
            "--pretty",
            "fetch",
            "lista_lead",
            "--start",
            "2025-01-01",
            "--columns",
            "id_lead,dt_criacao",
        ])
        .expect("valid arguments");

        assert!(cli.pretty);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.window.table, "lista_lead");
        assert_eq!(args.window.start, apix_core::parse_date("2025-01-01").ok());
        assert_eq!(args.window.end, None);
        assert_eq!(args.columns, ["id_lead", "dt_criacao"]);
        assert_eq!(args.concurrency, 4);
    }

    #[test]
    fn rejects_non_canonical_dates() {
        let result = Cli::try_parse_from(["apix", "splits", "lista_lead", "--end", "15/02/2025"]);
        assert!(result.is_err());
    }
}
