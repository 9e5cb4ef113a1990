mod fetch;
mod splits;
mod tables;

use apix_core::{ApiConnector, Constraint, DateBound, Domain, TableHandle, ValueRange};

use crate::cli::{Cli, Command, WindowArgs};
use crate::error::CliError;

/// Lists the catalog. Needs no configuration.
pub fn list_tables(pretty: bool) -> Result<(), CliError> {
    tables::run(pretty)
}

/// Runs a command that talks to the API.
pub async fn run(cli: &Cli, connector: &ApiConnector) -> Result<(), CliError> {
    match &cli.command {
        Command::Tables => tables::run(cli.pretty),
        Command::Splits(args) => splits::run(connector, args, cli.pretty),
        Command::Fetch(args) => fetch::run(connector, args).await,
    }
}

/// Resolves the table and pushes the `--start/--end` window into its handle.
fn filtered_handle(connector: &ApiConnector, args: &WindowArgs) -> Result<TableHandle, CliError> {
    let handle = connector.table_handle(&connector.schema_name(), &args.table)?;
    if args.start.is_none() && args.end.is_none() {
        return Ok(handle);
    }

    let table = connector.table(&handle.table_name)?;
    let range = ValueRange {
        low: args.start.map(DateBound::Date),
        high: args.end.map(DateBound::Date),
    };
    let constraint =
        Constraint::all().with_domain(table.date_column_name.clone(), Domain::single(range));

    Ok(connector
        .apply_filter(&handle, &constraint)?
        .unwrap_or(handle))
}
