use apix_core::ApiConnector;

use super::filtered_handle;
use crate::cli::WindowArgs;
use crate::error::CliError;
use crate::output;

pub fn run(connector: &ApiConnector, args: &WindowArgs, pretty: bool) -> Result<(), CliError> {
    let handle = filtered_handle(connector, args)?;
    let splits = connector.splits(&handle)?;
    output::render(&splits, pretty)
}
