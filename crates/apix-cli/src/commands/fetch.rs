use std::sync::Arc;

use apix_core::{ApiConnector, ConnectorError, Split, TableHandle};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::filtered_handle;
use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::output;

type SplitRows = Vec<Map<String, Value>>;

pub async fn run(connector: &ApiConnector, args: &FetchArgs) -> Result<(), CliError> {
    let handle = filtered_handle(connector, &args.window)?;
    let splits = connector.splits(&handle)?;
    info!(table = %handle.table_name, splits = splits.len(), "fetching table");

    let cancel = connector.client().cancellation_token().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight requests");
            cancel.cancel();
        }
    });

    let result = fetch_all(connector, &handle, splits, args).await;
    interrupt.abort();

    let mut writer = output::stdout_ndjson();
    for rows in result? {
        for row in rows {
            writer.write(&row)?;
        }
    }
    writer.finish()
}

/// Fetches every split with at most `args.concurrency` in flight. Results
/// come back in split order; the first failure aborts the remaining splits.
async fn fetch_all(
    connector: &ApiConnector,
    handle: &TableHandle,
    splits: Vec<Split>,
    args: &FetchArgs,
) -> Result<Vec<SplitRows>, CliError> {
    let permits = Arc::new(Semaphore::new(usize::from(args.concurrency)));
    let columns = Arc::new(args.columns.clone());
    let mut tasks = JoinSet::new();
    let split_count = splits.len();

    for (index, split) in splits.into_iter().enumerate() {
        let connector = connector.clone();
        let handle = handle.clone();
        let columns = Arc::clone(&columns);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| ConnectorError::Cancelled { during: "scheduling" })?;
            let columns = columns.iter().map(String::as_str).collect::<Vec<_>>();
            let rows = read_rows(&connector, &handle, &split, &columns).await?;
            Ok::<_, ConnectorError>((index, rows))
        });
    }

    let mut results = vec![Vec::new(); split_count];
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok((index, rows)) => results[index] = rows,
            Err(error) => {
                tasks.abort_all();
                return Err(error.into());
            }
        }
    }
    Ok(results)
}

async fn read_rows(
    connector: &ApiConnector,
    handle: &TableHandle,
    split: &Split,
    columns: &[&str],
) -> Result<SplitRows, ConnectorError> {
    let mut cursor = connector.read_split(handle, split, columns).await?;
    let mut rows = Vec::new();
    while cursor.advance() {
        rows.push(cursor.typed_row()?);
    }
    Ok(rows)
}
