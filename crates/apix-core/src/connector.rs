use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, ColumnDefinition, TableDefinition};
use crate::client::ApiClient;
use crate::config::ConnectorConfig;
use crate::cursor::RecordCursor;
use crate::http_client::HttpClient;
use crate::partition::{plan_splits, Split};
use crate::pushdown::{Constraint, TableHandle};
use crate::ConnectorError;

/// Entry point tying the catalog, predicate pushdown, split planning and the
/// shared authenticated client together.
#[derive(Clone)]
pub struct ApiConnector {
    catalog: Arc<Catalog>,
    client: ApiClient,
}

impl ApiConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_client(Catalog::builtin(), ApiClient::new(config))
    }

    pub fn with_http_client(
        config: ConnectorConfig,
        http: Arc<dyn HttpClient>,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_client(
            Catalog::builtin(),
            ApiClient::with_http_client(config, http, cancel),
        )
    }

    pub fn with_client(catalog: Catalog, client: ApiClient) -> Self {
        Self {
            catalog: Arc::new(catalog),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn config(&self) -> &ConnectorConfig {
        self.client.config()
    }

    pub fn schema_name(&self) -> String {
        self.config().schema_name.to_lowercase()
    }

    pub fn list_tables(&self) -> &[TableDefinition] {
        self.catalog.tables()
    }

    pub fn table(&self, table_name: &str) -> Result<&TableDefinition, ConnectorError> {
        self.catalog
            .get(table_name)
            .ok_or_else(|| ConnectorError::TableNotFound(table_name.to_owned()))
    }

    /// Handle for `schema.table`; both names match case-insensitively.
    pub fn table_handle(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<TableHandle, ConnectorError> {
        let schema = self.schema_name();
        if !schema.eq_ignore_ascii_case(schema_name) {
            return Err(ConnectorError::TableNotFound(format!("{schema_name}.{table_name}")));
        }
        let table = self.table(table_name)?;
        Ok(TableHandle::new(schema, table.table_name.clone()))
    }

    pub fn apply_filter(
        &self,
        handle: &TableHandle,
        constraint: &Constraint,
    ) -> Result<Option<TableHandle>, ConnectorError> {
        let table = self.table(&handle.table_name)?;
        handle.apply_filter(constraint, table)
    }

    /// Splits for `handle`, with open window sides resolved against today's
    /// UTC date.
    pub fn splits(&self, handle: &TableHandle) -> Result<Vec<Split>, ConnectorError> {
        self.splits_as_of(handle, OffsetDateTime::now_utc().date())
    }

    pub fn splits_as_of(
        &self,
        handle: &TableHandle,
        today: Date,
    ) -> Result<Vec<Split>, ConnectorError> {
        let table = self.table(&handle.table_name)?;
        Ok(plan_splits(handle, table, self.config(), today))
    }

    /// Fetches one split and returns a cursor over `columns`. An empty column
    /// list projects every column of the table.
    pub async fn read_split(
        &self,
        handle: &TableHandle,
        split: &Split,
        columns: &[&str],
    ) -> Result<RecordCursor, ConnectorError> {
        let table = self.table(&handle.table_name)?;
        let projection = project(table, columns)?;
        let rows = self
            .client
            .fetch_rows(&table.endpoint(), split.start_date, split.end_date)
            .await?;
        Ok(RecordCursor::new(projection, rows))
    }
}

fn project(
    table: &TableDefinition,
    columns: &[&str],
) -> Result<Vec<ColumnDefinition>, ConnectorError> {
    if columns.is_empty() {
        return Ok(table.columns.clone());
    }
    columns
        .iter()
        .map(|name| {
            table.column(name).cloned().ok_or_else(|| {
                let reason = format!("not a column of {}", table.table_name);
                ConnectorError::column_access(*name, reason)
            })
        })
        .collect()
}
