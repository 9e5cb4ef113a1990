//! # Apix Core
//!
//! Authenticated fetch-and-partition engine for the CRM REST API.
//!
//! ## Overview
//!
//! Query predicates on a table's date column are folded into an effective
//! date window, the window is cut into API-sized splits, and each split is
//! fetched through one shared authenticated client:
//!
//! - **Date/time normalization** between the wire encodings and epoch micros
//! - **Token cache** with a lock-free read path and single-flight refresh
//! - **Retrying invoker** with capped exponential backoff and cancellation
//! - **Authenticated fetch client** that re-authenticates once on rejection
//! - **Range partitioner** and **constraint merger** for split planning
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Built-in tables, columns and endpoints |
//! | [`client`] | Authenticated fetch client |
//! | [`config`] | Connector configuration (TOML + `APIX_*` env) |
//! | [`connector`] | Facade over catalog, pushdown, splits and reads |
//! | [`cursor`] | Typed reads over fetched rows |
//! | [`datetime`] | Date/time parsing, formatting and bound normalization |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`partition`] | Split planning |
//! | [`pushdown`] | Effective windows and predicate merging |
//! | [`retry`] | Retrying HTTP invoker |
//! | [`row`] | Normalized API records |
//! | [`token_cache`] | Shared bearer credential |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apix_core::{ApiConnector, ConnectorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = ApiConnector::new(ConnectorConfig::from_env()?);
//!     let handle = connector.table_handle("univesp", "lista_lead")?;
//!
//!     for split in connector.splits(&handle)? {
//!         let mut cursor = connector.read_split(&handle, &split, &["id_lead"]).await?;
//!         while cursor.advance() {
//!             println!("{}", cursor.get_long(0)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! - Bearer tokens and the issuance code are never logged
//! - One credential is shared per client; clones share it

pub mod catalog;
pub mod client;
pub mod config;
pub mod connector;
pub mod cursor;
pub mod datetime;
pub mod error;
pub mod http_client;
pub mod partition;
pub mod pushdown;
pub mod retry;
pub mod row;
pub mod token_cache;

#[cfg(test)]
mod test_support;

pub use catalog::{Catalog, ColumnDefinition, ColumnType, TableDefinition};
pub use client::{ApiClient, DatePayload, EndpointDescriptor};
pub use config::ConnectorConfig;
pub use connector::ApiConnector;
pub use cursor::RecordCursor;
pub use datetime::{
    format_date, normalize_epoch_number, parse_api_timestamp, parse_date,
    parse_timestamp_to_epoch_micros, to_date_from_bound, to_epoch_micros, DateBound,
};
pub use error::{ConfigError, ConnectorError, ErrorKind};
pub use http_client::{
    HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient, RequestBody, TransportError,
    TransportErrorKind,
};
pub use partition::{build_splits_for_range, plan_splits, resolve_window, Split};
pub use pushdown::{
    merge_date_constraint, Constraint, Domain, EffectiveWindow, TableHandle, ValueRange,
};
pub use retry::{Backoff, RetryConfig, RetryingInvoker};
pub use row::{Row, RowValue, RAW_JSON_FIELD};
pub use token_cache::{Credential, TokenCache, TOKEN_VALIDITY};
pub use tokio_util::sync::CancellationToken;
