use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("auth_code must be set (config file or APIX_AUTH_CODE)")]
    MissingAuthCode,

    #[error("base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("max_days_per_request must be between 1 and 31, got {0}")]
    MaxDaysOutOfRange(u32),

    #[error("default_lookback_days must be at least 1, got {0}")]
    LookbackTooSmall(u32),

    #[error("default_start_date {start} must not be after default_end_date {end}")]
    InvertedDefaultRange { start: String, end: String },
}

/// Failure classification used by callers that branch on error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Communication,
    RemoteRequest,
    Authentication,
    AuthenticationExhausted,
    UnsupportedType,
    InvalidResponse,
    InvalidDateRange,
    Cancelled,
    TableNotFound,
    ColumnAccess,
    Config,
}

/// Top-level error type for connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("invalid date/time value '{value}': {reason}")]
    Format { value: String, reason: String },

    #[error("communication with API failed: {message}")]
    Communication { message: String },

    #[error("request to endpoint '{endpoint}' failed (HTTP {status}): {message}")]
    RemoteRequest {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("could not authenticate against the API after renewing the token")]
    AuthenticationExhausted,

    #[error("unsupported date bound type: {type_name}")]
    UnsupportedType { type_name: String },

    #[error("invalid JSON response from API: {message}")]
    InvalidResponse { message: String },

    #[error("invalid date range: {start} > {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("operation cancelled during {during}")]
    Cancelled { during: &'static str },

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("cannot read column '{column}': {reason}")]
    ColumnAccess { column: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConnectorError {
    pub fn format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn column_access(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ColumnAccess {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Format { .. } => ErrorKind::Format,
            Self::Communication { .. } => ErrorKind::Communication,
            Self::RemoteRequest { .. } => ErrorKind::RemoteRequest,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::AuthenticationExhausted => ErrorKind::AuthenticationExhausted,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::InvalidDateRange { .. } => ErrorKind::InvalidDateRange,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::TableNotFound(_) => ErrorKind::TableNotFound,
            Self::ColumnAccess { .. } => ErrorKind::ColumnAccess,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Transient failure classes. These are already retried inside the client,
    /// so a caller seeing one has exhausted the local retry budget.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Communication { .. })
    }
}
