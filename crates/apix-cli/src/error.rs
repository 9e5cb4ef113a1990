use apix_core::{ConfigError, ConnectorError, ErrorKind};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Connector(error) => match error.kind() {
                ErrorKind::Config
                | ErrorKind::TableNotFound
                | ErrorKind::ColumnAccess
                | ErrorKind::InvalidDateRange => 2,
                ErrorKind::Authentication | ErrorKind::AuthenticationExhausted => 4,
                ErrorKind::Communication
                | ErrorKind::RemoteRequest
                | ErrorKind::InvalidResponse => 3,
                ErrorKind::Cancelled => 130,
                ErrorKind::Format | ErrorKind::UnsupportedType => 10,
            },
            Self::Task(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::from(ConfigError::MissingAuthCode).exit_code(), 2);
        assert_eq!(
            CliError::from(ConnectorError::TableNotFound(String::from("x"))).exit_code(),
            2
        );
        assert_eq!(CliError::from(ConnectorError::AuthenticationExhausted).exit_code(), 4);
        assert_eq!(
            CliError::from(ConnectorError::communication("reset")).exit_code(),
            3
        );
        assert_eq!(
            CliError::from(ConnectorError::Cancelled { during: "backoff" }).exit_code(),
            130
        );
    }

    #[test]
    fn bad_payloads_are_remote_failures_but_bad_values_are_not() {
        assert_eq!(
            CliError::from(ConnectorError::invalid_response("expected value")).exit_code(),
            3
        );
        assert_eq!(
            CliError::from(ConnectorError::format("31/02/2025", "day out of range")).exit_code(),
            10
        );
        let unsupported = ConnectorError::UnsupportedType {
            type_name: String::from("double"),
        };
        assert_eq!(CliError::from(unsupported).exit_code(), 10);
    }
}
