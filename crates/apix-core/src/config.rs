use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

use crate::datetime::{format_date, parse_date};
use crate::error::ConfigError;
use crate::retry::RetryConfig;
use crate::token_cache::TOKEN_VALIDITY;

/// Upper bound the API accepts for a single request window.
pub const MAX_DAYS_PER_REQUEST_LIMIT: u32 = 31;

const ENV_PREFIX: &str = "APIX_";

/// Connection and partitioning settings for one API tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub base_url: String,
    pub auth_code: Option<String>,
    /// Path segment used in both the issuance and the data URLs.
    pub tenant: String,
    pub schema_name: String,
    #[serde(
        deserialize_with = "deserialize_optional_date",
        serialize_with = "serialize_optional_date"
    )]
    pub default_start_date: Option<Date>,
    #[serde(
        deserialize_with = "deserialize_optional_date",
        serialize_with = "serialize_optional_date"
    )]
    pub default_end_date: Option<Date>,
    pub default_lookback_days: u32,
    pub max_days_per_request: u32,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub token_refresh_skew_ms: u64,
    pub max_retries: u32,
    pub log_level: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://crm.api.une.cx"),
            auth_code: None,
            tenant: String::from("univesp"),
            schema_name: String::from("univesp"),
            default_start_date: None,
            default_end_date: None,
            default_lookback_days: 7,
            max_days_per_request: MAX_DAYS_PER_REQUEST_LIMIT,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 60_000,
            token_refresh_skew_ms: 300_000,
            max_retries: 2,
            log_level: String::from("info"),
        }
    }
}

impl ConnectorConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then apply `APIX_*` environment overrides.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus `APIX_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies overrides resolved by `lookup`, which receives the full
    /// variable name (`APIX_BASE_URL`, ...).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(base_url) = var("BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(auth_code) = var("AUTH_CODE") {
            self.auth_code = Some(auth_code);
        }
        if let Some(tenant) = var("TENANT") {
            self.tenant = tenant;
        }
        if let Some(schema_name) = var("SCHEMA_NAME") {
            self.schema_name = schema_name;
        }
        if let Some(value) = var("DEFAULT_START_DATE") {
            self.default_start_date = parse_optional_date("APIX_DEFAULT_START_DATE", &value)?;
        }
        if let Some(value) = var("DEFAULT_END_DATE") {
            self.default_end_date = parse_optional_date("APIX_DEFAULT_END_DATE", &value)?;
        }
        if let Some(value) = var("DEFAULT_LOOKBACK_DAYS") {
            self.default_lookback_days = parse_number("APIX_DEFAULT_LOOKBACK_DAYS", value)?;
        }
        if let Some(value) = var("MAX_DAYS_PER_REQUEST") {
            self.max_days_per_request = parse_number("APIX_MAX_DAYS_PER_REQUEST", value)?;
        }
        if let Some(value) = var("CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = parse_number("APIX_CONNECT_TIMEOUT_MS", value)?;
        }
        if let Some(value) = var("READ_TIMEOUT_MS") {
            self.read_timeout_ms = parse_number("APIX_READ_TIMEOUT_MS", value)?;
        }
        if let Some(value) = var("TOKEN_REFRESH_SKEW_MS") {
            self.token_refresh_skew_ms = parse_number("APIX_TOKEN_REFRESH_SKEW_MS", value)?;
        }
        if let Some(value) = var("MAX_RETRIES") {
            self.max_retries = parse_number("APIX_MAX_RETRIES", value)?;
        }
        if let Some(log_level) = var("LOG_LEVEL") {
            self.log_level = log_level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_code.as_deref().map_or(true, |code| code.trim().is_empty()) {
            return Err(ConfigError::MissingAuthCode);
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.tenant.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "tenant",
                value: self.tenant.clone(),
            });
        }
        if !(1..=MAX_DAYS_PER_REQUEST_LIMIT).contains(&self.max_days_per_request) {
            return Err(ConfigError::MaxDaysOutOfRange(self.max_days_per_request));
        }
        if self.default_lookback_days < 1 {
            return Err(ConfigError::LookbackTooSmall(self.default_lookback_days));
        }
        if let (Some(start), Some(end)) = (self.default_start_date, self.default_end_date) {
            if start > end {
                return Err(ConfigError::InvertedDefaultRange {
                    start: format_date(start),
                    end: format_date(end),
                });
            }
        }
        Ok(())
    }

    /// Issuance code; empty when the config has not been validated.
    pub fn auth_code(&self) -> &str {
        self.auth_code.as_deref().unwrap_or_default()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
    }

    pub const fn token_validity(&self) -> Duration {
        TOKEN_VALIDITY
    }

    pub const fn token_refresh_skew(&self) -> Duration {
        Duration::from_millis(self.token_refresh_skew_ms)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_optional_date(key: &'static str, value: &str) -> Result<Option<Date>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value.trim())
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        })
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value.trim()).map(Some).map_err(|_| {
        serde::de::Error::custom(format!(
            "invalid date '{value}', expected YYYY-MM-DD"
        ))
    })
}

fn serialize_optional_date<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(date) => serializer.serialize_some(&format_date(*date)),
        None => serializer.serialize_none(),
    }
}
