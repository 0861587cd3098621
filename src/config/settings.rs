use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::services::http_executor::DEFAULT_TIMEOUT_MS;

pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_SSE_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_SERVER_NAME: &str = "dynamcp";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("DYNAMCP_CONFIG (or --config) must be set to a config URL or file path")]
    MissingConfigLocation,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Sse,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            other => Err(other.to_string()),
        }
    }
}

/// Runtime settings of the server process
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub config_location: String,
    pub refresh_interval: Duration,
    pub handler_timeout: Duration,
    pub transport: TransportKind,
    pub sse_bind: SocketAddr,
    pub server_name: String,
}

/// Optional overrides, usually coming from the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config_location: Option<String>,
    pub refresh_secs: Option<u64>,
    pub handler_timeout_ms: Option<u64>,
    pub transport: Option<TransportKind>,
    pub sse_bind: Option<SocketAddr>,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::resolve(SettingsOverrides::default())
    }

    /// Builds settings from the environment, letting `overrides` win
    pub fn resolve(overrides: SettingsOverrides) -> Result<Self, SettingsError> {
        let config_location = overrides
            .config_location
            .or_else(|| env_string("DYNAMCP_CONFIG"))
            .ok_or(SettingsError::MissingConfigLocation)?;

        let refresh_secs = match overrides.refresh_secs {
            Some(secs) => secs,
            None => env_parse("DYNAMCP_REFRESH_SECS")?.unwrap_or(DEFAULT_REFRESH_SECS),
        };
        if refresh_secs == 0 {
            return Err(SettingsError::InvalidValue {
                key: "DYNAMCP_REFRESH_SECS",
                value: "0".to_string(),
            });
        }

        let handler_timeout_ms = match overrides.handler_timeout_ms {
            Some(ms) => ms,
            None => env_parse("DYNAMCP_HANDLER_TIMEOUT_MS")?.unwrap_or(DEFAULT_TIMEOUT_MS),
        };

        let transport = match overrides.transport {
            Some(kind) => kind,
            None => env_parse("DYNAMCP_TRANSPORT")?.unwrap_or(TransportKind::Stdio),
        };

        let sse_bind = match overrides.sse_bind {
            Some(addr) => addr,
            None => match env_parse("DYNAMCP_SSE_BIND")? {
                Some(addr) => addr,
                None => parse_value("DYNAMCP_SSE_BIND", DEFAULT_SSE_BIND)?,
            },
        };

        let server_name =
            env_string("DYNAMCP_SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        Ok(ServerSettings {
            config_location,
            refresh_interval: Duration::from_secs(refresh_secs),
            handler_timeout: Duration::from_millis(handler_timeout_ms),
            transport,
            sse_bind,
            server_name,
        })
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, SettingsError> {
    env_string(key)
        .map(|value| parse_value(key, &value))
        .transpose()
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
