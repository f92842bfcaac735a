//! Client settings
//!
//! Settings arrive as a line of `name=value` pairs separated by commas.
//! Three layers are applied in order, later ones winning:
//! 1. the `FEDPRO_CLIENT_SETTINGS` environment variable
//! 2. the settings line handed to the client
//! 3. the `FEDPRO_CLIENT_OVERRIDES` environment variable

use std::time::Duration;

use fedpro_core::RtiError;
use fedpro_transport::{Endpoint, Protocol};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_ENV: &str = "FEDPRO_CLIENT_SETTINGS";
pub const OVERRIDES_ENV: &str = "FEDPRO_CLIENT_OVERRIDES";

pub const HEARTBEAT_INTERVAL: &str = "FED_INT_HEART";
pub const RESPONSE_TIMEOUT: &str = "FED_TIMEOUT_HEART";
pub const RECONNECT_LIMIT: &str = "FED_TIMEOUT_RECONNECT";
pub const CONNECT_TIMEOUT: &str = "connect.timeout";
pub const ASYNC_UPDATES: &str = "asyncUpdates";
pub const RATE_LIMITED: &str = "messageQueue.outgoing.limitedRate";
pub const PORT: &str = "connect.port";
pub const PROTOCOL: &str = "connect.protocol";
pub const HOSTNAME: &str = "connect.hostname";
pub const MAX_RETRY_ATTEMPTS: &str = "connect.maxRetryAttempts";
pub const MESSAGE_QUEUE_SIZE: &str = "messageQueue.size";

pub const DEFAULT_PORT: u16 = 15164;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("malformed settings entry '{0}', expected name=value")]
    Malformed(String),

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<SettingsError> for RtiError {
    fn from(e: SettingsError) -> Self {
        RtiError::InvalidLocalSettingsDesignator(e.to_string())
    }
}

/// Effective client configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Interval between outbound heartbeats
    pub heartbeat_interval: Duration,
    /// How long a synchronous call may wait for its response; zero waits forever
    pub response_timeout: Duration,
    /// Upper bound on session resumption attempts. Accepted so shared
    /// settings files load; the client never resumes a lost session.
    pub reconnect_limit: Duration,
    /// Handshake bound; falls back to `response_timeout`
    pub connect_timeout: Option<Duration>,
    /// Send attribute updates and interactions without waiting for a response
    pub async_updates: bool,
    /// Accepted and stored; outbound traffic is never throttled.
    pub rate_limited: bool,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Accepted and stored; a failed connect is not retried.
    pub max_retry_attempts: u32,
    pub message_queue_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            heartbeat_interval: Duration::from_secs(60),
            response_timeout: Duration::from_secs(180),
            reconnect_limit: Duration::from_secs(600),
            connect_timeout: None,
            async_updates: false,
            rate_limited: false,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Tcp,
            max_retry_attempts: 0,
            message_queue_size: 2000,
        }
    }
}

impl ClientSettings {
    /// Layer the environment around `settings_line`.
    pub fn load(settings_line: &str) -> Result<Self, SettingsError> {
        let defaults = std::env::var(SETTINGS_ENV).ok();
        let overrides = std::env::var(OVERRIDES_ENV).ok();
        Self::layered(defaults.as_deref(), settings_line, overrides.as_deref())
    }

    /// Parse a single settings line over the defaults, ignoring the environment.
    pub fn from_settings_line(settings_line: &str) -> Result<Self, SettingsError> {
        Self::layered(None, settings_line, None)
    }

    pub fn layered(
        defaults: Option<&str>,
        settings_line: &str,
        overrides: Option<&str>,
    ) -> Result<Self, SettingsError> {
        let mut settings = ClientSettings::default();
        for layer in [defaults, Some(settings_line), overrides].into_iter().flatten() {
            settings.apply_line(layer)?;
        }
        Ok(settings)
    }

    /// Settings for one connect: `line` over `self`, with the override
    /// variable still winning.
    pub fn with_local_settings(&self, line: &str) -> Result<Self, SettingsError> {
        let mut settings = self.clone();
        settings.apply_line(line)?;
        if let Ok(overrides) = std::env::var(OVERRIDES_ENV) {
            settings.apply_line(&overrides)?;
        }
        Ok(settings)
    }

    /// Apply every `name=value` entry of `line`. Empty entries are skipped.
    pub fn apply_line(&mut self, line: &str) -> Result<(), SettingsError> {
        for entry in line.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| SettingsError::Malformed(entry.to_string()))?;
            self.apply(name.trim(), value.trim())?;
        }
        Ok(())
    }

    pub fn apply(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        match name {
            HEARTBEAT_INTERVAL => self.heartbeat_interval = parse_duration(name, value)?,
            RESPONSE_TIMEOUT => self.response_timeout = parse_duration(name, value)?,
            RECONNECT_LIMIT => self.reconnect_limit = parse_duration(name, value)?,
            CONNECT_TIMEOUT => self.connect_timeout = Some(parse_duration(name, value)?),
            ASYNC_UPDATES => self.async_updates = parse_bool(name, value)?,
            RATE_LIMITED => self.rate_limited = parse_bool(name, value)?,
            PORT => self.port = parse_digits(name, value)?,
            PROTOCOL => {
                self.protocol = value.parse().map_err(|e: fedpro_transport::TransportError| {
                    invalid(name, value, e.to_string())
                })?
            }
            HOSTNAME => {
                if value.is_empty() {
                    return Err(invalid(name, value, "empty host name"));
                }
                self.host = value.to_string();
            }
            MAX_RETRY_ATTEMPTS => self.max_retry_attempts = parse_digits(name, value)?,
            MESSAGE_QUEUE_SIZE => self.message_queue_size = parse_digits(name, value)?,
            other => return Err(SettingsError::UnknownSetting(other.to_string())),
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout.unwrap_or(self.response_timeout)
    }

    /// `None` when calls may block indefinitely.
    pub fn call_timeout(&self) -> Option<Duration> {
        (!self.response_timeout.is_zero()).then_some(self.response_timeout)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            protocol: self.protocol,
            connect_timeout: self.connect_timeout(),
        }
    }
}

fn invalid(name: &str, value: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Plain digits are seconds; anything else goes through humantime ("1m 30s").
fn parse_duration(name: &str, value: &str) -> Result<Duration, SettingsError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| invalid(name, value, e.to_string()));
    }
    humantime::parse_duration(value).map_err(|e| invalid(name, value, e.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SettingsError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(name, value, "expected true or false"))
    }
}

/// Unsigned integers: digits only, no sign, no whitespace.
fn parse_digits<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(name, value, "expected an unsigned integer"));
    }
    value.parse::<T>().map_err(|e| invalid(name, value, e.to_string()))
}
