//! Server configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CLIENT_BUFFER: usize = 256;
pub const DEFAULT_HUB_BUFFER: usize = 1024;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Which browser origins may open a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// How often empty rooms are reclaimed.
    pub sweep_interval: Duration,
    /// Outbound frame queue per websocket connection.
    pub client_buffer: usize,
    /// Inbox capacity of the coordinator task.
    pub hub_buffer: usize,
    pub cors_origins: CorsOrigins,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            client_buffer: DEFAULT_CLIENT_BUFFER,
            hub_buffer: DEFAULT_HUB_BUFFER,
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
        }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: default `0.0.0.0`
    /// - `PORT`: default 5000
    /// - `ROOM_SWEEP_INTERVAL_SECS`: default 60
    /// - `WS_CLIENT_BUFFER`: default 256
    /// - `HUB_COMMAND_BUFFER`: default 1024
    /// - `CORS_ORIGINS`: comma separated, `*` for any; default the local dev frontend
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let sweep_secs = non_zero(
            "ROOM_SWEEP_INTERVAL_SECS",
            parse_var(&lookup, "ROOM_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
        )?;
        let client_buffer =
            non_zero("WS_CLIENT_BUFFER", parse_var(&lookup, "WS_CLIENT_BUFFER", DEFAULT_CLIENT_BUFFER)?)?;
        let hub_buffer = non_zero("HUB_COMMAND_BUFFER", parse_var(&lookup, "HUB_COMMAND_BUFFER", DEFAULT_HUB_BUFFER)?)?;
        let cors_origins = parse_origins(lookup("CORS_ORIGINS").as_deref().unwrap_or(DEFAULT_CORS_ORIGINS));

        Ok(Self {
            host,
            port,
            sweep_interval: Duration::from_secs(sweep_secs),
            client_buffer,
            hub_buffer,
            cors_origins,
        })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn non_zero<T: PartialEq + Default>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

fn parse_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if origins.iter().any(|o| o == "*") {
        return CorsOrigins::Any;
    }
    CorsOrigins::List(origins)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
