use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_UPSTREAM_URL: &str = "https://www.i2ocr.com/process_form";
pub const DEFAULT_UPSTREAM_REFERER: &str = "https://www.i2ocr.com/";

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub upstream_url: String,
    pub upstream_referer: String,
    pub upstream_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 7000,
            upload_dir: PathBuf::from("uploads"),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_referer: DEFAULT_UPSTREAM_REFERER.to_string(),
            upstream_timeout: Duration::from_secs(30),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: parse_or(&lookup, "HOST", defaults.host)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            upload_dir: lookup("OCR_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            upstream_url: lookup("OCR_UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_referer: lookup("OCR_UPSTREAM_REFERER").unwrap_or(defaults.upstream_referer),
            upstream_timeout: Duration::from_secs(parse_or(
                &lookup,
                "OCR_UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )?),
            max_upload_bytes: parse_or(&lookup, "OCR_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { var, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:7000");
    }

    #[test]
    fn overrides_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("OCR_UPLOAD_DIR", "/tmp/staging"),
            ("OCR_UPSTREAM_TIMEOUT_SECS", "5"),
            ("OCR_MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/staging"));
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn blank_port_falls_back_to_default() {
        let config = Config::from_lookup(lookup_from(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "seven")])).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert_eq!(err.value, "seven");
    }
}
