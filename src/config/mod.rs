//! Application configuration management

use std::env;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::error;

/// Default pause between two catalog polls
pub const DEFAULT_SLEEP_TIME: &str = "1440s";

/// Default number of trailer downloads attempted per cycle
pub const DEFAULT_MAX_DOWNLOADS_PER_CYCLE: usize = 10;

/// Default ceiling for the size of a selected trailer format (200 MiB)
pub const DEFAULT_TRAILER_MAX_BYTES: u64 = 200 * 1024 * 1024;

/// Output format of the console log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Read `LOG_FORMAT` from the environment.
    ///
    /// Kept apart from [Config] so logging can be installed before the rest
    /// of the configuration is parsed and its problems logged.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("LOG_FORMAT")
            .map(|v| Self::from_value(&v))
            .unwrap_or_default()
    }
}

/// Application configuration loaded from environment variables.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Radarr base URL, e.g. `http://radarr:7878`
    pub radarr_url: String,

    /// Radarr API key
    pub radarr_key: String,

    /// Directory trailers are written to
    pub download_location: String,

    /// Pause between two cycles
    pub sleep_time: Duration,

    /// Download attempts allowed per cycle
    pub max_downloads_per_cycle: usize,

    /// Largest trailer format (in bytes) the format selection accepts
    pub trailer_max_bytes: u64,

    /// Path or name of the yt-dlp executable
    pub ytdlp_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radarr_url: String::new(),
            radarr_key: String::new(),
            download_location: String::new(),
            sleep_time: Duration::from_secs(1440),
            max_downloads_per_cycle: DEFAULT_MAX_DOWNLOADS_PER_CYCLE,
            trailer_max_bytes: DEFAULT_TRAILER_MAX_BYTES,
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Never fails: missing values become empty strings and unparseable
    /// values fall back to their defaults after being logged.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sleep_value = lookup("SLEEP_TIME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SLEEP_TIME.to_string());
        let sleep_time = match parse_duration(&sleep_value) {
            Ok(duration) => duration,
            Err(e) => {
                error!(
                    value = %sleep_value,
                    error = %e,
                    fallback = DEFAULT_SLEEP_TIME,
                    "Invalid SLEEP_TIME, using default"
                );
                defaults.sleep_time
            }
        };

        Self {
            radarr_url: lookup("RADARR_URL").unwrap_or_default(),
            radarr_key: lookup("RADARR_KEY").unwrap_or_default(),
            download_location: lookup("DOWNLOAD_LOCATION").unwrap_or_default(),

            sleep_time,

            max_downloads_per_cycle: lookup("MAX_DOWNLOADS_PER_CYCLE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_downloads_per_cycle),

            trailer_max_bytes: lookup("TRAILER_MAX_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.trailer_max_bytes),

            ytdlp_path: lookup("YTDLP_PATH")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.ytdlp_path),
        }
    }
}

/// Parse a duration written like `1440s`, `1h30m`, `2.5m` or `250ms`.
///
/// A bare `0` is accepted; every other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        bail!("negative duration: {}", input);
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            bail!("invalid duration: {}", input);
        }
        let value: f64 = number
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid duration: {}", input))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "" => bail!("missing unit in duration: {}", input),
            other => bail!("unknown unit {:?} in duration: {}", other, input),
        };
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        bail!("duration out of range: {}", input);
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
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
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("1440s").unwrap(), Duration::from_secs(1440));
        assert_eq!(parse_duration("24m").unwrap(), Duration::from_secs(1440));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2.5m").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("1440").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("1h.m").is_err());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.radarr_url, "");
        assert_eq!(config.radarr_key, "");
        assert_eq!(config.download_location, "");
        assert_eq!(config.sleep_time, Duration::from_secs(1440));
        assert_eq!(config.max_downloads_per_cycle, 10);
        assert_eq!(config.trailer_max_bytes, DEFAULT_TRAILER_MAX_BYTES);
        assert_eq!(config.ytdlp_path, "yt-dlp");
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("RADARR_URL", "http://radarr:7878"),
            ("RADARR_KEY", "secret"),
            ("DOWNLOAD_LOCATION", "/trailers"),
            ("SLEEP_TIME", "1h"),
            ("MAX_DOWNLOADS_PER_CYCLE", "3"),
        ]));
        assert_eq!(config.radarr_url, "http://radarr:7878");
        assert_eq!(config.radarr_key, "secret");
        assert_eq!(config.download_location, "/trailers");
        assert_eq!(config.sleep_time, Duration::from_secs(3600));
        assert_eq!(config.max_downloads_per_cycle, 3);
    }

    #[test]
    fn test_log_format_lookup() {
        assert_eq!(LogFormat::from_lookup(lookup_from(&[])), LogFormat::Pretty);
        assert_eq!(
            LogFormat::from_lookup(lookup_from(&[("LOG_FORMAT", " JSON ")])),
            LogFormat::Json
        );
        assert_eq!(
            LogFormat::from_lookup(lookup_from(&[("LOG_FORMAT", "logfmt")])),
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_invalid_sleep_time_is_not_fatal() {
        let config = Config::from_lookup(lookup_from(&[("SLEEP_TIME", "whenever")]));
        assert_eq!(config.sleep_time, Duration::from_secs(1440));
    }
}
