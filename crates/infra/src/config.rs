//! Configuration loading and representation.
//!
//! Everything is read from environment variables with sensible defaults:
//!
//! | variable                       | default | meaning                              |
//! |--------------------------------|---------|--------------------------------------|
//! | `ACCESSDESK_DEFAULT_PAGE_SIZE` | `10`    | page size when a caller asks for none |
//! | `ACCESSDESK_MAX_PAGE_SIZE`     | `100`   | upper bound for any page              |
//! | `ACCESSDESK_LOG_FILTER`        | `info`  | tracing filter (`RUST_LOG` wins)      |
//! | `ACCESSDESK_LOG_FORMAT`        | `json`  | `json` or `plain`                     |

use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be 'json' or 'plain', got '{value}'")]
    InvalidLogFormat { var: &'static str, value: String },

    #[error("default page size {default} must be between 1 and the max page size {max}")]
    InvalidPageBounds { default: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDeskConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for AccessDeskConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            log_filter: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl AccessDeskConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup (tests use a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_page_size = parse_size(&lookup, "ACCESSDESK_DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.default_page_size);
        let max_page_size =
            parse_size(&lookup, "ACCESSDESK_MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size);

        let log_filter = lookup("ACCESSDESK_LOG_FILTER")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.log_filter);

        let log_format = match lookup("ACCESSDESK_LOG_FORMAT") {
            None => defaults.log_format,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "plain" | "pretty" | "text" => LogFormat::Plain,
                _ => {
                    return Err(ConfigError::InvalidLogFormat {
                        var: "ACCESSDESK_LOG_FORMAT",
                        value: v,
                    });
                }
            },
        };

        let config = Self {
            default_page_size,
            max_page_size,
            log_filter,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidPageBounds {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }
}

fn parse_size(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { var, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AccessDeskConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AccessDeskConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = AccessDeskConfig::from_lookup(lookup(&[
            ("ACCESSDESK_DEFAULT_PAGE_SIZE", "25"),
            ("ACCESSDESK_MAX_PAGE_SIZE", "50"),
            ("ACCESSDESK_LOG_FILTER", "accessdesk=debug"),
            ("ACCESSDESK_LOG_FORMAT", "Plain"),
        ]))
        .unwrap();

        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.log_filter, "accessdesk=debug");
        assert_eq!(config.log_format, LogFormat::Plain);
    }

    #[test]
    fn rejects_garbage() {
        let err = AccessDeskConfig::from_lookup(lookup(&[("ACCESSDESK_MAX_PAGE_SIZE", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = AccessDeskConfig::from_lookup(lookup(&[("ACCESSDESK_DEFAULT_PAGE_SIZE", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));

        let err = AccessDeskConfig::from_lookup(lookup(&[("ACCESSDESK_LOG_FORMAT", "xml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogFormat { .. }));
    }

    #[test]
    fn default_page_size_cannot_exceed_max() {
        let err = AccessDeskConfig::from_lookup(lookup(&[
            ("ACCESSDESK_DEFAULT_PAGE_SIZE", "200"),
            ("ACCESSDESK_MAX_PAGE_SIZE", "100"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPageBounds { default: 200, max: 100 });
    }
}
