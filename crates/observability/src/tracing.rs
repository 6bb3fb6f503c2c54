//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// How the process should log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set (e.g. `info`).
    pub filter: String,
    /// JSON lines when true, human readable output otherwise.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: true,
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the configured directive; a broken directive
    /// falls back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops). Returns whether
/// this call installed the subscriber.
pub fn init(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = LoggingConfig {
            filter: "warn".to_string(),
            json: false,
        };
        init(&config);
        assert!(!init(&config));
    }

    #[test]
    fn invalid_directive_still_yields_a_filter() {
        let config = LoggingConfig {
            filter: "[[[".to_string(),
            json: true,
        };
        let _ = config.env_filter();
    }
}
