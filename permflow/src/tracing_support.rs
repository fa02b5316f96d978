//! Tracing subscriber setup for hosts embedding the flow controller
//!
//! The library itself only emits `tracing` events. Binaries call
//! [`init_subscriber`] or [`init_subscriber_with_config`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,

    /// Single-line output.
    Compact,

    /// JSON lines, for log collectors.
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG or defaults to "info".
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
        }
    }
}

/// Initialize tracing with default settings.
///
/// Respects `RUST_LOG` (e.g. `RUST_LOG=permflow=debug`), defaulting to "info".
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize tracing with custom configuration.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_subscriber_with_config(config: TracingConfig) {
    let filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let base = tracing_subscriber::fmt::layer().with_target(config.target);

    let result = match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => registry.with(base.pretty()).try_init(),
        (TracingFormat::Pretty, false) => registry.with(base.pretty().without_time()).try_init(),
        (TracingFormat::Compact, true) => registry.with(base.compact()).try_init(),
        (TracingFormat::Compact, false) => registry.with(base.compact().without_time()).try_init(),
        (TracingFormat::Json, true) => registry.with(base.json()).try_init(),
        (TracingFormat::Json, false) => registry.with(base.json().without_time()).try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Pretty);
        assert!(config.timestamps);
        assert!(config.target);
        assert!(config.level.is_none());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<TracingFormat>().unwrap(), TracingFormat::Json);
        assert_eq!(
            "compact".parse::<TracingFormat>().unwrap(),
            TracingFormat::Compact
        );
        assert!("xml".parse::<TracingFormat>().is_err());
    }
}
