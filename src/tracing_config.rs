//! Tracing configuration for the binaries
//!
//! Library code only emits events and spans. The CLI and the server install a
//! subscriber through [`TracingConfig`] at startup.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output without colors, for CI and log files
    Compact,
    /// JSON structured logging for the server in production
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,

    /// Output format
    pub format: TracingFormat,

    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,

    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for request correlation
    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Filter from explicit directives, then `RUST_LOG`, then verbosity
    ///
    /// # Errors
    /// - Invalid filter directive
    #[cfg(feature = "cli")]
    pub fn filter(&self) -> anyhow::Result<EnvFilter> {
        let filter = match self.env_filter.as_deref() {
            Some(directives) => EnvFilter::try_new(directives)?,
            None => EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(self.verbosity_to_filter()))?,
        };
        Ok(filter)
    }

    /// Install the global subscriber, writing to stderr
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        let registry = Registry::default().with(self.filter()?);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        match self.format {
            TracingFormat::Console => registry.with(layer.with_ansi(true).compact()).try_init()?,
            TracingFormat::Compact => registry.with(layer.with_ansi(false).compact()).try_init()?,
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => registry
                .with(layer.json().with_current_span(true).with_span_list(true))
                .try_init()?,
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Session started");
        }
        Ok(())
    }
}

/// Install the subscriber for a binary, tagged with a fresh session id
///
/// `log_filter` takes precedence over `RUST_LOG` and `verbosity`.
///
/// # Errors
/// - Any failure reported by [`TracingConfig::init`]
#[cfg(feature = "cli")]
pub fn init_cli_tracing(
    verbosity: u8,
    log_filter: Option<&str>,
    format: TracingFormat,
) -> anyhow::Result<()> {
    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_session_id(uuid::Uuid::new_v4().to_string());
    if let Some(directives) = log_filter {
        config = config.with_env_filter(directives);
    }
    config.init()
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span for one input file in the CLI
    pub fn file_processing(file_path: &std::path::Path) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            file_path = %file_path.display()
        )
    }

    /// Span for a CLI batch
    pub fn batch_processing(file_count: usize) -> Span {
        tracing::span!(Level::INFO, "batch_processing", file_count = %file_count)
    }

    /// Span for one HTTP segmentation request
    pub fn segment_request(request_id: &str) -> Span {
        tracing::span!(Level::INFO, "segment_request", request_id = %request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(TracingConfig::new().with_verbosity(0).verbosity_to_filter(), "info");
        assert_eq!(TracingConfig::new().with_verbosity(1).verbosity_to_filter(), "debug");
        assert_eq!(TracingConfig::new().with_verbosity(2).verbosity_to_filter(), "trace");
        assert_eq!(TracingConfig::new().with_verbosity(10).verbosity_to_filter(), "trace");
    }

    #[test]
    fn test_config_builder() {
        let config = TracingConfig::new()
            .with_verbosity(2)
            .with_format(TracingFormat::Compact)
            .with_env_filter("bgcutout=debug")
            .with_session_id("test-session");

        assert_eq!(config.verbosity, 2);
        assert_eq!(config.format, TracingFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("bgcutout=debug"));
        assert_eq!(config.session_id.as_deref(), Some("test-session"));
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.format, TracingFormat::Console);
        assert!(config.env_filter.is_none());
        assert!(config.session_id.is_none());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_explicit_filter_is_parsed() {
        let config = TracingConfig::new().with_env_filter("bgcutout=debug,tower_http=info");
        assert!(config.filter().is_ok());

        let config = TracingConfig::new().with_env_filter("bgcutout=loud");
        assert!(config.filter().is_err());
    }

    #[test]
    fn test_spans_are_constructible() {
        let _ = spans::file_processing(std::path::Path::new("a.png"));
        let _ = spans::batch_processing(3);
        let _ = spans::segment_request("abc");
    }
}
