//! Tracing Infrastructure
//!
//! Structured logging for the library crates and the CLI, built on
//! `tracing-subscriber`:
//! - Multiple output formats (pretty, compact, JSON)
//! - Environment-based filtering (`RUST_LOG` wins over the configured level)
//! - Integration with [`AppConfig`]
//!
//! # Example
//! ```no_run
//! use daq_usb_serial::{config::AppConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! logging::init_from_config(&config)?;
//!
//! info!(vendor_id = 0x0403, "Device attached");
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Levels accepted in `application.log_level`, case-insensitively.
const LEVELS: [Level; 5] = [
    Level::TRACE,
    Level::DEBUG,
    Level::INFO,
    Level::WARN,
    Level::ERROR,
];

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line, coloured output for a terminal
    #[default]
    Pretty,
    /// One line per event, no colours
    Compact,
    /// Newline-delimited JSON objects
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Line layout
    pub format: OutputFormat,
    /// Emit span open/close events (handshake timing)
    pub span_events: bool,
    /// Include source file and line
    pub source_location: bool,
    /// Colours for the pretty format
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingConfig {
    /// Pretty output at `level`.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            format: OutputFormat::Pretty,
            span_events: false,
            source_location: true,
            ansi: true,
        }
    }

    /// Level and format from the `[application]` table.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, String> {
        let level = parse_log_level(&config.application.log_level)?;
        Ok(Self::new(level).with_format(config.application.log_format))
    }

    /// Set the line layout
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable span open/close events
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Enable or disable colours
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// `RUST_LOG` when set, otherwise the configured level.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy()
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            OutputFormat::Pretty => layer.pretty().with_ansi(self.ansi).boxed(),
            OutputFormat::Compact => layer.compact().with_ansi(false).boxed(),
            OutputFormat::Json => layer.json().boxed(),
        }
    }
}

/// Install the global subscriber described by the application config.
pub fn init_from_config(config: &AppConfig) -> Result<(), String> {
    init(LoggingConfig::from_app_config(config)?);
    Ok(())
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is kept, so tests and embedding applications can call this freely.
pub fn init(config: LoggingConfig) -> bool {
    let installed = tracing_subscriber::registry()
        .with(config.fmt_layer().with_filter(config.env_filter()))
        .try_init()
        .is_ok();
    if !installed {
        tracing::debug!("Global tracing subscriber already installed, keeping it");
    }
    installed
}

/// Parse a level name (`trace` through `error`, any case).
pub fn parse_log_level(name: &str) -> Result<Level, String> {
    LEVELS
        .into_iter()
        .find(|level| level.as_str().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                name
            )
        })
}
