//! Pushcast logging setup.
//!
//! Installs a global `tracing` subscriber that writes to stderr and,
//! optionally, appends the same events to a log file.
//!
//! # Environment Variables
//!
//! - `PUSHCAST_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PUSHCAST_LOG_FORMAT=json|pretty|compact|plain` - Set output format
//! - `PUSHCAST_LOG_COLOR=1|0` - Enable/disable colors on stderr
//! - `RUST_LOG` - Full `EnvFilter` directive, overrides the level
//!
//! # Usage
//!
//! ```no_run
//! use pushcast_log::LogSettings;
//!
//! let settings = LogSettings::from_env(true).file("pushcast.log");
//! let _guards = settings.init().expect("logging");
//! tracing::info!(port = 5001, "server starting");
//! ```

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Number of leading token characters kept by [`redact`].
pub const REDACT_PREFIX_LEN: usize = 20;

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON, one object per line
    Json,
    /// Multi-line pretty output for development
    Pretty,
    /// Compact single-line format
    Compact,
    /// Default `tracing_subscriber` text format
    Plain,
}

impl Format {
    /// Get format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "plain" | "text" => Some(Format::Plain),
            _ => None,
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be opened for appending.
    #[error("Failed to open log file {path}: {source}")]
    File {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A global subscriber was already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Minimum level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format for both sinks
    pub format: Format,
    /// ANSI colors on stderr
    pub color: bool,
    /// Include the event target (module path)
    pub targets: bool,
    /// Optional file that receives a copy of every event
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Plain,
            color: false,
            targets: true,
            file: None,
        }
    }
}

impl LogSettings {
    /// Build settings from the process environment.
    ///
    /// `debug` is the server's debug flag; it lowers the default level to
    /// `debug` unless `PUSHCAST_LOG_LEVEL` says otherwise.
    pub fn from_env(debug: bool) -> Self {
        Self::from_lookup(debug, |key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(debug: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup("PUSHCAST_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("PUSHCAST_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Plain);

        let color = lookup("PUSHCAST_LOG_COLOR")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            level,
            format,
            color,
            targets: true,
            file: None,
        }
    }

    /// Also append events to `path`.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set the level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Install the global subscriber.
    ///
    /// The returned guards flush buffered output when dropped and must be
    /// held for the lifetime of the process.
    pub fn init(self) -> Result<Vec<WorkerGuard>, LogError> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));

        let mut guards = Vec::with_capacity(2);
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::with_capacity(2);

        let (stderr, guard) = tracing_appender::non_blocking(io::stderr());
        layers.push(self.layer(stderr, self.color));
        guards.push(guard);

        if let Some(path) = &self.file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogError::File {
                    path: path.clone(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            layers.push(self.layer(writer, false));
            guards.push(guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        Ok(guards)
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
    where
        W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
    {
        match self.format {
            Format::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(self.targets)
                .boxed(),
            Format::Pretty => fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(self.targets)
                .with_ansi(ansi)
                .boxed(),
            Format::Compact => fmt::layer()
                .compact()
                .with_writer(writer)
                .with_target(self.targets)
                .with_ansi(ansi)
                .boxed(),
            Format::Plain => fmt::layer()
                .with_writer(writer)
                .with_target(self.targets)
                .with_ansi(ansi)
                .boxed(),
        }
    }
}

/// Shorten a device token for log output.
///
/// Keeps the first [`REDACT_PREFIX_LEN`] characters and appends `...`.
pub fn redact(token: &str) -> String {
    match token.char_indices().nth(REDACT_PREFIX_LEN) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => format!("{token}..."),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("Pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("compact"), Some(Format::Compact));
        assert_eq!(Format::parse("text"), Some(Format::Plain));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_debug_flag_lowers_default_level() {
        assert_eq!(LogSettings::from_lookup(true, lookup(&[])).level, Level::Debug);
        assert_eq!(LogSettings::from_lookup(false, lookup(&[])).level, Level::Info);
    }

    #[test]
    fn test_explicit_level_wins_over_debug_flag() {
        let settings = LogSettings::from_lookup(true, lookup(&[("PUSHCAST_LOG_LEVEL", "warn")]));
        assert_eq!(settings.level, Level::Warn);
    }

    #[test]
    fn test_format_and_color_from_lookup() {
        let settings = LogSettings::from_lookup(
            false,
            lookup(&[("PUSHCAST_LOG_FORMAT", "json"), ("PUSHCAST_LOG_COLOR", "0")]),
        );
        assert_eq!(settings.format, Format::Json);
        assert!(!settings.color);

        let settings = LogSettings::from_lookup(false, lookup(&[("TERM", "xterm")]));
        assert!(settings.color);

        let settings = LogSettings::from_lookup(false, lookup(&[("TERM", "xterm"), ("NO_COLOR", "1")]));
        assert!(!settings.color);
    }

    #[test]
    fn test_unopenable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings::default().file(dir.path());

        match settings.init() {
            Err(LogError::File { path, .. }) => assert_eq!(path, dir.path()),
            Err(other) => panic!("expected file error, got {other}"),
            Ok(_) => panic!("expected file error"),
        }
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("short"), "short...");
        assert_eq!(redact("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmnopqrst...");
        assert_eq!(redact("ééééééééééééééééééééé"), "éééééééééééééééééééé...");
    }
}
