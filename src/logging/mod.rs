//! Structured logging configuration for configchecker
//!
//! The library itself only emits `tracing` events: a `debug` span per
//! validation pass, plus `trace` events for individual matches. Binaries and
//! tests that want to see them call [`init_logging`].

use std::str::FromStr;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Output destination (stdout, stderr, file)
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
    /// Include thread names
    pub include_thread_names: bool,
    /// Log every section and key match made by the validator
    pub trace_matching: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: false,
            include_thread_names: false,
            trace_matching: false,
        }
    }
}

impl LogConfig {
    /// Verbose, human-readable logging with every match traced
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: true,
            include_thread_names: true,
            trace_matching: true,
        }
    }

    /// Quiet JSON logging for services that validate configuration at startup
    pub fn production() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            file_path: None,
            include_source: false,
            include_thread_names: false,
            trace_matching: false,
        }
    }

    /// Load configuration from `CONFIGCHECKER_LOG_*` environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("CONFIGCHECKER_LOG_LEVEL") {
            if let Ok(parsed_level) = LogLevel::from_str(&level) {
                config.level = parsed_level;
            }
        }

        if let Some(format) = lookup("CONFIGCHECKER_LOG_FORMAT") {
            if let Ok(parsed_format) = LogFormat::from_str(&format) {
                config.format = parsed_format;
            }
        }

        if let Some(output) = lookup("CONFIGCHECKER_LOG_OUTPUT") {
            if let Ok(parsed_output) = LogOutput::from_str(&output) {
                config.output = parsed_output;
            }
        }

        if let Some(file_path) = lookup("CONFIGCHECKER_LOG_FILE") {
            config.file_path = Some(file_path);
        }

        if let Some(include_source) = lookup("CONFIGCHECKER_LOG_SOURCE") {
            config.include_source = include_source.to_lowercase() == "true";
        }

        if let Some(trace_matching) = lookup("CONFIGCHECKER_LOG_MATCHING") {
            config.trace_matching = trace_matching.to_lowercase() == "true";
        }

        config
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG`, when set, overrides the level filter. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = create_filter(config);

    let layer = match (&config.output, &config.file_path) {
        (LogOutput::Stdout, _) => create_layer(config, std::io::stdout),
        (LogOutput::Stderr, _) => create_layer(config, std::io::stderr),
        (LogOutput::File, Some(file_path)) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;
            create_layer(config, std::sync::Mutex::new(file))
        }
        (LogOutput::File, None) => {
            return Err("File path required for file output".into());
        }
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;

    info!("Logging initialized with config: {:?}", config);
    Ok(())
}

fn filter_directives(config: &LogConfig) -> String {
    let mut directives = format!("configchecker={}", config.level.as_str());

    if config.trace_matching {
        directives.push_str(",configchecker::config::validator=trace");
    }

    directives
}

fn create_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(config)))
}

fn create_layer<W>(config: &LogConfig, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(config.include_thread_names)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}

/// Initialize logging for tests; safe to call from many tests
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Debug,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            include_source: true,
            include_thread_names: false,
            trace_matching: true,
        };

        if let Err(e) = init_logging(&config) {
            eprintln!("Failed to initialize test logging: {}", e);
        }
    });
}
