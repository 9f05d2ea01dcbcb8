//! Structured logging setup.
//!
//! All components emit `tracing` events with structured fields (`request_id`,
//! `operation_id`, `status`, `duration_us`, ...). This module installs the
//! subscriber: an [`EnvFilter`], a [`SamplingLayer`] that thins out routine events,
//! and a JSON or pretty fmt layer writing to stdout, optionally through a
//! `tracing-appender` non-blocking writer.
//!
//! ## Environment Variables
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `SCHEMAGATE_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `SCHEMAGATE_LOG_FORMAT` | json/pretty | `json` |
//! | `SCHEMAGATE_LOG_SAMPLING_MODE` | all/error-only/sampled | `all` |
//! | `SCHEMAGATE_LOG_SAMPLING_RATE` | 0.0-1.0 | `0.1` |
//! | `SCHEMAGATE_LOG_ASYNC` | true/false | `true` |
//! | `SCHEMAGATE_LOG_TARGET_FILTER` | comma-separated directives | unset |
//! | `SCHEMAGATE_LOG_INCLUDE_LOCATION` | true/false | `false` |
//!
//! `RUST_LOG`, when set, takes precedence over `SCHEMAGATE_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Everything the filter lets through
    All,
    /// Only WARN and ERROR
    ErrorOnly,
    /// Every WARN/ERROR plus a fraction of the rest
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction (0.0-1.0) of non-error events kept in [`SamplingMode::Sampled`]
    pub sampling_rate: f64,
    pub async_logging: bool,
    /// Extra `EnvFilter` directives, comma-separated
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 0.1,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `SCHEMAGATE_LOG_*` from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparseable keys keep defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("SCHEMAGATE_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("SCHEMAGATE_LOG_FORMAT")
                .map_or(defaults.format, |s| LogFormat::parse(&s)),
            sampling_mode: lookup("SCHEMAGATE_LOG_SAMPLING_MODE")
                .map_or(defaults.sampling_mode, |s| SamplingMode::parse(&s)),
            sampling_rate: parsed(&lookup, "SCHEMAGATE_LOG_SAMPLING_RATE")
                .unwrap_or(defaults.sampling_rate),
            async_logging: parsed(&lookup, "SCHEMAGATE_LOG_ASYNC").unwrap_or(defaults.async_logging),
            target_filter: lookup("SCHEMAGATE_LOG_TARGET_FILTER"),
            include_location: parsed(&lookup, "SCHEMAGATE_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }
}

/// Drops events according to a [`SamplingMode`]
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, metadata: &Metadata<'_>) -> bool {
        let important = matches!(*metadata.level(), Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important || metadata.is_span() {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let interval = ((1.0 / self.sampling_rate) as u64).max(1);
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        self.should_sample(metadata)
    }
}

/// Keeps the non-blocking writer flushing; drop it on shutdown.
#[must_use = "dropping the guard stops asynchronous log output"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // connection-level noise from the HTTP server
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }

    if let Some(target_filter) = &config.target_filter {
        for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
            }
        }
    }
    filter
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let (writer, worker) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}

/// [`init_logging_with_config`] with [`LogConfig::from_env`]
///
/// # Errors
///
/// See [`init_logging_with_config`].
pub fn init_logging() -> Result<LoggingGuard> {
    init_logging_with_config(&LogConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestCallsite;
    impl tracing::callsite::Callsite for TestCallsite {
        fn set_interest(&self, _interest: tracing::subscriber::Interest) {}
        fn metadata(&self) -> &Metadata<'_> {
            panic!("not used in tests")
        }
    }
    static CALLSITE: TestCallsite = TestCallsite;

    fn event(level: Level) -> Metadata<'static> {
        Metadata::new(
            "test",
            "schemagate::test",
            level,
            None,
            None,
            None,
            tracing::field::FieldSet::new(&[], tracing::callsite::Identifier(&CALLSITE)),
            tracing::metadata::Kind::EVENT,
        )
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SCHEMAGATE_LOG_LEVEL", "debug"),
            ("SCHEMAGATE_LOG_FORMAT", "PRETTY"),
            ("SCHEMAGATE_LOG_SAMPLING_MODE", "error_only"),
            ("SCHEMAGATE_LOG_SAMPLING_RATE", "0.5"),
            ("SCHEMAGATE_LOG_ASYNC", "false"),
            ("SCHEMAGATE_LOG_TARGET_FILTER", "schemagate::dispatcher=trace"),
            ("SCHEMAGATE_LOG_INCLUDE_LOCATION", " true "),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.sampling_mode, SamplingMode::ErrorOnly);
        assert_eq!(config.sampling_rate, 0.5);
        assert!(!config.async_logging);
        assert!(config.include_location);
        assert_eq!(
            config.target_filter.as_deref(),
            Some("schemagate::dispatcher=trace")
        );
    }

    #[test]
    fn test_from_lookup_defaults_on_garbage() {
        let config = LogConfig::from_lookup(|k| match k {
            "SCHEMAGATE_LOG_ASYNC" => Some("maybe".to_string()),
            "SCHEMAGATE_LOG_SAMPLING_RATE" => Some("lots".to_string()),
            _ => None,
        });
        assert!(config.async_logging);
        assert_eq!(config.sampling_rate, 0.1);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.sampling_mode, SamplingMode::All);
    }

    #[test]
    fn test_error_only_mode() {
        let layer = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(!layer.should_sample(&event(Level::INFO)));
        assert!(layer.should_sample(&event(Level::WARN)));
        assert!(layer.should_sample(&event(Level::ERROR)));
    }

    #[test]
    fn test_sampled_mode_keeps_every_error_and_a_fraction_of_info() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, 0.25);
        assert!((0..50).all(|_| layer.should_sample(&event(Level::ERROR))));
        let kept = (0..100)
            .filter(|_| layer.should_sample(&event(Level::INFO)))
            .count();
        assert_eq!(kept, 25);
    }

    #[test]
    fn test_zero_rate_drops_routine_events() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, -1.0);
        assert!(!layer.should_sample(&event(Level::DEBUG)));
        assert!(layer.should_sample(&event(Level::ERROR)));
    }
}
