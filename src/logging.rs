//! Tracing subscriber setup for the CLI.
//!
//! Pretty lines on stderr while developing, JSON in production. `LOG_OUTPUT=file`
//! sends records to `LOG_DIR` instead, rotated daily unless `LOG_ROTATION=never`.
//! `RUST_LOG` replaces the default filter entirely.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "timecard-generator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl LogOutput {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Daily,
    Never,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only read when `output` is `File`.
    pub log_dir: PathBuf,
    pub rotation: Rotation,
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self {
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            rotation: Rotation::Daily,
            production: false,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from `ENVIRONMENT`/`ENV`, `LOG_FORMAT`, `LOG_OUTPUT`,
    /// `LOG_DIR` and `LOG_ROTATION`. Unrecognised values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("ENVIRONMENT")
            .or_else(|| lookup("ENV"))
            .is_some_and(|name| matches!(name.as_str(), "production" | "prod"));

        let mut config = Self::development();
        if production {
            config.production = true;
            config.format = LogFormat::Json;
        }
        if let Some(format) = lookup("LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        if let Some(output) = lookup("LOG_OUTPUT").as_deref().and_then(LogOutput::parse) {
            config.output = output;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if lookup("LOG_ROTATION").is_some_and(|value| value.eq_ignore_ascii_case("never")) {
            config.rotation = Rotation::Never;
        }
        config
    }

    /// Directive used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> String {
        let level = if self.production { "info" } else { "debug" };
        format!("warn,timecard_generator={level}")
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        Ok(match self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File => {
                std::fs::create_dir_all(&self.log_dir).with_context(|| {
                    format!("failed to create log directory {}", self.log_dir.display())
                })?;
                let appender = match self.rotation {
                    Rotation::Daily => tracing_appender::rolling::daily(&self.log_dir, LOG_FILE_PREFIX),
                    Rotation::Never => tracing_appender::rolling::never(&self.log_dir, LOG_FILE_PREFIX),
                };
                tracing_appender::non_blocking(appender)
            }
        })
    }
}

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered records are flushed.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));
    let (writer, guard) = config.writer()?;
    let registry = tracing_subscriber::registry();

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(filter);
            registry.with(layer).try_init()?;
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(config.output != LogOutput::File)
                .with_filter(filter);
            registry.with(layer).try_init()?;
        }
    }

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        output = ?config.output,
        production = config.production,
        "logging initialized"
    );
    Ok(guard)
}

/// Span wrapping one full extraction run.
pub fn run_span(timecard: &str) -> tracing::Span {
    tracing::info_span!("timecard_run", timecard = timecard)
}

/// Span for one pipeline stage (grid, weeks, employees, ...).
pub fn stage_span(stage: &'static str) -> tracing::Span {
    tracing::debug_span!("stage", stage = stage)
}
