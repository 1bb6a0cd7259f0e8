//! Log output setup
// (c) 2026 Ross Younger

use std::fmt;
use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use strum::VariantNames as _;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc, FormatTime};
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Filter for console output
const CONSOLE_FILTER_VAR: &str = "RUST_LOG";
/// Filter for the log file, if different
const FILE_FILTER_VAR: &str = "RUST_LOG_FILE_DETAIL";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Selects the format of time stamps in log output
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TimeFormat {
    /// Local time, as "year-month-day HH:MM:SS"
    #[default]
    Local,
    /// UTC, as "year-month-day HH:MM:SS"
    Utc,
    /// Local time in [RFC 3339](https://datatracker.ietf.org/doc/html/rfc3339) format
    Rfc3339,
}

impl TryFrom<String> for TimeFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(|_| {
            format!(
                "unknown time format {value}; expected one of {}",
                TimeFormat::VARIANTS.join(", ")
            )
        })
    }
}

/// The timer for one [`TimeFormat`]
enum Timer {
    Local(ChronoLocal),
    Utc(ChronoUtc),
}

impl From<TimeFormat> for Timer {
    fn from(value: TimeFormat) -> Self {
        match value {
            TimeFormat::Local => Timer::Local(ChronoLocal::new("%Y-%m-%d %H:%M:%SL".into())),
            TimeFormat::Utc => Timer::Utc(ChronoUtc::new("%Y-%m-%d %H:%M:%SZ".into())),
            TimeFormat::Rfc3339 => Timer::Local(ChronoLocal::rfc_3339()),
        }
    }
}

impl FormatTime for Timer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match self {
            Timer::Local(t) => t.format_time(w),
            Timer::Utc(t) => t.format_time(w),
        }
    }
}

/// Where console output goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleTraceType {
    /// Log to stderr
    Standard,
    /// No console output
    None,
}

/// Reads a filter from the environment, if set there.
/// Otherwise we log only our own events, at `level`.
///
/// The flag is true if the environment was used; in that case other crates' events
/// may be included, so the target is worth showing.
fn filter_for(level: &str, var: &str) -> anyhow::Result<(EnvFilter, bool)> {
    if std::env::var_os(var).is_some() {
        let filter = EnvFilter::try_from_env(var)
            .with_context(|| format!("{var} (set in environment) was not understood"))?;
        return Ok((filter, true));
    }
    let filter = EnvFilter::try_new(format!("bleft={level}"))
        .with_context(|| format!("invalid trace level {level}"))?;
    Ok((filter, false))
}

fn layer<W>(
    writer: W,
    (filter, show_target): (EnvFilter, bool),
    time_format: TimeFormat,
    ansi: bool,
) -> BoxedLayer
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_target(show_target)
        .with_ansi(ansi)
        .with_timer(Timer::from(time_format))
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

fn build_layers(
    level: &str,
    display: ConsoleTraceType,
    log_file: Option<&str>,
    time_format: TimeFormat,
    ansi: bool,
) -> anyhow::Result<Vec<BoxedLayer>> {
    let mut layers = Vec::new();
    if display == ConsoleTraceType::Standard {
        let filter = filter_for(level, CONSOLE_FILTER_VAR)?;
        layers.push(layer(std::io::stderr, filter, time_format, ansi));
    }
    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("could not open log file {path}"))?;
        let filter = if std::env::var_os(FILE_FILTER_VAR).is_some() {
            filter_for(level, FILE_FILTER_VAR)?
        } else {
            filter_for(level, CONSOLE_FILTER_VAR)?
        };
        layers.push(layer(Arc::new(file), filter, time_format, false));
    }
    Ok(layers)
}

/// Sets up log output to the console and, optionally, to a file.
///
/// By default only this crate's events are logged, at `level`. Setting `RUST_LOG` overrides that;
/// `RUST_LOG_FILE_DETAIL` overrides it for the log file alone.
///
/// This takes effect once per process. Later calls log a warning and return `Ok`.
/// If it fails, nothing has been set up, so the caller must report the error some other way.
pub fn setup(
    level: &str,
    display: ConsoleTraceType,
    log_file: Option<&str>,
    time_format: TimeFormat,
    ansi: bool,
) -> anyhow::Result<()> {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        tracing::warn!("tracing setup called again (ignoring)");
        return Ok(());
    }
    match build_layers(level, display, log_file, time_format, ansi) {
        Ok(layers) => {
            tracing_subscriber::registry().with(layers).init();
            Ok(())
        }
        Err(e) => {
            INITIALIZED.store(false, Ordering::Release);
            Err(e)
        }
    }
}

/// Has [`setup`] been called successfully?
#[must_use]
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}
