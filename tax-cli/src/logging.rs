//! Subscriber setup for `tax-accrual`.
//!
//! Events go to stderr, coloured only on a terminal, so stdout carries
//! nothing but reports. With `[logging] file` set, the same events are also
//! appended to that file without colour.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

/// `<local time> <LEVEL> <module>: <fields>`.
struct AccrualFormat;

fn level_style(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "1;31",
        Level::WARN => "1;33",
        Level::INFO => "1;32",
        Level::DEBUG => "1;34",
        Level::TRACE => "1;35",
    }
}

/// Writes `text` and a trailing space, wrapped in `style` when ANSI is on.
fn styled(
    writer: &mut Writer<'_>,
    style: &str,
    text: impl Display,
) -> std::fmt::Result {
    if writer.has_ansi_escapes() {
        write!(writer, "\x1b[{style}m{text}\x1b[0m ")
    } else {
        write!(writer, "{text} ")
    }
}

impl<S, N> FormatEvent<S, N> for AccrualFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        styled(
            &mut writer,
            "2",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        )?;
        styled(
            &mut writer,
            level_style(meta.level()),
            format_args!("{:>5}", meta.level()),
        )?;
        styled(&mut writer, "36", format_args!("{}:", meta.target()))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `RUST_LOG` when set, otherwise `configured`, otherwise `info`.
pub fn make_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Opens `path` for appending, creating it if needed. The directory must
/// already exist.
pub fn open_log_file(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Installs the global subscriber. Call once at startup; later calls are
/// ignored.
///
/// A log file that cannot be opened is reported as a warning on stderr and
/// file logging is skipped.
pub fn init_logging(config: &LoggingConfig) {
    let (file, file_error) = match config.file.as_deref().map(open_log_file) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(error)) => (None, Some(error)),
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(AccrualFormat)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());

    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .event_format(AccrualFormat)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(make_filter(&config.level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some(error) = file_error {
        warn!(error = %format!("{error:#}"), "file logging disabled");
    }
}
