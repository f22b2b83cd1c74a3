//! Scrape-compatible log output.
//!
//! Existing log scraping expects `LEVEL:component-name:message` lines on
//! standard output, with `WARN` spelled out as `WARNING` and an optional
//! stack trace trailing a failure line. [`init`] installs a
//! `tracing-subscriber` that reproduces that format.

use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

struct ScrapeFormat;

impl<S, N> FormatEvent<S, N> for ScrapeFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = *event.metadata().level();
        let name = if level == Level::ERROR {
            "ERROR"
        } else if level == Level::WARN {
            "WARNING"
        } else if level == Level::INFO {
            "INFO"
        } else if level == Level::DEBUG {
            "DEBUG"
        } else {
            "TRACE"
        };

        write!(writer, "{}:{}:", name, event.metadata().target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the scrape-compatible subscriber on stdout.
///
/// Idempotent: a second call (or a subscriber installed elsewhere) leaves
/// the existing one in place.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .event_format(ScrapeFormat)
        .try_init();
}

/// Capture the current stack trace for appending to a failure log line.
pub(crate) fn backtrace() -> String {
    std::backtrace::Backtrace::force_capture().to_string()
}
