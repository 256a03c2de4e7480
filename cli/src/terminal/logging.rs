use std::fmt;

use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use whodis_common::logging::SUCCESS_TARGET;

/// Target of plain program output, written without a status prefix.
pub const PRINT_TARGET: &str = "whodis::print";

pub struct WhodisFormatter;

impl<S, N> FormatEvent<S, N> for WhodisFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        if meta.target() == PRINT_TARGET {
            let mut raw = RawMessage::default();
            event.record(&mut raw);
            return writeln!(writer, "{}", raw.0.unwrap_or_default());
        }

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
            if meta.target() == SUCCESS_TARGET {
                ("[+]", |s| s.green().bold())
            } else {
                match *meta.level() {
                    Level::TRACE => ("[ ]", |s| s.dimmed()),
                    Level::DEBUG => ("[?]", |s| s.blue()),
                    Level::INFO => ("[*]", |s| s.bright_blue().bold()),
                    Level::WARN => ("[!]", |s| s.yellow().bold()),
                    Level::ERROR => ("[-]", |s| s.red().bold()),
                }
            };

        write!(writer, "{} ", color_func(symbol.into()))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[derive(Default)]
struct RawMessage(Option<String>);

impl Visit for RawMessage {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "raw_msg" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "raw_msg" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

/// Installs the terminal subscriber. `RUST_LOG` overrides the level, never the output.
///
/// With `machine_output` everything goes to stderr so stdout carries only the result.
pub fn init(quiet: bool, machine_output: bool) -> anyhow::Result<()> {
    let default_level = if quiet { "warn" } else { "info" };
    let print_directive: Directive = format!("{PRINT_TARGET}=info").parse()?;
    let success_directive: Directive = format!("{SUCCESS_TARGET}=info").parse()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level))
        .add_directive(print_directive)
        .add_directive(success_directive);

    let indicatif_layer = IndicatifLayer::new();
    let writer = if machine_output {
        BoxMakeWriter::new(indicatif_layer.get_stderr_writer())
    } else {
        BoxMakeWriter::new(indicatif_layer.get_stdout_writer())
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(WhodisFormatter)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(indicatif_layer)
        .try_init()?;
    Ok(())
}
