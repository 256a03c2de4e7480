use std::time::Duration;

use indicatif::ProgressStyle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use whodis_core::discovery::ScanPhase;

const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
    "▁▁▁▁▁",
];

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICK_STRINGS)
}

/// Mirrors scan phases onto the progress bar of `span` until the scan settles.
pub fn follow_phases(span: Span, mut phases: watch::Receiver<ScanPhase>) -> JoinHandle<()> {
    span.pb_set_style(&spinner_style());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            let phase = *phases.borrow_and_update();
            span.pb_set_message(&format!("{phase}..."));
            if matches!(phase, ScanPhase::Done | ScanPhase::Error) {
                break;
            }
            tokio::select! {
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => span.pb_tick(),
            }
        }
    })
}
