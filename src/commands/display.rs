// ABOUTME: Terminal renderers for the progress event stream
// ABOUTME: An indicatif progress bar for humans and JSON lines for scripts

use crate::progress::{ProgressEvent, ProgressSink, Severity};
use indicatif::{ProgressBar, ProgressStyle};

/// Draws events on a 0-100 progress bar; warnings and errors go through tracing
pub struct TerminalSink {
    bar: ProgressBar,
}

impl TerminalSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        Self { bar }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalSink {
    fn emit(&self, event: ProgressEvent) {
        self.bar.set_position(u64::from(event.progress));

        match event.severity {
            Severity::Warning => self
                .bar
                .suspend(|| tracing::warn!("{} {}", event.icon, event.message)),
            Severity::Error => self
                .bar
                .suspend(|| tracing::error!("{} {}", event.icon, event.message)),
            Severity::Info | Severity::Success => {
                tracing::debug!("{} {}", event.icon, event.message)
            }
        }

        let message = match &event.counters.current_table {
            Some(table) => format!(
                "{} {} ({} rows)",
                event.icon,
                table,
                event.counters.rows_processed.unwrap_or(0)
            ),
            None => format!("{} {}", event.icon, event.message),
        };

        if event.is_terminal() {
            self.bar.finish_with_message(message);
        } else {
            self.bar.set_message(message);
        }
    }
}

/// Prints every event as one JSON object per line on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

impl ProgressSink for JsonLinesSink {
    fn emit(&self, event: ProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Could not serialize progress event: {}", e),
        }
    }
}

/// Pick the renderer for a run
pub fn sink_for(json: bool) -> Box<dyn ProgressSink> {
    if json {
        Box::new(JsonLinesSink)
    } else {
        Box::new(TerminalSink::new())
    }
}
