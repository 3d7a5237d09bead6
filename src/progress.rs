// ABOUTME: Progress event protocol shared by the dump and restore engines
// ABOUTME: Defines the event shape, the sink trait, and the stock sink implementations

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Kind of a progress event. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Log,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Stage of a dump or restore run the event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Connecting,
    Schemas,
    Extensions,
    Enums,
    Sequences,
    Tables,
    Views,
    Functions,
    Triggers,
    Constraints,
    Data,
    Writing,
    Reading,
    Parsing,
    Cleaning,
    Restoring,
    Complete,
    Error,
}

/// Optional stage-specific counters attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements_executed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_statements: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_preview: Option<String>,
}

/// One update in the live feed of a dump or restore run
///
/// Serializes to the camelCase JSON shape the streaming transport forwards
/// verbatim, e.g. `{"type":"log","stage":"tables","icon":"📊",...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub stage: Stage,
    pub icon: &'static str,
    pub message: String,
    #[serde(rename = "logType")]
    pub severity: Severity,
    pub progress: u8,
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn log(stage: Stage, icon: &'static str, message: impl Into<String>, progress: u8) -> Self {
        Self {
            kind: EventKind::Log,
            stage,
            icon,
            message: message.into(),
            severity: Severity::Info,
            progress: progress.min(100),
            counters: Counters::default(),
            result: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>, rows_processed: u64) -> Self {
        self.counters.current_table = Some(table.into());
        self.counters.rows_processed = Some(rows_processed);
        self
    }

    pub fn with_statements(mut self, executed: usize, total: usize) -> Self {
        self.counters.statements_executed = Some(executed);
        self.counters.total_statements = Some(total);
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.counters.statement_preview = Some(preview.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Complete | EventKind::Error)
    }
}

/// Destination for progress events
///
/// Called inline with statement execution, so implementations must return
/// promptly: buffer or drop, never wait on a slow consumer.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards events to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event.severity {
            Severity::Error => tracing::error!("{} {}", event.icon, event.message),
            Severity::Warning => tracing::warn!("{} {}", event.icon, event.message),
            Severity::Info | Severity::Success => {
                tracing::info!("{} {}", event.icon, event.message)
            }
        }
    }
}

/// Pushes events into an unbounded channel; the receiver side is the transport
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A closed receiver means nobody is listening any more; the run goes on.
        let _ = self.tx.send(event);
    }
}

/// Per-run front end over a sink
///
/// Keeps progress monotonically non-decreasing and guarantees that at most one
/// terminal event is emitted; anything emitted after it is dropped.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    high_water: u8,
    finished: bool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            high_water: 0,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn emit(&mut self, mut event: ProgressEvent) {
        if self.finished {
            return;
        }
        event.progress = event.progress.max(self.high_water).min(100);
        self.high_water = event.progress;
        self.finished = event.is_terminal();
        self.sink.emit(event);
    }

    pub fn info(&mut self, stage: Stage, icon: &'static str, message: impl Into<String>, progress: u8) {
        self.emit(ProgressEvent::log(stage, icon, message, progress));
    }

    pub fn success(&mut self, stage: Stage, icon: &'static str, message: impl Into<String>, progress: u8) {
        self.emit(ProgressEvent::log(stage, icon, message, progress).with_severity(Severity::Success));
    }

    /// Warning at the current progress level
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let progress = self.high_water;
        self.emit(ProgressEvent::log(stage, "⚠️", message, progress).with_severity(Severity::Warning));
    }

    pub fn complete(&mut self, message: impl Into<String>, result: Option<serde_json::Value>) {
        let mut event = ProgressEvent::log(Stage::Complete, "🎉", message, 100)
            .with_severity(Severity::Success);
        event.kind = EventKind::Complete;
        event.result = result;
        self.emit(event);
    }

    /// Terminal failure event at the progress reached so far
    pub fn fail(&mut self, message: impl Into<String>) {
        let progress = self.high_water;
        let mut event =
            ProgressEvent::log(Stage::Error, "❌", message, progress).with_severity(Severity::Error);
        event.kind = EventKind::Error;
        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let sink = RecordingSink::new();
        let mut reporter = ProgressReporter::new(&sink);

        reporter.info(Stage::Tables, "📊", "tables", 40);
        reporter.info(Stage::Views, "👁", "views", 10);
        reporter.info(Stage::Data, "📦", "data", 60);

        let progress: Vec<u8> = sink.events().iter().map(|e| e.progress).collect();
        assert_eq!(progress, vec![40, 40, 60]);
    }

    #[test]
    fn test_nothing_after_terminal_event() {
        let sink = RecordingSink::new();
        let mut reporter = ProgressReporter::new(&sink);

        reporter.info(Stage::Connecting, "🔌", "connecting", 5);
        reporter.complete("done", None);
        reporter.info(Stage::Data, "📦", "late", 50);
        reporter.fail("late failure");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::Complete);
        assert_eq!(events[1].progress, 100);
        assert!(reporter.is_finished());
    }

    #[test]
    fn test_fail_is_terminal_error() {
        let sink = RecordingSink::new();
        let mut reporter = ProgressReporter::new(&sink);

        reporter.info(Stage::Reading, "📄", "reading", 10);
        reporter.fail("Backup file not found");

        let last = sink.events().pop().unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.message, "Backup file not found");
        assert_eq!(last.progress, 10);
        assert!(reporter.is_finished());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::log(Stage::Data, "📦", "Exporting public.t", 62)
            .with_table("public.t", 20);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "log");
        assert_eq!(json["stage"], "data");
        assert_eq!(json["logType"], "info");
        assert_eq!(json["currentTable"], "public.t");
        assert_eq!(json["rowsProcessed"], 20);
        assert!(json.get("statementPreview").is_none());
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn test_channel_sink_buffers_without_receiver_progress() {
        let (sink, mut rx) = ChannelSink::channel();
        for i in 0..10u8 {
            sink.emit(ProgressEvent::log(Stage::Restoring, "⚡", "tick", i));
        }
        drop(sink);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 10);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| seen.lock().unwrap().push(event.message);
        sink.emit(ProgressEvent::log(Stage::Parsing, "🔍", "parsed", 15));
        assert_eq!(seen.lock().unwrap().as_slice(), ["parsed"]);
    }
}
