//! Progress reporting (`spec.md` §4.8): a narrow `{jobCode, stage, percent}`
//! event emitted by the Phase Scheduler between phases.
//!
//! Grounded on `event_bus::sink::{EventSink, StdOutSink, MemorySink,
//! ChannelSink}` — same sink-per-destination shape, simplified to this
//! pipeline's one small event type instead of the teacher's general `Event`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// One progress update, emitted after each stage completes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub job_code: String,
    pub stage: u8,
    /// 0-100, `stage / 7 * 100` rounded to the nearest integer.
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(job_code: impl Into<String>, stage: u8) -> Self {
        let percent = ((stage as f64 / 7.0) * 100.0).round() as u8;
        Self { job_code: job_code.into(), stage, percent }
    }
}

/// Destination for [`ProgressEvent`]s. Implementations are allowed to
/// perform blocking I/O; the scheduler invokes `handle` from within a
/// `spawn_blocking`-free synchronous context between async stage awaits, so
/// sinks doing real I/O should keep it fast or buffer internally.
pub trait ProgressSink: Send + Sync {
    fn handle(&self, event: &ProgressEvent);
}

/// Logs each event via `tracing::info!`.
#[derive(Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn handle(&self, event: &ProgressEvent) {
        info!(job_code = %event.job_code, stage = event.stage, percent = event.percent, "stage complete");
    }
}

/// Captures every event in-process; used by tests and the demo CLI.
#[derive(Clone, Default)]
pub struct MemoryProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for MemoryProgressSink {
    fn handle(&self, event: &ProgressEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards each event to an async consumer over an unbounded `flume`
/// channel (`spec.md` §4.8's progress feed, over a protocol boundary such as
/// SSE or a WebSocket, the way `event_bus::sink::ChannelSink` forwards to
/// its own `flume::Sender`).
pub struct ChannelProgressSink {
    tx: flume::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: flume::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn handle(&self, event: &ProgressEvent) {
        // A disconnected receiver just means nobody is watching anymore;
        // dropping the event here matches the teacher's "log, don't fail
        // the run" treatment of a slow/closed sink.
        let _ = self.tx.send(event.clone());
    }
}

/// Fans one event out to every registered sink.
#[derive(Default)]
pub struct ProgressBroadcaster {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.sinks.push(sink);
    }

    pub fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.handle(&event);
        }
    }
}
