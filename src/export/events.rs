use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Lifecycle signal sent to whoever orchestrates the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExportEvent {
    /// The exporter for a page is initialized; sent once
    EngineReady,
    ExportStart,
    /// One human-readable progress line
    Log { message: String },
    ExportDone { file_name: String, location: String },
    ExportError { message: String },
}

impl ExportEvent {
    pub fn log(message: impl Into<String>) -> Self {
        ExportEvent::Log {
            message: message.into(),
        }
    }

    /// Whether the event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportEvent::ExportDone { .. } | ExportEvent::ExportError { .. })
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

/// Forwards events to the `log` facade only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: ExportEvent) {
        match &event {
            ExportEvent::Log { .. } => {}
            ExportEvent::ExportError { message } => log::error!("export_error: {}", message),
            other => log::debug!("{:?}", other),
        }
    }
}

/// Sends events down an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ExportEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ExportEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event receiver dropped");
        }
    }
}

/// Events kept by a [`RecordingSink`] before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Buffers the most recent events until they are read
#[derive(Debug)]
pub struct RecordingSink {
    events: Mutex<VecDeque<ExportEvent>>,
    capacity: usize,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl RecordingSink {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn events(&self) -> Vec<ExportEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Take every buffered event
    pub fn drain(&self) -> Vec<ExportEvent> {
        self.events.lock().drain(..).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ExportEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}
