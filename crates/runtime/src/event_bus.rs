use serde::Serialize;

use crate::frame::Frame;

/// What happened. Serialized in `snake_case` for the host's debug tooling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Lifecycle,
    Select,
    Deselect,
    FocusStart,
    FocusEnd,
    Resize,
    Error,
}

/// One traced viewer event, stamped with the frame it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub frame_index: u64,
    pub kind: EventKind,
    pub message: String,
}

/// Bounded in-memory event log.
///
/// When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBus {
    events: Vec<Event>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn emit(&mut self, frame_index: u64, kind: EventKind, message: impl Into<String>) {
        if self.events.len() == self.capacity {
            self.events.remove(0);
        }
        self.events.push(Event {
            frame_index,
            kind,
            message: message.into(),
        });
    }

    pub fn emit_in(&mut self, frame: Frame, kind: EventKind, message: impl Into<String>) {
        self.emit(frame.index, kind, message);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
