use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub seq: u64,
    pub status: Status,
}

type StatusSink = Box<dyn FnMut(&Status)>;

/// Ordered record of status transitions. The UI shows the latest one.
#[derive(Default)]
pub struct StatusBus {
    events: Vec<StatusEvent>,
    next_seq: u64,
    sink: Option<StatusSink>,
}

impl std::fmt::Debug for StatusBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBus")
            .field("events", &self.events)
            .field("next_seq", &self.next_seq)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also hands every status to `sink` as it is emitted.
    pub fn with_sink(sink: impl FnMut(&Status) + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            ..Self::default()
        }
    }

    pub fn emit(&mut self, status: Status) {
        if status.is_error() {
            tracing::warn!(status = %status, "status");
        } else {
            tracing::info!(status = %status, "status");
        }
        if let Some(sink) = self.sink.as_mut() {
            sink(&status);
        }
        self.events.push(StatusEvent {
            seq: self.next_seq,
            status,
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    pub fn latest(&self) -> Option<&Status> {
        self.events.last().map(|e| &e.status)
    }

    pub fn drain(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.events)
    }
}
