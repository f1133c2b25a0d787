//! Shared test helpers: a listener that records every dispatched event.

use std::sync::{Arc, Mutex};

use vdm_core::{DownloadListener, EventKind, TaskSnapshot, TaskState};

/// One recorded callback with the snapshot data the assertion cares about.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub state: TaskState,
    pub percent: f32,
    pub speed: f32,
    pub download_size: u64,
    pub cur_segments: u32,
    pub accumulated_duration_ms: u64,
}

impl RecordedEvent {
    fn capture(kind: EventKind, task: &TaskSnapshot) -> Self {
        RecordedEvent {
            kind,
            state: task.state(),
            percent: task.percent(),
            speed: task.speed(),
            download_size: task.download_size(),
            cur_segments: task.cur_segments(),
            accumulated_duration_ms: task.accumulated_duration_ms(),
        }
    }
}

/// Listener that appends every callback to a shared log.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingListener::default())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event kinds in dispatch order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|e| e.kind == kind).count()
    }

    fn record(&self, kind: EventKind, task: &TaskSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::capture(kind, task));
    }
}

impl DownloadListener for RecordingListener {
    fn on_download_default(&self, task: &TaskSnapshot) {
        self.record(EventKind::Default, task);
    }
    fn on_download_pending(&self, task: &TaskSnapshot) {
        self.record(EventKind::Pending, task);
    }
    fn on_download_prepare(&self, task: &TaskSnapshot) {
        self.record(EventKind::Prepare, task);
    }
    fn on_download_start(&self, task: &TaskSnapshot) {
        self.record(EventKind::Start, task);
    }
    fn on_download_progress(&self, task: &TaskSnapshot) {
        self.record(EventKind::Progress, task);
    }
    fn on_download_speed(&self, task: &TaskSnapshot) {
        self.record(EventKind::Speed, task);
    }
    fn on_download_pause(&self, task: &TaskSnapshot) {
        self.record(EventKind::Pause, task);
    }
    fn on_download_error(&self, task: &TaskSnapshot) {
        self.record(EventKind::Error, task);
    }
    fn on_download_success(&self, task: &TaskSnapshot) {
        self.record(EventKind::Success, task);
    }
}
