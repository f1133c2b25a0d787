//! Listener contract and the multi-subscriber registry.
//!
//! One callback per semantic event; `progress` and `speed` may fire many
//! times while DOWNLOADING, the rest fire at most once per transition into
//! their state. Every callback receives a snapshot, never the live record,
//! and is never invoked while an engine lock is held — it is safe to call
//! back into the engine from inside a listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::task::TaskSnapshot;

/// The nine per-task download events, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Default,
    Pending,
    Prepare,
    Start,
    Progress,
    Speed,
    Pause,
    Error,
    Success,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Default => "default",
            EventKind::Pending => "pending",
            EventKind::Prepare => "prepare",
            EventKind::Start => "start",
            EventKind::Progress => "progress",
            EventKind::Speed => "speed",
            EventKind::Pause => "pause",
            EventKind::Error => "error",
            EventKind::Success => "success",
        }
    }
}

/// Observer of one task kind of event. All methods default to no-ops so
/// implementors subscribe only to what they need.
pub trait DownloadListener: Send + Sync {
    fn on_download_default(&self, _task: &TaskSnapshot) {}
    fn on_download_pending(&self, _task: &TaskSnapshot) {}
    fn on_download_prepare(&self, _task: &TaskSnapshot) {}
    fn on_download_start(&self, _task: &TaskSnapshot) {}
    fn on_download_progress(&self, _task: &TaskSnapshot) {}
    fn on_download_speed(&self, _task: &TaskSnapshot) {}
    fn on_download_pause(&self, _task: &TaskSnapshot) {}
    fn on_download_error(&self, _task: &TaskSnapshot) {}
    fn on_download_success(&self, _task: &TaskSnapshot) {}
}

/// Handle for unsubscribing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners, notified in registration order.
///
/// A plain list behind an RwLock: registration is rare, fan-out is hot.
/// The read guard is only held long enough to clone the Arcs, so a listener
/// may add/remove listeners from inside a callback.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: RwLock<Vec<(ListenerId, Arc<dyn DownloadListener>)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: Arc<dyn DownloadListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().unwrap().push((id, listener));
        id
    }

    /// Removes a listener; returns false if it was already gone.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|(lid, _)| *lid != id);
        entries.len() != before
    }

    pub(crate) fn notify(&self, kind: EventKind, snapshot: &TaskSnapshot) {
        let listeners: Vec<Arc<dyn DownloadListener>> = {
            let entries = self.entries.read().unwrap();
            entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            match kind {
                EventKind::Default => listener.on_download_default(snapshot),
                EventKind::Pending => listener.on_download_pending(snapshot),
                EventKind::Prepare => listener.on_download_prepare(snapshot),
                EventKind::Start => listener.on_download_start(snapshot),
                EventKind::Progress => listener.on_download_progress(snapshot),
                EventKind::Speed => listener.on_download_speed(snapshot),
                EventKind::Pause => listener.on_download_pause(snapshot),
                EventKind::Error => listener.on_download_error(snapshot),
                EventKind::Success => listener.on_download_success(snapshot),
            }
        }
    }
}
