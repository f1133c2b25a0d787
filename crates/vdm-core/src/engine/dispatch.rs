//! Per-task event queue: ordered, reentrant-safe listener fan-out.
//!
//! Events are enqueued while the record lock is held, which fixes their
//! order, and drained after it is released, so no callback ever runs under
//! an engine lock. A drain-in-progress flag collapses concurrent and
//! reentrant drains into the one already running.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::listener::{EventKind, ListenerRegistry};
use crate::task::TaskSnapshot;

#[derive(Default)]
pub(crate) struct EventQueue {
    queue: Mutex<VecDeque<(EventKind, TaskSnapshot)>>,
    draining: AtomicBool,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event. Call with the task's record lock held so events
    /// from concurrent mutators keep transition order.
    pub(crate) fn push(&self, kind: EventKind, snapshot: TaskSnapshot) {
        self.queue.lock().unwrap().push_back((kind, snapshot));
    }

    /// Deliver queued events in order. If a drain is already running on
    /// another (or an outer) frame, that drainer picks up our events and
    /// this call returns immediately.
    pub(crate) fn drain(&self, registry: &ListenerRegistry) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            loop {
                let next = self.queue.lock().unwrap().pop_front();
                match next {
                    Some((kind, snapshot)) => registry.notify(kind, &snapshot),
                    None => break,
                }
            }
            self.draining.store(false, Ordering::Release);
            // An event may have landed between the last pop and the flag
            // clear; reclaim the drain or leave it to whoever beat us.
            if self.queue.lock().unwrap().is_empty() {
                break;
            }
            if self.draining.swap(true, Ordering::AcqRel) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::DownloadListener;
    use crate::task::TaskRecord;
    use std::sync::{Arc, Mutex as StdMutex};

    struct Recorder {
        seen: Arc<StdMutex<Vec<EventKind>>>,
    }

    impl DownloadListener for Recorder {
        fn on_download_pending(&self, _t: &TaskSnapshot) {
            self.seen.lock().unwrap().push(EventKind::Pending);
        }
        fn on_download_progress(&self, _t: &TaskSnapshot) {
            self.seen.lock().unwrap().push(EventKind::Progress);
        }
        fn on_download_pause(&self, _t: &TaskSnapshot) {
            self.seen.lock().unwrap().push(EventKind::Pause);
        }
    }

    #[test]
    fn events_delivered_in_push_order() {
        let queue = EventQueue::new();
        let registry = ListenerRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        registry.add(Arc::new(Recorder { seen: Arc::clone(&seen) }));

        let snap = TaskRecord::new("http://x/a.mp4").snapshot();
        queue.push(EventKind::Pending, snap.clone());
        queue.push(EventKind::Progress, snap.clone());
        queue.push(EventKind::Pause, snap);
        queue.drain(&registry);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::Pending, EventKind::Progress, EventKind::Pause]
        );
    }

    struct Reentrant {
        queue: Arc<EventQueue>,
        fired: Arc<StdMutex<Vec<EventKind>>>,
    }

    impl DownloadListener for Reentrant {
        fn on_download_pending(&self, task: &TaskSnapshot) {
            self.fired.lock().unwrap().push(EventKind::Pending);
            // Push-and-drain from inside the callback; the outer drain
            // must deliver it after this callback returns.
            self.queue.push(EventKind::Progress, task.clone());
            // No registry available here in the test; the outer drain loop
            // picks the event up.
        }
        fn on_download_progress(&self, _t: &TaskSnapshot) {
            self.fired.lock().unwrap().push(EventKind::Progress);
        }
    }

    #[test]
    fn reentrant_push_is_picked_up_by_outer_drain() {
        let queue = Arc::new(EventQueue::new());
        let registry = ListenerRegistry::new();
        let fired = Arc::new(StdMutex::new(Vec::new()));
        registry.add(Arc::new(Reentrant {
            queue: Arc::clone(&queue),
            fired: Arc::clone(&fired),
        }));

        queue.push(EventKind::Pending, TaskRecord::new("http://x/a.mp4").snapshot());
        queue.drain(&registry);

        assert_eq!(
            *fired.lock().unwrap(),
            vec![EventKind::Pending, EventKind::Progress]
        );
    }
}
