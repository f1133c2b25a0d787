//! The download engine: keyed task registry and the command surface.
//!
//! Tasks live in a map from engine-assigned id to a slot holding the record
//! behind its per-task mutex (the exclusive region commands and the
//! transport worker serialize through), the slot's event queue, and the
//! run/pause/cancel directive toward the transport. Listeners only ever see
//! snapshots, delivered per task in transition order.

mod dispatch;
mod report;

pub use report::TaskHandle;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::listener::{DownloadListener, EventKind, ListenerId, ListenerRegistry};
use crate::task::{TaskId, TaskRecord, TaskSnapshot, TaskState, VideoKind};

use self::dispatch::EventQueue;

/// Parameters for [`DownloadEngine::create`]. Only the URL is required.
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub url: String,
    pub cover_url: String,
    pub title: String,
    pub group_name: String,
    /// Format, when the caller already knows it (e.g. from the sniffer that
    /// produced the download offer). Refined later from the content type.
    pub kind: VideoKind,
    /// Selects duration-based progress accounting.
    pub is_live: bool,
}

impl CreateTask {
    pub fn new(url: impl Into<String>) -> Self {
        CreateTask {
            url: url.into(),
            ..Default::default()
        }
    }
}

pub(crate) struct TaskSlot {
    pub(crate) id: TaskId,
    pub(crate) record: Mutex<TaskRecord>,
    pub(crate) events: EventQueue,
    pub(crate) directive: watch::Sender<crate::transport::RunDirective>,
    pub(crate) canceled: AtomicBool,
}

impl TaskSlot {
    fn new(id: TaskId, record: TaskRecord) -> Self {
        let (directive, _) = watch::channel(crate::transport::RunDirective::Run);
        TaskSlot {
            id,
            record: Mutex::new(record),
            events: EventQueue::new(),
            directive,
            canceled: AtomicBool::new(false),
        }
    }

    /// Updates the directive unless cancel has been latched; cancel wins.
    fn set_directive(&self, directive: crate::transport::RunDirective) {
        if self.canceled.load(Ordering::Acquire) {
            return;
        }
        self.directive.send_replace(directive);
    }
}

pub(crate) struct EngineInner {
    pub(crate) tasks: RwLock<HashMap<TaskId, Arc<TaskSlot>>>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) config: EngineConfig,
    next_id: AtomicU64,
}

impl EngineInner {
    /// Number of tasks a worker is actively driving (PREPARE/DOWNLOADING),
    /// excluding `skip`. Advisory: the gate in `TaskHandle::preparing` is
    /// checked before the record lock is taken, so two workers racing the
    /// last slot may briefly both pass.
    pub(crate) fn active_downloads(&self, skip: Option<TaskId>) -> usize {
        let tasks = self.tasks.read().unwrap();
        tasks
            .values()
            .filter(|slot| Some(slot.id) != skip)
            .filter(|slot| slot.record.lock().unwrap().state().is_active())
            .count()
    }
}

/// The task engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DownloadEngine {
    inner: Arc<EngineInner>,
}

impl DownloadEngine {
    pub fn new(config: EngineConfig) -> Self {
        DownloadEngine {
            inner: Arc::new(EngineInner {
                tasks: RwLock::new(HashMap::new()),
                listeners: ListenerRegistry::new(),
                config,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // --- listeners ---

    pub fn add_listener(&self, listener: Arc<dyn DownloadListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    // --- command surface ---

    /// Registers a new task in DEFAULT state and dispatches the `default`
    /// event. The returned id keys every other command.
    pub fn create(&self, req: CreateTask) -> TaskId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut record =
            TaskRecord::with_details(req.url, req.cover_url, req.title, req.group_name);
        record.set_id(id.to_string());
        if req.kind != VideoKind::Default {
            record.set_kind(req.kind);
        }
        if req.is_live {
            record.set_is_live(true);
        }
        tracing::info!(task = id, url = %record.url(), "task created");

        let slot = Arc::new(TaskSlot::new(id, record));
        {
            let record = slot.record.lock().unwrap();
            slot.events.push(EventKind::Default, record.snapshot());
        }
        self.inner.tasks.write().unwrap().insert(id, Arc::clone(&slot));
        slot.events.drain(&self.inner.listeners);
        id
    }

    /// Hands the task to a transport worker: DEFAULT -> PENDING, and returns
    /// the handle the worker reports through.
    pub fn attach_transport(&self, id: TaskId) -> Result<TaskHandle, EngineError> {
        let slot = self.slot(id)?;
        if slot.canceled.load(Ordering::Acquire) {
            return Err(EngineError::Canceled(id));
        }
        {
            let mut record = slot.record.lock().unwrap();
            record.advance(TaskState::Pending)?;
            slot.events.push(EventKind::Pending, record.snapshot());
        }
        slot.events.drain(&self.inner.listeners);
        Ok(TaskHandle::new(Arc::clone(&self.inner), slot))
    }

    /// Pauses a queued or running task. Pausing an already paused task is a
    /// no-op; pausing a terminal or errored task is an invalid transition.
    pub fn pause(&self, id: TaskId) -> Result<(), EngineError> {
        let slot = self.slot(id)?;
        {
            let mut record = slot.record.lock().unwrap();
            match record.state() {
                TaskState::Pause => {}
                TaskState::Pending | TaskState::Prepare | TaskState::Downloading => {
                    record.advance(TaskState::Pause)?;
                    slot.events.push(EventKind::Pause, record.snapshot());
                }
                from => {
                    return Err(EngineError::InvalidTransition {
                        from,
                        to: TaskState::Pause,
                    })
                }
            }
        }
        slot.set_directive(crate::transport::RunDirective::Pause);
        slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// Resumes a paused task back into the queue. Resuming a task that is
    /// already queued or running is a no-op; errored tasks go through
    /// [`Self::retry`] instead.
    pub fn resume(&self, id: TaskId) -> Result<(), EngineError> {
        let slot = self.slot(id)?;
        if slot.canceled.load(Ordering::Acquire) {
            return Err(EngineError::Canceled(id));
        }
        {
            let mut record = slot.record.lock().unwrap();
            match record.state() {
                TaskState::Pending | TaskState::Prepare | TaskState::Downloading => {}
                TaskState::Pause => {
                    record.advance(TaskState::Pending)?;
                    slot.events.push(EventKind::Pending, record.snapshot());
                }
                from => {
                    return Err(EngineError::InvalidTransition {
                        from,
                        to: TaskState::Pending,
                    })
                }
            }
        }
        slot.set_directive(crate::transport::RunDirective::Run);
        slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// Requests cancellation: latches the cancel flag, pins the transport
    /// directive to `Cancel`, and moves a queued/running task to PAUSE
    /// (dispatching `pause` once). Idempotent; the record stays listed with
    /// its final state until [`Self::remove`].
    pub fn cancel(&self, id: TaskId) -> Result<(), EngineError> {
        let slot = self.slot(id)?;
        if slot.canceled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.directive_cancel(&slot);
        {
            let mut record = slot.record.lock().unwrap();
            if matches!(
                record.state(),
                TaskState::Pending | TaskState::Prepare | TaskState::Downloading
            ) {
                record.advance(TaskState::Pause)?;
                slot.events.push(EventKind::Pause, record.snapshot());
            }
        }
        slot.events.drain(&self.inner.listeners);
        tracing::info!(task = id, "task canceled");
        Ok(())
    }

    /// Retries an errored task: clears the error fields (accumulated
    /// progress survives) and re-queues it.
    pub fn retry(&self, id: TaskId) -> Result<(), EngineError> {
        let slot = self.slot(id)?;
        if slot.canceled.load(Ordering::Acquire) {
            return Err(EngineError::Canceled(id));
        }
        {
            let mut record = slot.record.lock().unwrap();
            if record.state() != TaskState::Error {
                return Err(EngineError::InvalidTransition {
                    from: record.state(),
                    to: TaskState::Pending,
                });
            }
            record.clear_error();
            record.advance(TaskState::Pending)?;
            slot.events.push(EventKind::Pending, record.snapshot());
        }
        slot.set_directive(crate::transport::RunDirective::Run);
        slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// Returns a non-active task to its pre-download baseline (identity
    /// survives). A bookkeeping rewrite, not a transition: no event fires.
    pub fn reset(&self, id: TaskId) -> Result<(), EngineError> {
        let slot = self.slot(id)?;
        let mut record = slot.record.lock().unwrap();
        let state = record.state();
        if state.is_active() || state == TaskState::Pending {
            return Err(EngineError::InvalidTransition {
                from: state,
                to: TaskState::Default,
            });
        }
        record.reset();
        Ok(())
    }

    /// Drops the task from the engine, signaling any attached worker to
    /// stop. Returns the final snapshot.
    pub fn remove(&self, id: TaskId) -> Result<TaskSnapshot, EngineError> {
        let slot = self
            .inner
            .tasks
            .write()
            .unwrap()
            .remove(&id)
            .ok_or(EngineError::UnknownTask(id))?;
        slot.canceled.store(true, Ordering::Release);
        self.directive_cancel(&slot);
        let snapshot = slot.record.lock().unwrap().snapshot();
        tracing::info!(task = id, "task removed");
        Ok(snapshot)
    }

    // --- observation ---

    pub fn snapshot(&self, id: TaskId) -> Result<TaskSnapshot, EngineError> {
        let slot = self.slot(id)?;
        let snapshot = slot.record.lock().unwrap().snapshot();
        Ok(snapshot)
    }

    /// Snapshots of every task, oldest first.
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let slots: Vec<Arc<TaskSlot>> = {
            let tasks = self.inner.tasks.read().unwrap();
            tasks.values().cloned().collect()
        };
        let mut out: Vec<(TaskId, TaskSnapshot)> = slots
            .iter()
            .map(|slot| (slot.id, slot.record.lock().unwrap().snapshot()))
            .collect();
        out.sort_by_key(|(id, snap)| (snap.create_time(), *id));
        out.into_iter().map(|(_, snap)| snap).collect()
    }

    /// Snapshots of tasks changed since they were last persisted, marking
    /// them clean. The persistence collaborator calls this on its cadence.
    pub fn take_dirty_snapshots(&self) -> Vec<TaskSnapshot> {
        let slots: Vec<Arc<TaskSlot>> = {
            let tasks = self.inner.tasks.read().unwrap();
            tasks.values().cloned().collect()
        };
        let mut out: Vec<(TaskId, TaskSnapshot)> = Vec::new();
        for slot in slots {
            let mut record = slot.record.lock().unwrap();
            if record.is_dirty() {
                record.mark_persisted();
                out.push((slot.id, record.snapshot()));
            }
        }
        out.sort_by_key(|(id, snap)| (snap.create_time(), *id));
        out.into_iter().map(|(_, snap)| snap).collect()
    }

    pub fn active_downloads(&self) -> usize {
        self.inner.active_downloads(None)
    }

    // --- internals ---

    fn slot(&self, id: TaskId) -> Result<Arc<TaskSlot>, EngineError> {
        self.inner
            .tasks
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownTask(id))
    }

    fn directive_cancel(&self, slot: &TaskSlot) {
        // Bypasses set_directive's cancel latch check: this IS the cancel.
        slot.directive
            .send_replace(crate::transport::RunDirective::Cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RunDirective;

    fn engine() -> DownloadEngine {
        DownloadEngine::with_defaults()
    }

    #[test]
    fn create_assigns_ids_and_lists_in_order() {
        let engine = engine();
        let a = engine.create(CreateTask::new("http://x/a.mp4"));
        let b = engine.create(CreateTask::new("http://x/b.mp4"));
        assert_ne!(a, b);
        let tasks = engine.list();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].url(), "http://x/a.mp4");
        assert_eq!(tasks[1].url(), "http://x/b.mp4");
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let engine = engine();
        assert!(matches!(engine.pause(99), Err(EngineError::UnknownTask(99))));
        assert!(matches!(engine.snapshot(99), Err(EngineError::UnknownTask(99))));
    }

    #[test]
    fn pause_requires_a_pausable_state() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        // DEFAULT -> PAUSE is not in the table.
        assert!(matches!(
            engine.pause(id),
            Err(EngineError::InvalidTransition { from: TaskState::Default, .. })
        ));
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Default);
    }

    #[test]
    fn pause_resume_roundtrip() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        let handle = engine.attach_transport(id).unwrap();
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Pending);

        engine.pause(id).unwrap();
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Pause);
        assert_eq!(handle.directive(), RunDirective::Pause);
        // Idempotent.
        engine.pause(id).unwrap();

        engine.resume(id).unwrap();
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Pending);
        assert_eq!(handle.directive(), RunDirective::Run);
    }

    #[test]
    fn cancel_is_idempotent_and_pins_the_directive() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        let handle = engine.attach_transport(id).unwrap();

        engine.cancel(id).unwrap();
        engine.cancel(id).unwrap();
        assert_eq!(handle.directive(), RunDirective::Cancel);
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Pause);

        // Resume after cancel is refused; the directive stays Cancel.
        assert!(matches!(engine.resume(id), Err(EngineError::Canceled(_))));
        assert_eq!(handle.directive(), RunDirective::Cancel);
    }

    #[test]
    fn retry_only_applies_to_errored_tasks() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        assert!(matches!(
            engine.retry(id),
            Err(EngineError::InvalidTransition { from: TaskState::Default, .. })
        ));

        let handle = engine.attach_transport(id).unwrap();
        handle.preparing().unwrap();
        handle.failed(1, "connect timeout").unwrap();
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Error);

        engine.retry(id).unwrap();
        let snap = engine.snapshot(id).unwrap();
        assert_eq!(snap.state(), TaskState::Pending);
        assert_eq!(snap.error_message(), None);
        assert_eq!(snap.error_code(), 0);
    }

    #[test]
    fn remove_returns_final_snapshot_and_forgets_the_task() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        let snap = engine.remove(id).unwrap();
        assert_eq!(snap.url(), "http://x/a.mp4");
        assert!(matches!(engine.remove(id), Err(EngineError::UnknownTask(_))));
        assert!(engine.list().is_empty());
    }

    #[test]
    fn reset_is_refused_while_queued_or_active() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        engine.attach_transport(id).unwrap();
        assert!(matches!(
            engine.reset(id),
            Err(EngineError::InvalidTransition { from: TaskState::Pending, .. })
        ));
        engine.pause(id).unwrap();
        engine.reset(id).unwrap();
        let snap = engine.snapshot(id).unwrap();
        assert_eq!(snap.state(), TaskState::Default);
        assert_eq!(snap.id(), Some(id.to_string().as_str()));
    }

    #[test]
    fn dirty_snapshots_drain_once() {
        let engine = engine();
        let id = engine.create(CreateTask::new("http://x/a.mp4"));
        let dirty = engine.take_dirty_snapshots();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].is_in_database());
        assert!(engine.take_dirty_snapshots().is_empty());

        engine.attach_transport(id).unwrap();
        assert_eq!(engine.take_dirty_snapshots().len(), 1);
    }

    #[test]
    fn dirty_snapshots_keep_creation_order_past_nine_tasks() {
        let engine = engine();
        // Ids reach double digits; the order must stay numeric, not
        // lexicographic ("10" before "2").
        let ids: Vec<TaskId> = (0..12)
            .map(|n| engine.create(CreateTask::new(format!("http://x/{n}.mp4"))))
            .collect();
        let dirty = engine.take_dirty_snapshots();
        let got: Vec<String> = dirty
            .iter()
            .map(|snap| snap.id().unwrap_or_default().to_owned())
            .collect();
        let expected: Vec<String> = ids.iter().map(TaskId::to_string).collect();
        assert_eq!(got, expected);
    }
}
