//! The handle a transport worker drives its task through.
//!
//! One handle per attached worker. Every call locks the task's record,
//! applies the report, queues events, and fans out after the lock is
//! released. Calls that race a cancel are dropped rather than failed: the
//! worker learns about the cancel from the directive at its next I/O
//! boundary.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::EngineError;
use crate::listener::EventKind;
use crate::task::{TaskId, TaskState};
use crate::transport::{error_codes, RunDirective, TransportReport};
use crate::url_model;

use super::{EngineInner, TaskSlot};

pub struct TaskHandle {
    inner: Arc<EngineInner>,
    slot: Arc<TaskSlot>,
}

impl TaskHandle {
    pub(crate) fn new(inner: Arc<EngineInner>, slot: Arc<TaskSlot>) -> Self {
        TaskHandle { inner, slot }
    }

    pub fn id(&self) -> TaskId {
        self.slot.id
    }

    /// Latest desired run state. Check at every I/O boundary.
    pub fn directive(&self) -> RunDirective {
        *self.slot.directive.borrow()
    }

    /// Watch for directive changes (for workers that want to await them
    /// instead of polling).
    pub fn directive_watch(&self) -> watch::Receiver<RunDirective> {
        self.slot.directive.subscribe()
    }

    pub fn is_canceled(&self) -> bool {
        self.slot.canceled.load(Ordering::Acquire)
    }

    /// PENDING -> PREPARE: the worker took the task and is probing the
    /// source. Gated by the configured concurrent-download limit.
    pub fn preparing(&self) -> Result<(), EngineError> {
        if self.is_canceled() {
            return Err(EngineError::Canceled(self.slot.id));
        }
        let active = self.inner.active_downloads(Some(self.slot.id));
        let limit = self.inner.config.max_concurrent_downloads;
        if limit > 0 && active >= limit {
            return Err(EngineError::AtCapacity(active));
        }
        {
            let mut record = self.slot.record.lock().unwrap();
            record.advance(TaskState::Prepare)?;
            self.slot.events.push(EventKind::Prepare, record.snapshot());
        }
        self.slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// PREPARE -> DOWNLOADING: first byte/segment is about to arrive. The
    /// output location is resolved here if the transport has not named the
    /// file yet.
    pub fn started(&self) -> Result<(), EngineError> {
        if self.is_canceled() {
            return Err(EngineError::Canceled(self.slot.id));
        }
        {
            let mut record = self.slot.record.lock().unwrap();
            record.advance(TaskState::Downloading)?;
            if record.file_name().is_empty() {
                let name = url_model::suggest_file_name(
                    record.title(),
                    record.final_url().unwrap_or(record.url()),
                    record.file_hash(),
                );
                let save_dir = self.inner.config.save_dir.to_string_lossy().into_owned();
                record.set_output(&save_dir, &name);
            }
            self.slot.events.push(EventKind::Start, record.snapshot());
        }
        self.slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// Applies one tick of transport observations.
    ///
    /// Metadata (redirect URL, content type, file name) is accepted in
    /// PREPARE and DOWNLOADING. Progress counters are accepted only in
    /// DOWNLOADING; ticks that arrive after a pause or cancel are dropped
    /// so listeners see no progress events past the pause.
    pub fn progress(&self, report: TransportReport) -> Result<(), EngineError> {
        if self.is_canceled() {
            tracing::debug!(task = self.slot.id, "progress after cancel dropped");
            return Ok(());
        }
        {
            let mut record = self.slot.record.lock().unwrap();
            let state = record.state();

            if matches!(state, TaskState::Prepare | TaskState::Downloading) {
                if let Some(url) = report.final_url {
                    record.set_final_url(url);
                }
                if let Some(mime) = report.mime_type.as_deref() {
                    record.set_mime_type(mime);
                }
                if let Some(name) = report.file_name.as_deref() {
                    let save_dir = self.inner.config.save_dir.to_string_lossy().into_owned();
                    record.set_output(&save_dir, name);
                }
                if let Some(path) = report.cover_path {
                    record.set_cover_path(path);
                }
                if let Some(info) = report.line_info {
                    record.set_line_info(Some(info));
                }
            }

            let has_progress = report.download_size.is_some()
                || report.cur_segments.is_some()
                || report.total_segments.is_some()
                || report.live_duration_delta_ms.is_some()
                || report.percent_estimate.is_some();

            if state != TaskState::Downloading {
                if has_progress || report.speed.is_some() {
                    tracing::debug!(
                        task = self.slot.id,
                        state = state.as_str(),
                        "progress tick outside DOWNLOADING dropped"
                    );
                }
            } else {
                if let Some(total) = report.total_segments {
                    record.set_total_segments(total);
                }
                if let Some(cur) = report.cur_segments {
                    record.record_segment_progress(cur);
                }
                if report.download_size.is_some() || report.total_size.is_some() {
                    let current_download_size = record.download_size();
                    record.update_bytes(
                        report.download_size.unwrap_or(current_download_size),
                        report.total_size,
                    );
                }
                if let Some(delta) = report.live_duration_delta_ms {
                    record.add_live_duration(delta);
                }
                if let Some(estimate) = report.percent_estimate {
                    // Only when no better signal exists.
                    let byte_tracked = !record.is_live() && record.total_size() > 0;
                    let segment_tracked =
                        record.is_hls_type() && record.total_segments() > 0;
                    if !byte_tracked && !segment_tracked {
                        record.set_percent_estimate(estimate);
                    }
                }
                if has_progress {
                    self.slot.events.push(EventKind::Progress, record.snapshot());
                }
                if let Some(speed) = report.speed {
                    record.update_speed(speed);
                    self.slot.events.push(EventKind::Speed, record.snapshot());
                }
            }
        }
        self.slot.events.drain(&self.inner.listeners);
        Ok(())
    }

    /// Transport gave up: task -> ERROR with the given code and message.
    pub fn failed(&self, code: i32, message: &str) -> Result<(), EngineError> {
        if self.is_canceled() {
            tracing::debug!(task = self.slot.id, "failure after cancel dropped");
            return Ok(());
        }
        {
            let mut record = self.slot.record.lock().unwrap();
            record.fail(code, message)?;
            self.slot.events.push(EventKind::Error, record.snapshot());
        }
        self.slot.events.drain(&self.inner.listeners);
        tracing::warn!(task = self.slot.id, code, message, "task failed");
        Ok(())
    }

    /// Network/HTTP failure: task -> ERROR with the transport code.
    pub fn transport_failed(&self, message: &str) -> Result<(), EngineError> {
        self.failed(error_codes::TRANSPORT, message)
    }

    /// Disk write failed: task -> ERROR with the storage code. Collaborators
    /// should not blindly retry; data may be partially written.
    pub fn storage_failed(&self, err: &std::io::Error) -> Result<(), EngineError> {
        self.failed(error_codes::STORAGE, &format!("storage: {err}"))
    }

    /// Segment merge failed after the transfer finished.
    pub fn merge_failed(&self, message: &str) -> Result<(), EngineError> {
        self.failed(error_codes::MERGE, &format!("merge: {message}"))
    }

    /// Byte-complete success for known-size non-live tasks.
    pub fn succeeded(&self) -> Result<(), EngineError> {
        self.finish(false)
    }

    /// Explicit finalize for live/unknown-total tasks: the transport has
    /// closed out the stream and merged what it recorded.
    pub fn finalize(&self) -> Result<(), EngineError> {
        self.finish(true)
    }

    fn finish(&self, finalized: bool) -> Result<(), EngineError> {
        if self.is_canceled() {
            tracing::debug!(task = self.slot.id, "completion after cancel dropped");
            return Ok(());
        }
        {
            let mut record = self.slot.record.lock().unwrap();
            record.succeed(finalized)?;
            self.slot.events.push(EventKind::Success, record.snapshot());
        }
        self.slot.events.drain(&self.inner.listeners);
        tracing::info!(task = self.slot.id, "task completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{CreateTask, DownloadEngine};
    use crate::error::EngineError;

    fn running_task(engine: &DownloadEngine, url: &str) -> TaskHandle {
        let id = engine.create(CreateTask::new(url));
        let handle = engine.attach_transport(id).unwrap();
        handle.preparing().unwrap();
        handle.started().unwrap();
        handle
    }

    #[test]
    fn metadata_is_applied_during_prepare() {
        let engine = DownloadEngine::with_defaults();
        let id = engine.create(CreateTask::new("http://x/v"));
        let handle = engine.attach_transport(id).unwrap();
        handle.preparing().unwrap();
        handle
            .progress(TransportReport {
                final_url: Some("http://cdn/v.mp4".into()),
                mime_type: Some("video/mp4".into()),
                ..Default::default()
            })
            .unwrap();
        let snap = engine.snapshot(id).unwrap();
        assert_eq!(snap.final_url(), Some("http://cdn/v.mp4"));
        assert_eq!(snap.mime_type(), Some("video/mp4"));
        // Still in PREPARE; the metadata tick is not a progress event.
        assert_eq!(snap.state(), TaskState::Prepare);
    }

    #[test]
    fn started_resolves_an_output_location() {
        let engine = DownloadEngine::new(EngineConfig {
            save_dir: "/videos".into(),
            ..Default::default()
        });
        let handle = running_task(&engine, "http://x/movie.mp4");
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.file_name(), "movie.mp4");
        assert_eq!(snap.file_path(), "/videos/movie.mp4");
        assert_eq!(snap.save_dir(), "/videos");
    }

    #[test]
    fn capacity_gate_rejects_extra_workers() {
        let engine = DownloadEngine::new(EngineConfig {
            max_concurrent_downloads: 1,
            ..Default::default()
        });
        let _first = running_task(&engine, "http://x/a.mp4");

        let id = engine.create(CreateTask::new("http://x/b.mp4"));
        let second = engine.attach_transport(id).unwrap();
        assert!(matches!(second.preparing(), Err(EngineError::AtCapacity(1))));
        // The queued task is untouched.
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Pending);
    }

    #[test]
    fn progress_after_pause_is_dropped() {
        let engine = DownloadEngine::with_defaults();
        let handle = running_task(&engine, "http://x/a.mp4");
        engine.pause(handle.id()).unwrap();

        handle.progress(TransportReport::bytes(500, 1000)).unwrap();
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.download_size(), 0);
        assert_eq!(snap.state(), TaskState::Pause);
    }

    #[test]
    fn reports_after_cancel_are_dropped_without_error() {
        let engine = DownloadEngine::with_defaults();
        let handle = running_task(&engine, "http://x/a.mp4");
        engine.cancel(handle.id()).unwrap();

        handle.progress(TransportReport::bytes(10, 100)).unwrap();
        handle.failed(1, "late failure").unwrap();
        handle.succeeded().unwrap();
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.state(), TaskState::Pause);
        assert_eq!(snap.error_message(), None);
    }

    #[test]
    fn failure_helpers_set_their_error_codes() {
        let engine = DownloadEngine::with_defaults();

        let handle = running_task(&engine, "http://x/a.mp4");
        handle.transport_failed("connection reset by peer").unwrap();
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.error_code(), error_codes::TRANSPORT);
        assert_eq!(snap.error_message(), Some("connection reset by peer"));

        let handle = running_task(&engine, "http://x/b.mp4");
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        handle.storage_failed(&io_err).unwrap();
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.error_code(), error_codes::STORAGE);

        let handle = running_task(&engine, "http://x/c.m3u8");
        handle.merge_failed("segment 7 missing").unwrap();
        let snap = engine.snapshot(handle.id()).unwrap();
        assert_eq!(snap.error_code(), error_codes::MERGE);
        assert_eq!(snap.error_message(), Some("merge: segment 7 missing"));
    }

    #[test]
    fn finalize_completes_a_live_task() {
        let engine = DownloadEngine::with_defaults();
        let id = engine.create(CreateTask {
            url: "http://x/live.m3u8".into(),
            is_live: true,
            ..Default::default()
        });
        let handle = engine.attach_transport(id).unwrap();
        handle.preparing().unwrap();
        handle.started().unwrap();
        handle
            .progress(TransportReport {
                live_duration_delta_ms: Some(5_000),
                ..Default::default()
            })
            .unwrap();
        assert!(handle.succeeded().is_err());
        handle.finalize().unwrap();
        assert_eq!(engine.snapshot(id).unwrap().state(), TaskState::Success);
    }
}
