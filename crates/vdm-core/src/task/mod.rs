//! The Task Record: identity plus mutable download state for one video.
//!
//! A record is owned by the engine and mutated only under its per-task lock;
//! everything handed to listeners or persistence is a [`TaskSnapshot`]
//! (an independent deep copy — all fields are owned values, so `Clone` is
//! the snapshot operation and new fields can never be missed).

mod kind;
mod state;

pub(crate) mod live;
pub(crate) mod progress;
pub(crate) mod segments;

pub use kind::VideoKind;
pub use state::TaskState;

use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::url_model;

/// Engine-assigned task identifier.
pub type TaskId = u64;

/// Point-in-time copy of a task, safe to hand across subsystem boundaries.
pub type TaskSnapshot = TaskRecord;

/// One download task: identity, source, display metadata, and progress state.
///
/// Equality and hashing follow the identity rule: two records are equal iff
/// their IDs match (when both carry one) or their URLs match (when neither
/// does). An ID is never compared against a URL, so records with mixed
/// identity populations are unequal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    id: Option<String>,
    url: String,
    final_url: Option<String>,
    cover_url: String,
    cover_path: String,
    title: String,
    group_name: String,
    mime_type: Option<String>,
    kind: VideoKind,
    state: TaskState,
    error_code: i32,
    error_message: Option<String>,
    download_size: u64,
    total_size: u64,
    percent: f32,
    speed: f32,
    total_segments: u32,
    cur_segments: u32,
    accumulated_duration_ms: u64,
    file_name: String,
    file_path: String,
    save_dir: String,
    file_hash: String,
    create_time: i64,
    last_update_time: i64,
    is_live: bool,
    is_completed: bool,
    is_paused: bool,
    is_in_database: bool,
    line_info: Option<String>,
    #[serde(skip)]
    dirty: bool,
}

impl TaskRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_details(url, "", "", "")
    }

    pub fn with_details(
        url: impl Into<String>,
        cover_url: impl Into<String>,
        title: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let file_hash = url_model::file_hash(&url);
        TaskRecord {
            id: None,
            url,
            final_url: None,
            cover_url: cover_url.into(),
            cover_path: String::new(),
            title: title.into(),
            group_name: group_name.into(),
            mime_type: None,
            kind: VideoKind::Default,
            state: TaskState::Default,
            error_code: 0,
            error_message: None,
            download_size: 0,
            total_size: 0,
            percent: 0.0,
            speed: 0.0,
            total_segments: 0,
            cur_segments: 0,
            accumulated_duration_ms: 0,
            file_name: String::new(),
            file_path: String::new(),
            save_dir: String::new(),
            file_hash,
            create_time: unix_timestamp(),
            last_update_time: unix_timestamp(),
            is_live: false,
            is_completed: false,
            is_paused: false,
            is_in_database: false,
            line_info: None,
            dirty: true,
        }
    }

    // --- identity ---

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
        self.touch();
    }

    // --- state machine ---

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Moves to `to` if the transition is legal; state is untouched on refusal.
    /// ERROR and SUCCESS have dedicated entry points ([`Self::fail`],
    /// [`Self::succeed`]) that also validate their entry conditions.
    pub(crate) fn advance(&mut self, to: TaskState) -> Result<(), EngineError> {
        self.state.check_transition(to)?;
        self.enter(to);
        Ok(())
    }

    /// Enters ERROR with a populated code and message.
    ///
    /// Throughput is cleared: nothing is transferring in ERROR, and a stale
    /// bytes/sec figure would otherwise linger in snapshots until the next
    /// tick. The transport's last reported value is otherwise never second-
    /// guessed; this clearing on leaving DOWNLOADING is the one exception.
    pub(crate) fn fail(&mut self, code: i32, message: &str) -> Result<(), EngineError> {
        if message.trim().is_empty() {
            return Err(EngineError::MissingErrorDetail);
        }
        self.state.check_transition(TaskState::Error)?;
        self.error_code = code;
        self.error_message = Some(message.to_string());
        self.speed = 0.0;
        self.enter(TaskState::Error);
        Ok(())
    }

    /// Enters SUCCESS. For known-size non-live tasks the byte counters must
    /// agree; live/unknown-total tasks require `finalized` (the explicit
    /// signal from the transport once it has closed out the stream).
    /// Throughput is cleared on entry, as in [`Self::fail`].
    pub(crate) fn succeed(&mut self, finalized: bool) -> Result<(), EngineError> {
        self.state.check_transition(TaskState::Success)?;
        let byte_checked = !self.is_live && self.total_size > 0;
        if byte_checked {
            if self.download_size != self.total_size {
                return Err(EngineError::IncompleteSuccess {
                    downloaded: self.download_size,
                    total: self.total_size,
                });
            }
            self.percent = 100.0;
        } else if !finalized {
            return Err(EngineError::IncompleteSuccess {
                downloaded: self.download_size,
                total: self.total_size,
            });
        }
        self.speed = 0.0;
        self.enter(TaskState::Success);
        Ok(())
    }

    fn enter(&mut self, state: TaskState) {
        self.state = state;
        self.is_completed = state == TaskState::Success;
        self.is_paused = state == TaskState::Pause;
        self.touch();
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Downloading
    }

    pub fn is_pending_state(&self) -> bool {
        self.state.is_pending()
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.is_interrupted()
    }

    pub fn is_initial(&self) -> bool {
        self.state == TaskState::Default
    }

    pub fn is_error_state(&self) -> bool {
        self.state == TaskState::Error
    }

    pub fn is_success_state(&self) -> bool {
        self.state == TaskState::Success
    }

    // --- source / format metadata ---

    pub fn final_url(&self) -> Option<&str> {
        self.final_url.as_deref()
    }

    pub(crate) fn set_final_url(&mut self, url: impl Into<String>) {
        self.final_url = Some(url.into());
        self.touch();
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Records the content type; the format kind is sniffed from it unless
    /// something more specific is already known.
    pub(crate) fn set_mime_type(&mut self, mime: &str) {
        if self.kind == VideoKind::Default {
            self.kind = VideoKind::from_mime(mime);
        }
        self.mime_type = Some(mime.to_string());
        self.touch();
    }

    pub fn kind(&self) -> VideoKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: VideoKind) {
        self.kind = kind;
        self.touch();
    }

    pub fn is_hls_type(&self) -> bool {
        self.kind.is_segmented()
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub(crate) fn set_is_live(&mut self, live: bool) {
        self.is_live = live;
        self.touch();
    }

    // --- display metadata ---

    pub fn cover_url(&self) -> &str {
        &self.cover_url
    }

    pub fn cover_path(&self) -> &str {
        &self.cover_path
    }

    pub(crate) fn set_cover_path(&mut self, path: impl Into<String>) {
        self.cover_path = path.into();
        self.touch();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Free-form status annotation for the UI (e.g. "merging segments").
    /// Never consulted by engine logic.
    pub fn line_info(&self) -> Option<&str> {
        self.line_info.as_deref()
    }

    pub(crate) fn set_line_info(&mut self, info: Option<String>) {
        self.line_info = info;
        self.touch();
    }

    // --- error fields ---

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub(crate) fn clear_error(&mut self) {
        self.error_code = 0;
        self.error_message = None;
        self.touch();
    }

    // --- counters (mutation lives in progress/segments/live) ---

    pub fn download_size(&self) -> u64 {
        self.download_size
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn total_segments(&self) -> u32 {
        self.total_segments
    }

    pub fn cur_segments(&self) -> u32 {
        self.cur_segments
    }

    pub fn accumulated_duration_ms(&self) -> u64 {
        self.accumulated_duration_ms
    }

    // --- output location ---

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn save_dir(&self) -> &str {
        &self.save_dir
    }

    /// Content-addressed name derived from the source URL; stable across
    /// resets and collision-free for file naming.
    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    pub(crate) fn set_output(&mut self, save_dir: &str, file_name: &str) {
        self.save_dir = save_dir.to_string();
        self.file_name = file_name.to_string();
        self.file_path = if save_dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", save_dir.trim_end_matches('/'), file_name)
        };
        self.touch();
    }

    // --- bookkeeping ---

    pub fn create_time(&self) -> i64 {
        self.create_time
    }

    pub fn last_update_time(&self) -> i64 {
        self.last_update_time
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_in_database(&self) -> bool {
        self.is_in_database
    }

    /// True if the record changed since the last [`Self::mark_persisted`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the persistence collaborator after writing the row.
    pub fn mark_persisted(&mut self) {
        self.dirty = false;
        self.is_in_database = true;
    }

    pub(crate) fn touch(&mut self) {
        self.last_update_time = unix_timestamp();
        self.dirty = true;
    }

    // --- snapshot / reset ---

    /// Independent deep copy for cross-thread handoff. Does not dispatch.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.clone()
    }

    /// Returns the record to its pre-download baseline. Identity (URL and
    /// ID) and the URL-derived file hash survive; everything else is
    /// cleared. Does not dispatch.
    pub fn reset(&mut self) {
        self.final_url = None;
        self.cover_url.clear();
        self.cover_path.clear();
        self.title.clear();
        self.group_name.clear();
        self.mime_type = None;
        self.kind = VideoKind::Default;
        self.state = TaskState::Default;
        self.error_code = 0;
        self.error_message = None;
        self.download_size = 0;
        self.total_size = 0;
        self.percent = 0.0;
        self.speed = 0.0;
        self.total_segments = 0;
        self.cur_segments = 0;
        self.accumulated_duration_ms = 0;
        self.file_name.clear();
        self.file_path.clear();
        self.create_time = 0;
        self.is_completed = false;
        self.is_paused = false;
        self.line_info = None;
        self.touch();
    }
}

impl PartialEq for TaskRecord {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.url == other.url,
            // One side has an ID, the other does not: never compare ID
            // against URL.
            _ => false,
        }
    }
}

impl Eq for TaskRecord {}

impl Hash for TaskRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.id {
            Some(id) => id.hash(state),
            None => self.url.hash(state),
        }
    }
}

/// Current time as Unix seconds (create/update timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
