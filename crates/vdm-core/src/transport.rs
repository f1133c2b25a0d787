//! Types crossing the engine <-> transport boundary.
//!
//! The transport collaborator (HTTP client, manifest fetcher) reports what
//! it observed; the engine answers with the desired run state through a
//! watch channel. No wire format lives here.

/// Desired state the engine communicates back to the transport worker.
///
/// Delivered through `tokio::sync::watch`; the worker must check it at every
/// I/O boundary (cooperative cancellation, never preemptive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunDirective {
    #[default]
    Run,
    Pause,
    /// Terminal: stop permanently and release resources. Once set, the
    /// directive never changes again.
    Cancel,
}

/// One tick of transport observations. Every field is optional; the engine
/// applies whatever is present. Counters it already tracks win over
/// out-of-bounds values (clamped, logged).
#[derive(Debug, Clone, Default)]
pub struct TransportReport {
    /// URL after following redirects.
    pub final_url: Option<String>,
    /// Content type, once known; also drives format detection.
    pub mime_type: Option<String>,
    /// Output file name, once the transport resolved it.
    pub file_name: Option<String>,
    /// Local path of the downloaded poster image, once fetched.
    pub cover_path: Option<String>,
    /// Total size in bytes; 0/absent for live or streamed content.
    pub total_size: Option<u64>,
    /// Bytes fetched so far.
    pub download_size: Option<u64>,
    /// Throughput in bytes/sec, smoothed by the transport.
    pub speed: Option<f32>,
    /// Planned segment count from the manifest.
    pub total_segments: Option<u32>,
    /// Completed segment count.
    pub cur_segments: Option<u32>,
    /// Newly recorded duration since the previous tick (live streams).
    pub live_duration_delta_ms: Option<u64>,
    /// Transport's own progress estimate, used when neither byte totals nor
    /// segment counts apply.
    pub percent_estimate: Option<f32>,
    /// Free-form status line for the UI ("merging segments", ...).
    pub line_info: Option<String>,
}

impl TransportReport {
    /// Convenience for the common byte-progress tick.
    pub fn bytes(download_size: u64, total_size: u64) -> Self {
        TransportReport {
            download_size: Some(download_size),
            total_size: Some(total_size),
            ..Default::default()
        }
    }

    /// Convenience for a completed-segment tick.
    pub fn segments(cur: u32) -> Self {
        TransportReport {
            cur_segments: Some(cur),
            ..Default::default()
        }
    }

    /// True if this report carries any progress signal (as opposed to pure
    /// metadata like a redirect URL).
    pub fn has_progress(&self) -> bool {
        self.download_size.is_some()
            || self.cur_segments.is_some()
            || self.total_segments.is_some()
            || self.live_duration_delta_ms.is_some()
            || self.percent_estimate.is_some()
    }
}

/// Error codes attached to ERROR-state tasks. The transport may use its own
/// codes; these cover the engine-adjacent failure classes.
pub mod error_codes {
    /// Network/HTTP failure reported by the transport.
    pub const TRANSPORT: i32 = 1;
    /// Disk write failure; not auto-retried.
    pub const STORAGE: i32 = 2;
    /// Segment merge failed after download.
    pub const MERGE: i32 = 3;
}
