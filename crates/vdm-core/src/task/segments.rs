//! Segment-count tracking for chunked (HLS/DASH) formats.
//!
//! `cur_segments` is monotonic and never reported beyond `total_segments`
//! once both are known. Violations from the transport are clamped for
//! display and logged, not raised — the task keeps downloading.

use super::TaskRecord;

impl TaskRecord {
    /// Records the planned segment count once the manifest is known.
    pub(crate) fn set_total_segments(&mut self, total: u32) {
        if total < self.cur_segments {
            tracing::warn!(
                url = %self.url,
                total,
                completed = self.cur_segments,
                "total segments below completed count"
            );
        }
        self.total_segments = total;
        self.touch();
    }

    /// Records the number of completed segments, deriving percent for
    /// segmented formats when the total is known.
    pub(crate) fn record_segment_progress(&mut self, cur: u32) {
        let mut cur = cur;
        if self.total_segments > 0 && cur > self.total_segments {
            tracing::warn!(
                url = %self.url,
                reported = cur,
                total = self.total_segments,
                "segment count exceeds manifest total; clamping"
            );
            cur = self.total_segments;
        }
        if cur < self.cur_segments {
            tracing::warn!(
                url = %self.url,
                reported = cur,
                current = self.cur_segments,
                "segment count went backwards; keeping current value"
            );
        } else {
            self.cur_segments = cur;
        }
        if self.kind.is_segmented() && self.total_segments > 0 && !self.is_live {
            let pct = (self.cur_segments as f64 / self.total_segments as f64) * 100.0;
            self.percent = pct.clamp(0.0, 100.0) as f32;
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use crate::task::{TaskRecord, VideoKind};

    fn hls_task() -> TaskRecord {
        let mut r = TaskRecord::new("http://x/playlist.m3u8");
        r.set_kind(VideoKind::Hls);
        r
    }

    #[test]
    fn segment_percent_for_hls() {
        let mut r = hls_task();
        r.set_total_segments(10);
        r.record_segment_progress(3);
        assert!((r.percent() - 30.0).abs() < 0.01);
        assert_eq!(r.cur_segments(), 3);
    }

    #[test]
    fn overcount_is_clamped_to_total() {
        let mut r = hls_task();
        r.set_total_segments(10);
        r.record_segment_progress(11);
        assert_eq!(r.cur_segments(), 10);
        assert_eq!(r.percent(), 100.0);
    }

    #[test]
    fn counts_are_monotonic() {
        let mut r = hls_task();
        r.set_total_segments(10);
        r.record_segment_progress(5);
        r.record_segment_progress(4);
        assert_eq!(r.cur_segments(), 5);
    }

    #[test]
    fn no_percent_without_total() {
        let mut r = hls_task();
        r.record_segment_progress(3);
        assert_eq!(r.cur_segments(), 3);
        assert_eq!(r.percent(), 0.0);
    }

    #[test]
    fn non_segmented_kinds_keep_byte_percent() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.update_bytes(250, Some(1000));
        r.set_total_segments(4);
        r.record_segment_progress(4);
        // Percent still reflects bytes for progressive files.
        assert!((r.percent() - 25.0).abs() < 0.01);
    }
}
