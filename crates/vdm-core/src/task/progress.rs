//! Byte-based progress and speed bookkeeping.
//!
//! Percent is derived from byte counters only when a total is known; the
//! result is always clamped to [0, 100]. Speed is stored exactly as the
//! transport reported it — smoothing is the transport's responsibility.

use super::TaskRecord;

/// Percent complete from raw byte counters, in [0.0, 100.0].
/// A zero/unknown total yields 0 rather than dividing by zero.
pub fn percent_from_bytes(download_size: u64, total_size: u64) -> f32 {
    if total_size == 0 {
        return 0.0;
    }
    let pct = (download_size as f64 / total_size as f64) * 100.0;
    pct.clamp(0.0, 100.0) as f32
}

impl TaskRecord {
    /// Updates the byte counters, recomputing percent when a total is known.
    ///
    /// A `download_size` beyond a known total is an inconsistency from the
    /// transport: it is logged and clamped so the percent invariant and the
    /// SUCCESS byte check stay intact.
    pub(crate) fn update_bytes(&mut self, download_size: u64, total_size: Option<u64>) {
        if let Some(total) = total_size {
            self.total_size = total;
        }
        let mut size = download_size;
        if self.total_size > 0 && size > self.total_size {
            tracing::warn!(
                url = %self.url,
                reported = size,
                total = self.total_size,
                "download size exceeds total; clamping"
            );
            size = self.total_size;
        }
        if size < self.download_size {
            tracing::warn!(
                url = %self.url,
                reported = size,
                current = self.download_size,
                "download size went backwards; keeping current value"
            );
        } else {
            self.download_size = size;
        }
        // Live streams track duration, not byte fractions; segmented formats
        // derive percent from segment counters instead.
        if !self.is_live && !(self.kind.is_segmented() && self.total_segments > 0) {
            self.percent = percent_from_bytes(self.download_size, self.total_size);
        }
        self.touch();
    }

    /// Stores the transport-supplied throughput verbatim (bytes/sec).
    pub(crate) fn update_speed(&mut self, speed: f32) {
        self.speed = if speed.is_finite() && speed >= 0.0 {
            speed
        } else {
            0.0
        };
        self.touch();
    }

    /// Accepts a caller-supplied percent estimate (e.g. from a transport
    /// that knows its own manifest better than we do), clamped to [0, 100].
    pub(crate) fn set_percent_estimate(&mut self, percent: f32) {
        self.percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent_from_bytes(500, 0), 0.0);
    }

    #[test]
    fn percent_never_exceeds_hundred() {
        assert_eq!(percent_from_bytes(2000, 1000), 100.0);
        assert_eq!(percent_from_bytes(1000, 1000), 100.0);
    }

    #[test]
    fn quarter_progress() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.update_bytes(250, Some(1000));
        assert!((r.percent() - 25.0).abs() < f32::EPSILON);
        assert_eq!(r.download_size(), 250);
        assert_eq!(r.total_size(), 1000);
    }

    #[test]
    fn overreported_bytes_are_clamped() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.update_bytes(1500, Some(1000));
        assert_eq!(r.download_size(), 1000);
        assert_eq!(r.percent(), 100.0);
    }

    #[test]
    fn regressing_bytes_are_ignored() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.update_bytes(600, Some(1000));
        r.update_bytes(400, None);
        assert_eq!(r.download_size(), 600);
    }

    #[test]
    fn live_tasks_do_not_derive_percent_from_bytes() {
        let mut r = TaskRecord::new("http://x/live.m3u8");
        r.set_is_live(true);
        r.update_bytes(500, Some(1000));
        assert_eq!(r.percent(), 0.0);
    }

    #[test]
    fn speed_is_stored_verbatim_and_sanitized() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.update_speed(1536.5);
        assert_eq!(r.speed(), 1536.5);
        r.update_speed(f32::NAN);
        assert_eq!(r.speed(), 0.0);
        r.update_speed(-10.0);
        assert_eq!(r.speed(), 0.0);
    }

    #[test]
    fn estimate_is_clamped() {
        let mut r = TaskRecord::new("http://x/a.mp4");
        r.set_percent_estimate(140.0);
        assert_eq!(r.percent(), 100.0);
        r.set_percent_estimate(-3.0);
        assert_eq!(r.percent(), 0.0);
    }
}
