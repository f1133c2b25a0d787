//! Recorded-duration accounting for live/endless streams.
//!
//! When the source has no fixed total size, elapsed recorded time is the
//! canonical progress signal. The accumulator only grows; the sole way back
//! to zero is a full record reset.

use super::TaskRecord;

impl TaskRecord {
    /// Adds the duration recorded since the last tick, in milliseconds.
    pub(crate) fn add_live_duration(&mut self, delta_ms: u64) {
        if delta_ms == 0 {
            return;
        }
        self.accumulated_duration_ms = self.accumulated_duration_ms.saturating_add(delta_ms);
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use crate::task::TaskRecord;

    #[test]
    fn deltas_accumulate_monotonically() {
        let mut r = TaskRecord::new("http://x/live.m3u8");
        r.set_is_live(true);
        for delta in [5_000, 5_000, 10_000] {
            r.add_live_duration(delta);
        }
        assert_eq!(r.accumulated_duration_ms(), 20_000);
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        let mut r = TaskRecord::new("http://x/live.m3u8");
        r.add_live_duration(0);
        assert_eq!(r.accumulated_duration_ms(), 0);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let mut r = TaskRecord::new("http://x/live.m3u8");
        r.add_live_duration(u64::MAX - 1);
        r.add_live_duration(1_000);
        assert_eq!(r.accumulated_duration_ms(), u64::MAX);
    }

    #[test]
    fn only_reset_clears_the_accumulator() {
        let mut r = TaskRecord::new("http://x/live.m3u8");
        r.set_is_live(true);
        r.add_live_duration(7_000);
        r.reset();
        assert_eq!(r.accumulated_duration_ms(), 0);
    }
}
