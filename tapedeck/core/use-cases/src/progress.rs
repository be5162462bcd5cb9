use crate::models::descriptors::DownloadSample;
use crate::models::descriptors::ProgressState;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Floor of every denominator, in seconds or MB/s.
const MIN_DENOMINATOR: f64 = 0.01;

/// Throughput and ETA over one job, fed one sample per persisted item.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    cumulative_bytes: u64,
    started_at: ::tokio::time::Instant,
    total: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            cumulative_bytes: 0,
            started_at: ::tokio::time::Instant::now(),
            total,
        }
    }

    pub fn reset(&mut self, total: usize) {
        *self = Self::new(total);
    }

    pub fn on_sample(&mut self, sample: &DownloadSample, remaining_after: usize) -> ProgressState {
        self.on_sample_at(sample, remaining_after, ::tokio::time::Instant::now())
    }

    fn on_sample_at(
        &mut self, sample: &DownloadSample, remaining_after: usize, now: ::tokio::time::Instant,
    ) -> ProgressState {
        let size = sample.bytes as f64 / BYTES_PER_MEGABYTE;
        let instant_speed_mbps = size / sample.duration.as_secs_f64().max(MIN_DENOMINATOR);

        self.cumulative_bytes = self.cumulative_bytes.saturating_add(sample.bytes);

        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let average_speed_mbps = self.cumulative_bytes as f64 / BYTES_PER_MEGABYTE / elapsed.max(MIN_DENOMINATOR);

        // Every remaining item is assumed to be as large as the latest one.
        let eta_seconds = remaining_after as f64 * size / average_speed_mbps.max(MIN_DENOMINATOR);

        ProgressState {
            completed_count: self.total.saturating_sub(remaining_after),
            total_count: self.total,
            instant_speed_mbps,
            average_speed_mbps,
            eta_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEGABYTE: u64 = 1024 * 1024;

    fn sample(index: usize, megabytes: u64, millis: u64) -> DownloadSample {
        DownloadSample {
            index,
            bytes: megabytes * MEGABYTE,
            duration: ::std::time::Duration::from_millis(millis),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[tokio::test(start_paused = true)]
    async fn computes_instant_average_and_eta() {
        let mut tracker = ProgressTracker::new(4);

        ::tokio::time::advance(::std::time::Duration::from_secs(2)).await;
        let state = tracker.on_sample(&sample(0, 10, 2000), 3);

        assert_eq!(state.completed_count, 1);
        assert_eq!(state.total_count, 4);
        assert_close(state.instant_speed_mbps, 5.0);
        assert_close(state.average_speed_mbps, 5.0);
        assert_close(state.eta_seconds, 6.0);

        ::tokio::time::advance(::std::time::Duration::from_secs(2)).await;
        let state = tracker.on_sample(&sample(1, 30, 2000), 2);

        assert_eq!(state.completed_count, 2);
        assert_close(state.instant_speed_mbps, 15.0);
        assert_close(state.average_speed_mbps, 10.0);
        assert_close(state.eta_seconds, 6.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_finite_for_zero_duration_and_zero_elapsed() {
        let mut tracker = ProgressTracker::new(2);

        let state = tracker.on_sample(&sample(0, 1, 0), 1);

        assert!(state.instant_speed_mbps.is_finite());
        assert!(state.average_speed_mbps.is_finite());
        assert!(state.eta_seconds.is_finite());
        assert_close(state.instant_speed_mbps, 100.0);
        assert_close(state.average_speed_mbps, 100.0);
        assert_close(state.eta_seconds, 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_samples_floor_the_average() {
        let mut tracker = ProgressTracker::new(3);

        let state = tracker.on_sample(&sample(0, 0, 0), 2);

        assert_close(state.instant_speed_mbps, 0.0);
        assert_close(state.average_speed_mbps, 0.0);
        assert_close(state.eta_seconds, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_count_is_monotonic_and_bounded() {
        let mut tracker = ProgressTracker::new(5);
        let mut previous = 0;

        for (index, remaining) in [(0, 4), (2, 2), (3, 1), (4, 0)] {
            ::tokio::time::advance(::std::time::Duration::from_millis(250)).await;

            let state = tracker.on_sample(&sample(index, 3, 250), remaining);

            assert!(state.completed_count > previous);
            assert!(state.completed_count <= state.total_count);
            previous = state.completed_count;
        }

        assert_eq!(previous, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_forgets_cumulative_bytes() {
        let mut tracker = ProgressTracker::new(2);

        ::tokio::time::advance(::std::time::Duration::from_secs(1)).await;
        tracker.on_sample(&sample(0, 50, 1000), 1);

        tracker.reset(2);
        ::tokio::time::advance(::std::time::Duration::from_secs(1)).await;
        let state = tracker.on_sample(&sample(0, 1, 1000), 1);

        assert_close(state.average_speed_mbps, 1.0);
    }
}
