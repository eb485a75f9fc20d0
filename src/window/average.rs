use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::value::WindowValue;
use crate::error::{Result, WindowError};

/// One value recorded by [`SlidingWindowAverage::update`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub timestamp: Instant,
    pub value: T,
}

/// Point-in-time copy of a window's contents
///
/// Taken under the same lock as `update` and `get`, so `sum` and `samples`
/// are always mutually consistent.
#[derive(Debug, Clone)]
pub struct WindowSnapshot<T> {
    /// Running sum as maintained incrementally
    pub sum: T,
    /// Retained samples, oldest first
    pub samples: Vec<Sample<T>>,
}

impl<T: WindowValue> WindowSnapshot<T> {
    /// Sum of the retained samples computed from scratch
    pub fn recomputed_sum(&self) -> T {
        self.samples
            .iter()
            .fold(T::zero(), |acc, sample| acc.accumulate(sample.value))
    }
}

#[derive(Debug)]
struct WindowState<T> {
    sum: T,
    samples: VecDeque<Sample<T>>,
}

impl<T: WindowValue> WindowState<T> {
    /// Append a sample and drop everything older than `window`
    ///
    /// Returns the number of evicted samples.
    fn record(&mut self, now: Instant, value: T, window: Duration) -> usize {
        // Compute before mutating so a panicking sum leaves the state intact
        let sum = self.sum.accumulate(value);
        self.samples.push_back(Sample {
            timestamp: now,
            value,
        });
        self.sum = sum;

        let mut evicted = 0;
        while let Some(&oldest) = self.samples.front() {
            if now.saturating_duration_since(oldest.timestamp) <= window {
                break;
            }
            self.sum = self.sum.remove(oldest.value);
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    fn average(&self, empty_default: T) -> T {
        if self.samples.is_empty() {
            empty_default
        } else {
            self.sum.div_count(self.samples.len())
        }
    }
}

/// Running average of the samples recorded within a trailing time window
///
/// Safe to share between threads (e.g. behind an `Arc`). The running sum and
/// the sample queue live behind a single mutex, so every `update` and `get`
/// observes them as one consistent unit.
///
/// Stale samples are evicted only by [`update`](Self::update). A window that
/// stops receiving updates keeps reporting the average of its last samples
/// from [`get`](Self::get), no matter how much time has passed since.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use timewindow::SlidingWindowAverage;
///
/// let avg = SlidingWindowAverage::<u32>::new(Duration::from_secs(5)).unwrap();
/// assert_eq!(avg.get().unwrap(), 0);
///
/// avg.update(2).unwrap();
/// avg.update(4).unwrap();
/// avg.update(6).unwrap();
/// assert_eq!(avg.get().unwrap(), 4);
/// ```
#[derive(Debug)]
pub struct SlidingWindowAverage<T> {
    window: Duration,
    empty_default: T,
    state: Mutex<WindowState<T>>,
}

impl<T: WindowValue> SlidingWindowAverage<T> {
    /// Create a window that reports zero while empty
    pub fn new(window: Duration) -> Result<Self> {
        Self::with_default(window, T::zero())
    }

    /// Create a window that reports `empty_default` while empty
    ///
    /// # Errors
    /// `InvalidConfig` if `window` is zero.
    pub fn with_default(window: Duration, empty_default: T) -> Result<Self> {
        if window.is_zero() {
            return Err(WindowError::InvalidConfig(
                "window duration must be positive".into(),
            ));
        }

        log::debug!("Created sliding window average over {:?}", window);

        Ok(Self {
            window,
            empty_default,
            state: Mutex::new(WindowState {
                sum: T::zero(),
                samples: VecDeque::new(),
            }),
        })
    }

    /// Create a window from a length in milliseconds
    ///
    /// # Errors
    /// `InvalidConfig` if `window_ms` is zero or negative.
    pub fn from_millis(window_ms: i64) -> Result<Self> {
        if window_ms <= 0 {
            return Err(WindowError::InvalidConfig(format!(
                "window duration must be positive, got {}ms",
                window_ms
            )));
        }
        Self::new(Duration::from_millis(window_ms as u64))
    }

    /// Record a value at the current instant and evict expired samples
    ///
    /// A sample whose age equals the window length exactly is kept; only
    /// strictly older samples are evicted.
    pub fn update(&self, value: T) -> Result<()> {
        let mut state = self.lock()?;
        // Read the clock under the lock so queue order is timestamp order
        let now = Instant::now();
        let evicted = state.record(now, value, self.window);
        if evicted > 0 {
            log::trace!(
                "Evicted {} stale samples, {} retained",
                evicted,
                state.samples.len()
            );
        }
        Ok(())
    }

    /// Average of the retained samples, or the empty default
    ///
    /// Does not evict: samples that expired since the last `update` still
    /// count until the next `update` removes them.
    pub fn get(&self) -> Result<T> {
        let state = self.lock()?;
        Ok(state.average(self.empty_default))
    }

    /// Number of retained samples
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.samples.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.samples.is_empty())
    }

    /// Copy the running sum and retained samples atomically
    pub fn snapshot(&self) -> Result<WindowSnapshot<T>> {
        let state = self.lock()?;
        Ok(WindowSnapshot {
            sum: state.sum,
            samples: state.samples.iter().copied().collect(),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn empty_default(&self) -> T {
        self.empty_default
    }

    /// Resume using a window whose lock was poisoned
    ///
    /// Updates never leave the sum and the queue out of step, even when the
    /// sample arithmetic panics, so the state behind a poisoned lock is
    /// still valid.
    pub fn clear_poison(&self) {
        if self.state.is_poisoned() {
            log::warn!("Clearing poisoned sliding window lock");
            self.state.clear_poison();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WindowState<T>>> {
        self.state.lock().map_err(|_| WindowError::LockPoisoned)
    }
}

#[cfg(test)]
impl<T: WindowValue> SlidingWindowAverage<T> {
    fn update_at(&self, now: Instant, value: T) -> Result<()> {
        let mut state = self.lock()?;
        state.record(now, value, self.window);
        Ok(())
    }

    /// Poison the lock the way a panicking update would
    pub(crate) fn poison(&self)
    where
        T: Send + Sync,
    {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.state.lock();
                    panic!("poisoning window lock");
                })
                .join();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn test_empty_window_returns_default() {
        let avg = SlidingWindowAverage::<i32>::new(WINDOW).unwrap();
        assert_eq!(avg.get().unwrap(), 0);
        assert!(avg.is_empty().unwrap());

        let avg = SlidingWindowAverage::with_default(WINDOW, -1i32).unwrap();
        assert_eq!(avg.get().unwrap(), -1);
        assert_eq!(avg.empty_default(), -1);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = SlidingWindowAverage::<f64>::new(Duration::ZERO);
        assert!(matches!(result, Err(WindowError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_positive_millis_rejected() {
        assert!(matches!(
            SlidingWindowAverage::<u32>::from_millis(0),
            Err(WindowError::InvalidConfig(_))
        ));
        assert!(matches!(
            SlidingWindowAverage::<u32>::from_millis(-50),
            Err(WindowError::InvalidConfig(_))
        ));

        let avg = SlidingWindowAverage::<u32>::from_millis(250).unwrap();
        assert_eq!(avg.window(), Duration::from_millis(250));
    }

    #[test]
    fn test_single_sample() {
        let avg = SlidingWindowAverage::<i64>::new(Duration::from_secs(60)).unwrap();
        avg.update(42).unwrap();
        assert_eq!(avg.get().unwrap(), 42);
        assert_eq!(avg.len().unwrap(), 1);
    }

    #[test]
    fn test_average_of_samples() {
        let avg = SlidingWindowAverage::<i32>::new(Duration::from_secs(60)).unwrap();
        avg.update(2).unwrap();
        avg.update(4).unwrap();
        avg.update(6).unwrap();
        assert_eq!(avg.get().unwrap(), 4);
    }

    #[test]
    fn test_integer_average_truncates() {
        let avg = SlidingWindowAverage::<u32>::new(Duration::from_secs(60)).unwrap();
        avg.update(1).unwrap();
        avg.update(2).unwrap();
        assert_eq!(avg.get().unwrap(), 1);

        let avg = SlidingWindowAverage::<f64>::new(Duration::from_secs(60)).unwrap();
        avg.update(1.0).unwrap();
        avg.update(2.0).unwrap();
        assert!((avg.get().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_stale_sample_evicted() {
        let avg = SlidingWindowAverage::<i32>::new(WINDOW).unwrap();
        let t0 = Instant::now();

        avg.update_at(t0, 10).unwrap();
        avg.update_at(t0 + WINDOW + Duration::from_millis(1), 20)
            .unwrap();

        assert_eq!(avg.get().unwrap(), 20);
        assert_eq!(avg.len().unwrap(), 1);
    }

    #[test]
    fn test_sample_at_window_boundary_kept() {
        let avg = SlidingWindowAverage::<i32>::new(WINDOW).unwrap();
        let t0 = Instant::now();

        avg.update_at(t0, 10).unwrap();
        avg.update_at(t0 + WINDOW, 20).unwrap();
        assert_eq!(avg.get().unwrap(), 15);
        assert_eq!(avg.len().unwrap(), 2);

        // One nanosecond later the first sample is strictly older than the window
        avg.update_at(t0 + WINDOW + Duration::from_nanos(1), 30)
            .unwrap();
        assert_eq!(avg.get().unwrap(), 25);
        assert_eq!(avg.len().unwrap(), 2);
    }

    #[test]
    fn test_eviction_empties_all_but_newest() {
        let avg = SlidingWindowAverage::<u64>::new(WINDOW).unwrap();
        let t0 = Instant::now();
        for i in 0..10 {
            avg.update_at(t0 + Duration::from_millis(i), 100).unwrap();
        }
        assert_eq!(avg.len().unwrap(), 10);

        avg.update_at(t0 + Duration::from_secs(1), 7).unwrap();
        let snapshot = avg.snapshot().unwrap();
        assert_eq!(snapshot.samples.len(), 1);
        assert_eq!(snapshot.sum, 7);
        assert_eq!(avg.get().unwrap(), 7);
    }

    #[test]
    fn test_get_does_not_evict() {
        let avg = SlidingWindowAverage::<i32>::new(Duration::from_millis(20)).unwrap();
        avg.update(5).unwrap();
        avg.update(7).unwrap();

        thread::sleep(Duration::from_millis(40));

        for _ in 0..3 {
            assert_eq!(avg.get().unwrap(), 6);
        }
        assert_eq!(avg.len().unwrap(), 2);
    }

    #[test]
    fn test_samples_kept_in_insertion_order() {
        let avg = SlidingWindowAverage::<u32>::new(Duration::from_secs(60)).unwrap();
        let t0 = Instant::now();
        for i in 0..20u32 {
            avg.update_at(t0 + Duration::from_micros(i as u64), i)
                .unwrap();
        }

        let snapshot = avg.snapshot().unwrap();
        let values: Vec<u32> = snapshot.samples.iter().map(|s| s.value).collect();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
        assert!(
            snapshot
                .samples
                .windows(2)
                .all(|w| w[0].timestamp <= w[1].timestamp)
        );
    }

    #[test]
    fn test_wrapped_sum_recovers_after_eviction() {
        let avg = SlidingWindowAverage::<i8>::new(WINDOW).unwrap();
        let t0 = Instant::now();

        avg.update_at(t0, 100).unwrap();
        avg.update_at(t0 + Duration::from_millis(1), 100).unwrap();
        // True sum 200 does not fit in i8: -56 / 2
        assert_eq!(avg.get().unwrap(), -28);

        avg.update_at(t0 + Duration::from_millis(2) + WINDOW, 10)
            .unwrap();
        assert_eq!(avg.get().unwrap(), 10);
        assert_eq!(avg.snapshot().unwrap().sum, 10);
    }

    #[test]
    fn test_poisoned_lock_reported_and_recoverable() {
        let avg =
            Arc::new(SlidingWindowAverage::<Duration>::new(Duration::from_secs(60)).unwrap());
        avg.update(Duration::MAX).unwrap();

        let worker = Arc::clone(&avg);
        let result = thread::spawn(move || worker.update(Duration::from_secs(1))).join();
        assert!(result.is_err(), "Duration overflow should panic");

        assert!(matches!(avg.get(), Err(WindowError::LockPoisoned)));
        assert!(matches!(avg.snapshot(), Err(WindowError::LockPoisoned)));

        avg.clear_poison();
        assert_eq!(avg.len().unwrap(), 1);
        assert_eq!(avg.get().unwrap(), Duration::MAX);
    }
}
