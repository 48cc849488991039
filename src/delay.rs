// Blocking delays between commands
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CANCEL_POLL;

/// Suspends the calling thread between commands
pub trait Delay {
    fn delay(&mut self, duration: Duration);

    /// Whether the caller should abandon its sequence
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Real delay backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingDelay;

impl Delay for BlockingDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without sleeping (tests and dry runs)
#[derive(Debug, Clone, Default)]
pub struct RecordedDelay {
    calls: Vec<Duration>,
}

impl RecordedDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[Duration] {
        &self.calls
    }

    pub fn total(&self) -> Duration {
        self.calls.iter().sum()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Delay for RecordedDelay {
    fn delay(&mut self, duration: Duration) {
        self.calls.push(duration);
    }
}

/// Sleeps in short slices and returns early once `flag` is set
///
/// Long drive legs wait on this so an interrupt is noticed within one slice
/// instead of after the whole leg.
#[derive(Debug, Clone)]
pub struct CancellableDelay<D: Delay = BlockingDelay> {
    inner: D,
    flag: Arc<AtomicBool>,
    slice: Duration,
}

impl CancellableDelay<BlockingDelay> {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self::with_inner(BlockingDelay, flag)
    }
}

impl<D: Delay> CancellableDelay<D> {
    pub fn with_inner(inner: D, flag: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            flag,
            slice: CANCEL_POLL,
        }
    }

    /// Poll the flag every `slice` (at least 1 ms)
    pub fn with_slice(mut self, slice: Duration) -> Self {
        self.slice = slice.max(Duration::from_millis(1));
        self
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Delay> Delay for CancellableDelay<D> {
    fn delay(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() && !self.is_cancelled() {
            let step = remaining.min(self.slice);
            self.inner.delay(step);
            remaining -= step;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellable_delay_slices() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut delay = CancellableDelay::with_inner(RecordedDelay::new(), flag)
            .with_slice(Duration::from_millis(100));

        delay.delay(Duration::from_millis(250));
        assert_eq!(
            delay.inner().calls(),
            &[
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(50)
            ]
        );
        assert!(!delay.is_cancelled());
    }

    #[test]
    fn test_cancellable_delay_returns_once_flagged() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut delay = CancellableDelay::with_inner(RecordedDelay::new(), flag.clone());

        delay.delay(Duration::from_secs(11));
        assert!(delay.inner().calls().is_empty());
        assert!(delay.is_cancelled());

        flag.store(false, Ordering::Relaxed);
        delay.delay(CANCEL_POLL);
        assert_eq!(delay.inner().total(), CANCEL_POLL);
    }

    #[test]
    fn test_zero_slice_still_progresses() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut delay =
            CancellableDelay::with_inner(RecordedDelay::new(), flag).with_slice(Duration::ZERO);
        delay.delay(Duration::from_millis(3));
        assert_eq!(delay.inner().calls().len(), 3);
    }

    #[test]
    fn test_plain_delays_never_cancel() {
        assert!(!BlockingDelay.is_cancelled());
        assert!(!RecordedDelay::new().is_cancelled());
    }
}
