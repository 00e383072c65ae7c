//! Debounced save timing.
//!
//! The scheduler holds no thread or timer of its own. The event loop asks
//! it how long it may block and fires the save once the deadline passes.

use std::time::{Duration, Instant};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DELAY)
    }
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)starts the quiet period. An earlier pending deadline is replaced.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clears and reports the deadline if it has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Clears the deadline, reporting whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Time left before the save fires, `None` when nothing is pending.
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(500));
        assert!(!scheduler.is_pending());

        scheduler.schedule(start);
        assert!(!scheduler.take_due(start + Duration::from_millis(499)));
        assert!(scheduler.take_due(start + Duration::from_millis(500)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_reschedule_resets_timer() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(500));

        scheduler.schedule(start);
        scheduler.schedule(start + Duration::from_millis(400));
        assert!(!scheduler.is_due(start + Duration::from_millis(600)));
        assert!(scheduler.is_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::default();
        assert!(!scheduler.cancel());

        scheduler.schedule(start);
        assert!(scheduler.cancel());
        assert!(!scheduler.is_due(start + Duration::from_secs(10)));
        assert_eq!(scheduler.time_until(start), None);
    }

    #[test]
    fn test_time_until_saturates() {
        let start = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(200));
        scheduler.schedule(start);
        assert_eq!(scheduler.time_until(start), Some(Duration::from_millis(200)));
        assert_eq!(scheduler.time_until(start + Duration::from_secs(1)), Some(Duration::ZERO));
    }
}
