use std::collections::VecDeque;
use std::time::Duration;

/// Rolling window of tick durations for instrumentation.
#[derive(Debug, Clone)]
pub struct TickTimer {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one tick, evicting the oldest sample once full.
    pub fn record(&mut self, dt: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(dt);
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_timer_tracks_history() {
        let mut timer = TickTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
    }

    #[test]
    fn tick_timer_evicts_oldest() {
        let mut timer = TickTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
        assert_eq!(timer.min(), Duration::from_millis(20));
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = TickTimer::new(0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.max(), Duration::ZERO);
    }
}
