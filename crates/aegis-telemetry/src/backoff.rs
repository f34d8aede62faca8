use std::time::Duration;

/// Exponential reconnect backoff: starts at `initial`, doubles per failed
/// cycle, saturates at `max`. Reset on every successful connection.
///
/// Defaults to 500 ms doubling to a 15 s cap; configurable via
/// `[link] backoff_initial_ms` / `backoff_max_ms`.
#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
