use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pending<T> {
    #[serde(with = "crate::serde_duration")]
    remaining: Duration,
    payload: T,
}

/// Suspended tasks: a payload plus the time left until it fires.
///
/// `tick` advances every pending task once per frame and returns the payloads
/// whose timers elapsed, in scheduling order. A payload is untouched until it
/// is returned, so callers get the mutate-only-at-completion contract for
/// free; `cancel_all` hands the unfired payloads back for cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timers<T> {
    pending: Vec<Pending<T>>,
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, after: Duration, payload: T) {
        self.pending.push(Pending {
            remaining: after,
            payload,
        });
    }

    pub fn tick(&mut self, dt: Duration) -> Vec<T> {
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            let task = &mut self.pending[i];
            task.remaining = task.remaining.saturating_sub(dt);
            if task.remaining.is_zero() {
                fired.push(self.pending.remove(i).payload);
            } else {
                i += 1;
            }
        }
        fired
    }

    pub fn cancel_all(&mut self) -> Vec<T> {
        self.pending.drain(..).map(|task| task.payload).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_once_elapsed() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(100), "a");
        assert!(timers.tick(Duration::from_millis(60)).is_empty());
        assert_eq!(timers.tick(Duration::from_millis(60)), vec!["a"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn fires_in_scheduling_order_within_a_tick() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(50), 1);
        timers.schedule(Duration::from_millis(20), 2);
        timers.schedule(Duration::from_millis(80), 3);
        // All three elapse in one large tick; order is scheduling order.
        assert_eq!(timers.tick(Duration::from_millis(100)), vec![1, 2, 3]);
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut timers = Timers::new();
        timers.schedule(Duration::ZERO, "now");
        assert_eq!(timers.tick(Duration::ZERO), vec!["now"]);
    }

    #[test]
    fn cancel_returns_unfired_payloads() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_secs(1), "x");
        timers.schedule(Duration::from_secs(2), "y");
        timers.tick(Duration::from_millis(10));
        assert_eq!(timers.cancel_all(), vec!["x", "y"]);
        assert!(timers.is_empty());
        assert!(timers.tick(Duration::from_secs(10)).is_empty());
    }
}
