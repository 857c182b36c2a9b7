use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ContainerTuning;
use crate::pool::PiecePool;

/// Container overflow watchdog. Time accrues while any settled, merge-enabled
/// piece pokes above the game-over line; the session ends once the grace
/// delay runs out. Merges reset the clock — a board in motion still has a
/// chance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverflowWatchdog {
    #[serde(with = "engine::serde_duration")]
    elapsed: Duration,
    warning: bool,
}

impl OverflowWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&self) -> bool {
        self.warning
    }

    pub fn progress(&self, container: &ContainerTuning) -> f32 {
        if container.game_over_delay.is_zero() {
            return 0.0;
        }
        (self.elapsed.as_secs_f32() / container.game_over_delay.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Returns true when the overflow delay has fully elapsed.
    pub fn tick(&mut self, dt: Duration, pool: &PiecePool, container: &ContainerTuning) -> bool {
        let any_above = pool.active().iter().any(|p| {
            p.can_merge && !p.is_merging && p.is_settled() && p.top() > container.game_over_line_y
        });

        if !any_above {
            self.elapsed = Duration::ZERO;
            self.warning = false;
            return false;
        }

        self.warning = true;
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= container.game_over_delay {
            self.reset();
            return true;
        }
        false
    }

    pub fn on_merge(&mut self) {
        self.elapsed = Duration::ZERO;
        self.warning = false;
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.warning = false;
    }
}
