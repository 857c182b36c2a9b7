use std::time::Duration;

use engine::events::EventQueue;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::FeverTuning;
use crate::events::GameEvent;

/// Combo window for the combo/fever tracker, grounded on the original
/// `FeverManager`'s `const float ComboWindow = 1.5f`.
const COMBO_WINDOW: Duration = Duration::from_millis(1500);

/// Combo and fever tracking, driven purely by merge events.
///
/// Two counters share the combo window: `combo` feeds scoring and resets to
/// 1 whenever the gap between merges exceeds the window; `consecutive`
/// triggers fever at the threshold and is cleared when fever starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeverTracker {
    tuning: FeverTuning,
    combo: u32,
    consecutive: u32,
    has_merged: bool,
    #[serde(with = "engine::serde_duration")]
    last_merge_at: Duration,
    active: bool,
    #[serde(with = "engine::serde_duration")]
    remaining: Duration,
}

impl FeverTracker {
    pub fn new(tuning: FeverTuning) -> Self {
        Self {
            tuning,
            combo: 0,
            consecutive: 0,
            has_merged: false,
            last_merge_at: Duration::ZERO,
            active: false,
            remaining: Duration::ZERO,
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn score_multiplier(&self) -> f32 {
        if self.active {
            self.tuning.score_multiplier
        } else {
            1.0
        }
    }

    pub fn cooldown_multiplier(&self) -> f32 {
        if self.active {
            self.tuning.cooldown_multiplier
        } else {
            1.0
        }
    }

    /// Registers a merge at session time `now` and returns the combo count
    /// that merge scores with. Fever start is deferred to
    /// `maybe_start_fever` so the triggering merge is not doubled.
    pub fn register_merge(&mut self, now: Duration) -> u32 {
        let within = self.has_merged
            && now.saturating_sub(self.last_merge_at) < COMBO_WINDOW;
        if within {
            self.combo += 1;
            self.consecutive += 1;
        } else {
            self.combo = 1;
            self.consecutive = 1;
        }
        self.has_merged = true;
        self.last_merge_at = now;
        self.combo
    }

    pub fn maybe_start_fever(&mut self, events: &mut EventQueue<GameEvent>) {
        if self.active || self.consecutive < self.tuning.combo_threshold {
            return;
        }
        self.active = true;
        self.remaining = self.tuning.duration;
        self.consecutive = 0;
        debug!("fever started");
        events.emit(GameEvent::FeverStarted);
    }

    pub fn tick(&mut self, dt: Duration, events: &mut EventQueue<GameEvent>) {
        if !self.active {
            return;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        let normalized = if self.tuning.duration.is_zero() {
            0.0
        } else {
            self.remaining.as_secs_f32() / self.tuning.duration.as_secs_f32()
        };
        events.emit(GameEvent::FeverProgress {
            remaining: normalized.clamp(0.0, 1.0),
        });
        if self.remaining.is_zero() {
            self.active = false;
            debug!("fever ended");
            events.emit(GameEvent::FeverEnded);
        }
    }

    pub fn reset(&mut self) {
        self.combo = 0;
        self.consecutive = 0;
        self.has_merged = false;
        self.last_merge_at = Duration::ZERO;
        self.active = false;
        self.remaining = Duration::ZERO;
    }
}
