use std::time::Duration;

use engine::events::EventQueue;
use engine::rng::Rng;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{DifficultyTier, GameConfig, MAX_RANK};
use crate::events::GameEvent;
use crate::physics::PhysicsCommand;
use crate::piece::{BodyKind, Vec2f};
use crate::pool::PiecePool;

/// Maps cumulative score to gravity, spawn-rank distribution and obstacle
/// cadence. The active tier is the greatest whose threshold is at or below
/// the score; since score only climbs within a session, the tier index never
/// regresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyScheduler {
    tiers: Vec<DifficultyTier>,
    tier_index: usize,
    gravity: f32,
    #[serde(with = "engine::serde_duration")]
    obstacle_elapsed: Duration,
}

impl DifficultyScheduler {
    pub fn new(config: &GameConfig) -> Self {
        let tiers = config.tiers.clone();
        let gravity = tiers
            .first()
            .map(|t| t.gravity_scale)
            .unwrap_or(config.physics.gravity_scale);
        Self {
            tiers,
            tier_index: 0,
            gravity,
            obstacle_elapsed: Duration::ZERO,
        }
    }

    pub fn tier_index(&self) -> usize {
        self.tier_index
    }

    pub fn current_gravity(&self) -> f32 {
        self.gravity
    }

    fn tier(&self) -> Option<&DifficultyTier> {
        self.tiers.get(self.tier_index)
    }

    /// Re-evaluates the tier for `score`. Gravity interpolates between the
    /// current and next tier by the score's fractional position and is pushed
    /// to every active dynamic body whenever it moves; a tier crossing also
    /// emits the tier-changed notification.
    pub fn observe_score(
        &mut self,
        score: u32,
        pool: &PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
    ) {
        if self.tiers.is_empty() {
            return;
        }

        let mut index = 0;
        for (i, tier) in self.tiers.iter().enumerate() {
            if score >= tier.score_threshold {
                index = i;
            }
        }

        let gravity = if index + 1 < self.tiers.len() {
            let start = self.tiers[index].score_threshold as f32;
            let end = self.tiers[index + 1].score_threshold as f32;
            let t = if end > start {
                ((score as f32 - start) / (end - start)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let g0 = self.tiers[index].gravity_scale;
            let g1 = self.tiers[index + 1].gravity_scale;
            g0 + (g1 - g0) * t
        } else {
            self.tiers[index].gravity_scale
        };

        let tier_changed = index != self.tier_index;
        let gravity_changed = (gravity - self.gravity).abs() > 1e-6;
        self.tier_index = index;
        self.gravity = gravity;

        if tier_changed {
            debug!("difficulty tier -> {index} (gravity {gravity:.2})");
            events.emit(GameEvent::TierChanged { tier: index });
        }

        if tier_changed || gravity_changed {
            for piece in pool.active() {
                if piece.body != BodyKind::Dynamic {
                    continue;
                }
                let scale = if piece.is_obstacle {
                    gravity * config.obstacle.gravity_factor
                } else {
                    gravity
                };
                physics.emit(PhysicsCommand::SetGravityScale {
                    id: piece.id,
                    gravity_scale: scale,
                });
            }
        }
    }

    /// Weighted categorical draw over the current tier's rank weights,
    /// offset by its minimum rank. Degenerate weights fall back to the
    /// minimum rank.
    pub fn sample_rank(&self, rng: &mut Rng) -> u8 {
        let Some(tier) = self.tier() else {
            return 0;
        };
        let total: f32 = tier.rank_weights.iter().sum();
        if total <= 0.0 {
            return tier.min_rank;
        }

        let draw = rng.range_f32(0.0, total);
        let mut cumulative = 0.0;
        for (i, weight) in tier.rank_weights.iter().enumerate() {
            cumulative += weight;
            if draw <= cumulative {
                return (tier.min_rank + i as u8).min(tier.max_rank).min(MAX_RANK);
            }
        }
        tier.min_rank
    }

    /// Advances the obstacle timer. Only called while the session is in the
    /// Playing state; a zero cadence disables obstacle spawning for the tier.
    pub fn tick_obstacles(
        &mut self,
        dt: Duration,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        rng: &mut Rng,
        config: &GameConfig,
    ) {
        let Some(interval) = self.tier().map(|t| t.obstacle_interval) else {
            return;
        };
        if interval.is_zero() {
            return;
        }

        self.obstacle_elapsed = self.obstacle_elapsed.saturating_add(dt);
        if self.obstacle_elapsed < interval {
            return;
        }
        self.obstacle_elapsed = Duration::ZERO;

        let half = config.obstacle.size / 2.0;
        let x = rng.range_f32(config.drop.min_x + half, config.drop.max_x - half);
        let id = pool.acquire();
        let gravity_scale = self.gravity * config.obstacle.gravity_factor;
        let Some(piece) = pool.get_mut(id) else {
            return;
        };
        piece.init_obstacle(Vec2f::new(x, config.drop.drop_y), config.obstacle.size);
        debug!("obstacle {id} spawned at x {x:.2}");
        physics.emit(PhysicsCommand::Spawn {
            id,
            pos: piece.pos,
            radius: piece.radius(),
            body: BodyKind::Dynamic,
            obstacle: true,
            gravity_scale,
        });
    }

    pub fn reset(&mut self) {
        self.tier_index = 0;
        self.gravity = self
            .tiers
            .first()
            .map(|t| t.gravity_scale)
            .unwrap_or(self.gravity);
        self.obstacle_elapsed = Duration::ZERO;
    }
}
