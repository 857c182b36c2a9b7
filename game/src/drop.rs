use std::time::Duration;

use engine::events::EventQueue;
use engine::rng::Rng;
use engine::tasks::Timers;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::difficulty::DifficultyScheduler;
use crate::events::GameEvent;
use crate::physics::PhysicsCommand;
use crate::piece::{BodyKind, GoldenState, PieceId, Vec2f};
use crate::pool::PiecePool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPhase {
    #[default]
    Idle,
    AwaitingInput,
    Dragging,
    /// Piece released; waiting out the cooldown before the next spawn.
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum DropTask {
    PrepareNext,
    EnableMerge(PieceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Inside the exclusion band of the previous commit.
    Rejected,
    NotHolding,
}

/// Governs the single currently-falling piece: spawn, horizontal placement,
/// commit, cooldown and the forced auto-drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropScheduler {
    phase: DropPhase,
    held: Option<PieceId>,
    current_rank: u8,
    queued_rank: u8,
    #[serde(with = "engine::serde_duration")]
    hold_elapsed: Duration,
    last_commit_x: Option<f32>,
    timers: Timers<DropTask>,
}

impl DropScheduler {
    pub fn new() -> Self {
        Self {
            phase: DropPhase::Idle,
            held: None,
            current_rank: 0,
            queued_rank: 0,
            hold_elapsed: Duration::ZERO,
            last_commit_x: None,
            timers: Timers::new(),
        }
    }

    pub fn phase(&self) -> DropPhase {
        self.phase
    }

    pub fn held(&self) -> Option<PieceId> {
        self.held
    }

    pub fn current_rank(&self) -> u8 {
        self.current_rank
    }

    pub fn queued_rank(&self) -> u8 {
        self.queued_rank
    }

    pub fn last_commit_x(&self) -> Option<f32> {
        self.last_commit_x
    }

    /// Rolls two ranks ahead and spawns the first held piece.
    pub fn activate(
        &mut self,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
    ) {
        self.current_rank = difficulty.sample_rank(rng);
        self.queued_rank = difficulty.sample_rank(rng);
        self.last_commit_x = None;
        events.emit(GameEvent::QueuedRankChanged {
            rank: self.queued_rank,
        });
        self.spawn_held(pool, difficulty, rng, physics, config);
    }

    /// Cancels every pending timer and returns any held piece to the pool.
    pub fn deactivate(&mut self, pool: &mut PiecePool, physics: &mut EventQueue<PhysicsCommand>) {
        self.timers.cancel_all();
        if let Some(id) = self.held.take() {
            if pool.release(id) {
                physics.emit(PhysicsCommand::Remove { id });
            }
        }
        self.phase = DropPhase::Idle;
        self.hold_elapsed = Duration::ZERO;
    }

    pub fn pointer_pressed(&mut self) {
        if self.phase == DropPhase::AwaitingInput && self.held.is_some() {
            self.phase = DropPhase::Dragging;
        }
    }

    /// Tracks the pointer while dragging, clamped so the piece's full radius
    /// stays inside the container.
    pub fn pointer_moved(
        &mut self,
        x: f32,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        config: &GameConfig,
    ) {
        if self.phase != DropPhase::Dragging {
            return;
        }
        let Some(id) = self.held else {
            return;
        };
        let Some(piece) = pool.get_mut(id) else {
            return;
        };
        let r = piece.radius();
        let lo = config.drop.min_x + r;
        let hi = config.drop.max_x - r;
        if lo > hi {
            return;
        }
        let clamped = x.clamp(lo, hi);
        piece.pos.x = clamped;
        piece.pos.y = config.drop.drop_y;
        physics.emit(PhysicsCommand::Teleport { id, pos: piece.pos });
    }

    pub fn pointer_released(
        &mut self,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
        cooldown_multiplier: f32,
    ) -> CommitOutcome {
        if self.phase != DropPhase::Dragging {
            return CommitOutcome::NotHolding;
        }
        self.phase = DropPhase::AwaitingInput;
        self.try_commit(
            false,
            pool,
            difficulty,
            rng,
            physics,
            events,
            config,
            cooldown_multiplier,
        )
    }

    /// Advances hold/cooldown/grace timers. `cooldown_multiplier` is the
    /// fever discount sampled by the session.
    pub fn tick(
        &mut self,
        dt: Duration,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
        cooldown_multiplier: f32,
    ) {
        for task in self.timers.tick(dt) {
            match task {
                DropTask::PrepareNext => {
                    self.prepare_next(pool, difficulty, rng, physics, events, config);
                }
                DropTask::EnableMerge(id) => {
                    // The piece may have vanished (bomb, restart) since the
                    // grace task was scheduled.
                    if let Some(piece) = pool.get_mut(id) {
                        if !piece.is_obstacle {
                            piece.can_merge = true;
                        }
                    }
                }
            }
        }

        if self.held.is_some()
            && matches!(self.phase, DropPhase::AwaitingInput | DropPhase::Dragging)
        {
            self.hold_elapsed = self.hold_elapsed.saturating_add(dt);
            if self.hold_elapsed >= config.drop.auto_drop_time {
                self.try_commit(
                    true,
                    pool,
                    difficulty,
                    rng,
                    physics,
                    events,
                    config,
                    cooldown_multiplier,
                );
            }
        }
    }

    fn try_commit(
        &mut self,
        forced: bool,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
        cooldown_multiplier: f32,
    ) -> CommitOutcome {
        let Some(id) = self.held else {
            return CommitOutcome::NotHolding;
        };
        let Some(piece) = pool.get(id) else {
            self.held = None;
            return CommitOutcome::NotHolding;
        };

        let r = piece.radius();
        let mut x = piece.pos.x;
        if let Some(prev) = self.last_commit_x {
            if (x - prev).abs() < config.drop.exclusion_radius {
                if !forced {
                    events.emit(GameEvent::DropRejected { x });
                    return CommitOutcome::Rejected;
                }
                x = Self::relocate_outside_band(prev, r, rng, config);
            }
        }

        let rank = piece.rank;
        let gravity = difficulty.current_gravity();
        if let Some(piece) = pool.get_mut(id) {
            piece.pos.x = x;
            piece.dropping = false;
            piece.body = BodyKind::Dynamic;
            piece.vel = Vec2f::ZERO;
            physics.emit(PhysicsCommand::Teleport { id, pos: piece.pos });
        }
        physics.emit(PhysicsCommand::SetDynamic {
            id,
            gravity_scale: gravity,
        });

        self.timers
            .schedule(config.drop.merge_grace, DropTask::EnableMerge(id));
        let cooldown = config.drop.cooldown.mul_f32(cooldown_multiplier.max(0.0));
        self.timers.schedule(cooldown, DropTask::PrepareNext);

        self.last_commit_x = Some(x);
        self.held = None;
        self.hold_elapsed = Duration::ZERO;
        self.phase = DropPhase::Committed;
        debug!("drop committed: rank {rank} at x {x:.2} (forced: {forced})");
        events.emit(GameEvent::DropCommitted { rank, x });
        CommitOutcome::Committed
    }

    /// Picks a landing x outside the exclusion band, uniformly over the free
    /// width on both sides. A band covering the whole container degenerates
    /// to the bound farther from the previous commit.
    fn relocate_outside_band(prev: f32, radius: f32, rng: &mut Rng, config: &GameConfig) -> f32 {
        const EPS: f32 = 1e-3;
        let lo = config.drop.min_x + radius;
        let hi = config.drop.max_x - radius;
        if lo >= hi {
            return (config.drop.min_x + config.drop.max_x) / 2.0;
        }

        let band_lo = prev - config.drop.exclusion_radius;
        let band_hi = prev + config.drop.exclusion_radius;
        let left = (band_lo - lo).max(0.0);
        let right = (hi - band_hi).max(0.0);

        let x = if left <= EPS && right <= EPS {
            if prev - lo >= hi - prev { lo } else { hi }
        } else {
            let pick = rng.range_f32(0.0, left + right);
            if pick < left {
                lo + pick
            } else {
                band_hi + (pick - left)
            }
        };
        x.clamp(lo, hi)
    }

    fn prepare_next(
        &mut self,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
        config: &GameConfig,
    ) {
        self.current_rank = self.queued_rank;
        self.queued_rank = difficulty.sample_rank(rng);
        events.emit(GameEvent::QueuedRankChanged {
            rank: self.queued_rank,
        });
        self.spawn_held(pool, difficulty, rng, physics, config);
    }

    fn spawn_held(
        &mut self,
        pool: &mut PiecePool,
        difficulty: &DifficultyScheduler,
        rng: &mut Rng,
        physics: &mut EventQueue<PhysicsCommand>,
        config: &GameConfig,
    ) {
        let id = pool.acquire();
        let golden = rng.chance(config.drop.golden_chance);
        let Some(piece) = pool.get_mut(id) else {
            return;
        };
        piece.init_mergeable(
            self.current_rank,
            Vec2f::new(0.0, config.drop.drop_y),
            true,
        );
        if golden {
            piece.golden = GoldenState::Original;
        }
        physics.emit(PhysicsCommand::Spawn {
            id,
            pos: piece.pos,
            radius: piece.radius(),
            body: BodyKind::Kinematic,
            obstacle: false,
            gravity_scale: difficulty.current_gravity(),
        });
        self.held = Some(id);
        self.hold_elapsed = Duration::ZERO;
        self.phase = DropPhase::AwaitingInput;
    }
}

impl Default for DropScheduler {
    fn default() -> Self {
        Self::new()
    }
}
