use std::time::Duration;

use engine::events::EventQueue;
use engine::rng::Rng;
use engine::store::KeyValueStore;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::challenge::DailyChallenge;
use crate::config::GameConfig;
use crate::difficulty::DifficultyScheduler;
use crate::drop::{CommitOutcome, DropScheduler};
use crate::events::GameEvent;
use crate::fever::FeverTracker;
use crate::merge::{MergeEngine, MergeResolution};
use crate::physics::PhysicsCommand;
use crate::piece::{GoldenState, PieceId, Vec2f};
use crate::pool::PiecePool;
use crate::score::ScoreLedger;
use crate::skills::{SkillActivation, SkillEconomy, SkillKind};
use crate::watchdog::OverflowWatchdog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    #[default]
    Ready,
    Playing,
    GameOver,
    Reviving,
}

/// The whole gameplay core under one roof. Components are constructed once
/// and wired through this session; there are no globals. The host drives it
/// with `tick`, pointer input, contact notifications and motion sync, and
/// drains events and physics commands once per frame.
pub struct GameSession {
    config: GameConfig,
    phase: GamePhase,
    clock: Duration,
    pool: PiecePool,
    difficulty: DifficultyScheduler,
    dropper: DropScheduler,
    merges: MergeEngine,
    ledger: ScoreLedger,
    fever: FeverTracker,
    skills: SkillEconomy,
    challenge: DailyChallenge,
    watchdog: OverflowWatchdog,
    rng: Rng,
    events: EventQueue<GameEvent>,
    physics: EventQueue<PhysicsCommand>,
    store: Box<dyn KeyValueStore>,
}

impl GameSession {
    /// `today` is the host-supplied calendar day (`YYYYMMDD`); the core never
    /// reads a clock of its own.
    pub fn new(
        config: GameConfig,
        mut store: Box<dyn KeyValueStore>,
        today: &str,
        seed: u64,
    ) -> Self {
        let config = config.sanitized();
        let ledger = ScoreLedger::load(store.as_ref());
        let challenge = DailyChallenge::load_or_generate(today, store.as_mut());
        let difficulty = DifficultyScheduler::new(&config);
        let fever = FeverTracker::new(config.fever);
        let skills = SkillEconomy::new(config.skills);

        let mut session = Self {
            phase: GamePhase::Ready,
            clock: Duration::ZERO,
            pool: PiecePool::new(),
            difficulty,
            dropper: DropScheduler::new(),
            merges: MergeEngine::new(),
            ledger,
            fever,
            skills,
            challenge,
            watchdog: OverflowWatchdog::new(),
            rng: Rng::new(seed),
            events: EventQueue::new(),
            physics: EventQueue::new(),
            store,
            config,
        };
        session.events.emit(GameEvent::PhaseChanged {
            phase: GamePhase::Ready,
        });
        session
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn pool(&self) -> &PiecePool {
        &self.pool
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn score(&self) -> u32 {
        self.ledger.current()
    }

    pub fn fever(&self) -> &FeverTracker {
        &self.fever
    }

    pub fn skills(&self) -> &SkillEconomy {
        &self.skills
    }

    pub fn skills_mut(&mut self) -> &mut SkillEconomy {
        &mut self.skills
    }

    pub fn challenge(&self) -> &DailyChallenge {
        &self.challenge
    }

    pub fn dropper(&self) -> &DropScheduler {
        &self.dropper
    }

    pub fn difficulty(&self) -> &DifficultyScheduler {
        &self.difficulty
    }

    pub fn watchdog(&self) -> &OverflowWatchdog {
        &self.watchdog
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn drain_physics_commands(&mut self) -> Vec<PhysicsCommand> {
        self.physics.drain()
    }

    /// Starts (or restarts) a round from Ready or GameOver.
    pub fn start_game(&mut self) -> bool {
        if !matches!(self.phase, GamePhase::Ready | GamePhase::GameOver) {
            return false;
        }

        self.dropper.deactivate(&mut self.pool, &mut self.physics);
        self.merges.cancel_all(&mut self.pool, &mut self.physics);
        for id in self.pool.release_all() {
            self.physics.emit(PhysicsCommand::Remove { id });
        }
        self.ledger.reset_current(&mut self.events);
        self.fever.reset();
        self.skills.reset();
        self.difficulty.reset();
        self.watchdog.reset();
        self.clock = Duration::ZERO;

        // A completed challenge from an earlier session pays out now.
        if self.challenge.try_consume_reward(self.store.as_mut()) {
            self.skills
                .grant_free_charge(SkillKind::Shake, &mut self.events);
        }
        self.challenge.reset_for_new_game(&mut self.events);

        self.set_phase(GamePhase::Playing);
        self.dropper.activate(
            &mut self.pool,
            &self.difficulty,
            &mut self.rng,
            &mut self.physics,
            &mut self.events,
            &self.config,
        );
        true
    }

    /// One logical advance, in fixed order: schedulers, then the merge
    /// engine, then the trackers. No-op outside the Playing state.
    pub fn tick(&mut self, dt: Duration) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.clock = self.clock.saturating_add(dt);

        self.difficulty.tick_obstacles(
            dt,
            &mut self.pool,
            &mut self.physics,
            &mut self.rng,
            &self.config,
        );

        let cooldown_multiplier = self.fever.cooldown_multiplier();
        self.dropper.tick(
            dt,
            &mut self.pool,
            &self.difficulty,
            &mut self.rng,
            &mut self.physics,
            &mut self.events,
            &self.config,
            cooldown_multiplier,
        );

        let gravity = self.difficulty.current_gravity();
        let resolutions = self
            .merges
            .tick(dt, &mut self.pool, &mut self.physics, gravity);
        for resolution in resolutions {
            self.apply_resolution(resolution);
        }

        self.fever.tick(dt, &mut self.events);

        if self
            .watchdog
            .tick(dt, &self.pool, &self.config.container)
        {
            self.finish_game();
        }
    }

    /// Contact notification from the physics collaborator.
    pub fn notify_contact(&mut self, a: PieceId, b: PieceId) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        self.merges
            .notify_contact(a, b, &mut self.pool, &mut self.physics, &self.config)
    }

    /// Mirrors host-integrated body motion into the core. Frozen and held
    /// pieces are core-owned and ignore the sync.
    pub fn sync_motion(&mut self, id: PieceId, pos: Vec2f, vel: Vec2f) {
        if let Some(piece) = self.pool.get_mut(id) {
            if !piece.is_merging && !piece.dropping {
                piece.pos = pos;
                piece.vel = vel;
            }
        }
    }

    pub fn pointer_pressed(&mut self) {
        if self.phase != GamePhase::Playing || self.skills.in_selection() {
            return;
        }
        self.dropper.pointer_pressed();
    }

    pub fn pointer_moved(&mut self, x: f32) {
        if self.phase != GamePhase::Playing || self.skills.in_selection() {
            return;
        }
        self.dropper
            .pointer_moved(x, &mut self.pool, &mut self.physics, &self.config);
    }

    pub fn pointer_released(&mut self) -> CommitOutcome {
        if self.phase != GamePhase::Playing || self.skills.in_selection() {
            return CommitOutcome::NotHolding;
        }
        let cooldown_multiplier = self.fever.cooldown_multiplier();
        self.dropper.pointer_released(
            &mut self.pool,
            &self.difficulty,
            &mut self.rng,
            &mut self.physics,
            &mut self.events,
            &self.config,
            cooldown_multiplier,
        )
    }

    pub fn activate_skill(&mut self, kind: SkillKind) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        match self.skills.activate(
            kind,
            &self.pool,
            &mut self.physics,
            &mut self.rng,
            &mut self.events,
        ) {
            SkillActivation::Executed => {
                self.challenge.notify_skill_used(&mut self.events);
                true
            }
            SkillActivation::SelectionStarted => true,
            SkillActivation::NotReady => false,
        }
    }

    /// External "piece selected" signal while a selection skill is pending.
    pub fn select_piece(&mut self, id: PieceId) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        if self
            .skills
            .select(id, &mut self.pool, &mut self.physics, &mut self.events)
        {
            self.challenge.notify_skill_used(&mut self.events);
            true
        } else {
            false
        }
    }

    pub fn cancel_selection(&mut self) {
        self.skills.cancel_selection(&mut self.events);
    }

    /// Clears everything above the game-over line and resumes play.
    pub fn revive(&mut self) -> bool {
        if self.phase != GamePhase::GameOver {
            return false;
        }
        self.set_phase(GamePhase::Reviving);
        for id in self
            .pool
            .release_above(self.config.container.game_over_line_y)
        {
            self.physics.emit(PhysicsCommand::Remove { id });
        }
        self.watchdog.reset();
        self.set_phase(GamePhase::Playing);
        self.dropper.activate(
            &mut self.pool,
            &self.difficulty,
            &mut self.rng,
            &mut self.physics,
            &mut self.events,
            &self.config,
        );
        true
    }

    /// Spawns a landed, merge-enabled piece directly; test support in the
    /// spirit of the usual fixture helpers.
    pub fn spawn_piece_for_test(&mut self, rank: u8, pos: Vec2f, golden: GoldenState) -> PieceId {
        let id = self.pool.acquire();
        if let Some(piece) = self.pool.get_mut(id) {
            piece.init_mergeable(rank, pos, false);
            piece.can_merge = true;
            piece.golden = golden;
        }
        id
    }

    fn apply_resolution(&mut self, resolution: MergeResolution) {
        match resolution {
            MergeResolution::RankUp {
                new_rank,
                pos,
                golden_parent,
                ..
            } => {
                let combo = self.fever.register_merge(self.clock);
                let mut score = self.config.merge_score(new_rank, combo);
                if self.ledger.claim_first_reach(new_rank) {
                    score += self.config.first_reach_bonus(new_rank);
                }
                if golden_parent {
                    score *= 5;
                }
                // Fever is sampled before the tracker advances, so the merge
                // that triggers fever still scores at 1x.
                score = (score as f32 * self.fever.score_multiplier()).round() as u32;

                self.ledger.add(score, self.store.as_mut(), &mut self.events);
                self.ledger
                    .record_rank(new_rank, self.store.as_mut(), &mut self.events);
                self.difficulty.observe_score(
                    self.ledger.current(),
                    &self.pool,
                    &mut self.physics,
                    &mut self.events,
                    &self.config,
                );
                self.fever.maybe_start_fever(&mut self.events);
                self.skills.on_merge(&mut self.events);
                self.watchdog.on_merge();
                self.challenge.observe_merge(
                    new_rank,
                    combo,
                    self.store.as_mut(),
                    &mut self.events,
                );
                self.challenge.observe_score(
                    self.ledger.current(),
                    self.store.as_mut(),
                    &mut self.events,
                );
                self.events.emit(GameEvent::MergeCompleted {
                    new_rank,
                    pos,
                    combo,
                });
            }
            MergeResolution::Annihilated { pos } => {
                let score = self.config.annihilation_score();
                self.ledger.add(score, self.store.as_mut(), &mut self.events);
                self.difficulty.observe_score(
                    self.ledger.current(),
                    &self.pool,
                    &mut self.physics,
                    &mut self.events,
                    &self.config,
                );
                self.watchdog.on_merge();
                self.challenge.observe_score(
                    self.ledger.current(),
                    self.store.as_mut(),
                    &mut self.events,
                );
                self.events.emit(GameEvent::Annihilated { pos });
            }
        }
    }

    fn finish_game(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        debug!("game over at score {}", self.ledger.current());
        self.dropper.deactivate(&mut self.pool, &mut self.physics);
        self.merges.cancel_all(&mut self.pool, &mut self.physics);
        self.ledger.on_game_end(self.store.as_mut());
        self.set_phase(GamePhase::GameOver);
    }

    fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
        self.events.emit(GameEvent::PhaseChanged { phase });
    }
}
