use engine::events::EventQueue;
use engine::rng::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SkillTuning;
use crate::events::GameEvent;
use crate::physics::PhysicsCommand;
use crate::piece::{BodyKind, PieceId, Vec2f};
use crate::pool::PiecePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillKind {
    /// Immediate: random impulse to every active dynamic non-merging piece.
    Shake,
    /// Selection: lower the chosen piece's rank by one.
    Downgrade,
    /// Selection: remove the chosen piece and its nearest neighbour.
    Bomb,
}

impl SkillKind {
    pub const ALL: [SkillKind; 3] = [SkillKind::Shake, SkillKind::Downgrade, SkillKind::Bomb];

    fn index(self) -> usize {
        match self {
            SkillKind::Shake => 0,
            SkillKind::Downgrade => 1,
            SkillKind::Bomb => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillActivation {
    NotReady,
    Executed,
    SelectionStarted,
}

/// Per-skill charge economy. Every rank-up merge feeds one charge to each
/// skill; a skill is ready once its counter reaches its cost, and activating
/// always drains the counter back to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEconomy {
    costs: [u32; 3],
    charges: [u32; 3],
    /// Skill awaiting an external "piece selected" signal, if any.
    pending_selection: Option<SkillKind>,
}

impl SkillEconomy {
    pub fn new(tuning: SkillTuning) -> Self {
        Self {
            costs: [tuning.shake_cost, tuning.downgrade_cost, tuning.bomb_cost],
            charges: [0; 3],
            pending_selection: None,
        }
    }

    pub fn charge(&self, kind: SkillKind) -> u32 {
        self.charges[kind.index()]
    }

    pub fn cost(&self, kind: SkillKind) -> u32 {
        self.costs[kind.index()]
    }

    pub fn is_ready(&self, kind: SkillKind) -> bool {
        self.charge(kind) >= self.cost(kind)
    }

    pub fn in_selection(&self) -> bool {
        self.pending_selection.is_some()
    }

    pub fn pending_selection(&self) -> Option<SkillKind> {
        self.pending_selection
    }

    /// One charge per merge event for every skill, capped at its cost. The
    /// ready notification edge-fires exactly on the crossing tick.
    pub fn on_merge(&mut self, events: &mut EventQueue<GameEvent>) {
        for kind in SkillKind::ALL {
            let i = kind.index();
            if self.charges[i] >= self.costs[i] {
                continue;
            }
            self.charges[i] += 1;
            events.emit(GameEvent::SkillChargeChanged {
                kind,
                charge: self.charges[i],
            });
            if self.charges[i] == self.costs[i] {
                events.emit(GameEvent::SkillReady { kind });
            }
        }
    }

    pub fn activate(
        &mut self,
        kind: SkillKind,
        pool: &PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        rng: &mut Rng,
        events: &mut EventQueue<GameEvent>,
    ) -> SkillActivation {
        if !self.is_ready(kind) || self.in_selection() {
            return SkillActivation::NotReady;
        }

        match kind {
            SkillKind::Shake => {
                for piece in pool.active() {
                    if piece.body != BodyKind::Dynamic || piece.is_merging {
                        continue;
                    }
                    let impulse =
                        Vec2f::new(rng.range_f32(-3.0, 3.0), rng.range_f32(1.0, 4.0));
                    physics.emit(PhysicsCommand::Impulse {
                        id: piece.id,
                        impulse,
                    });
                }
                self.consume(kind, events);
                SkillActivation::Executed
            }
            SkillKind::Downgrade | SkillKind::Bomb => {
                self.pending_selection = Some(kind);
                events.emit(GameEvent::SelectionModeChanged { active: true });
                SkillActivation::SelectionStarted
            }
        }
    }

    /// Applies the pending selection skill to `target`. Returns true when the
    /// effect ran and the charge was consumed; an invalid target leaves
    /// selection mode open.
    pub fn select(
        &mut self,
        target: PieceId,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        events: &mut EventQueue<GameEvent>,
    ) -> bool {
        let Some(kind) = self.pending_selection else {
            return false;
        };
        if !pool.contains(target) {
            return false;
        }

        match kind {
            SkillKind::Downgrade => {
                let Some(piece) = pool.get_mut(target) else {
                    return false;
                };
                if piece.is_obstacle {
                    return false;
                }
                piece.downgrade();
            }
            SkillKind::Bomb => {
                let target_pos = match pool.get(target) {
                    Some(p) => p.pos,
                    None => return false,
                };
                let nearest = pool
                    .active()
                    .iter()
                    .filter(|p| p.id != target)
                    .min_by(|a, b| {
                        a.pos
                            .distance(target_pos)
                            .total_cmp(&b.pos.distance(target_pos))
                    })
                    .map(|p| p.id);

                pool.release(target);
                physics.emit(PhysicsCommand::Remove { id: target });
                if let Some(nearest) = nearest {
                    pool.release(nearest);
                    physics.emit(PhysicsCommand::Remove { id: nearest });
                }
            }
            SkillKind::Shake => return false,
        }

        self.consume(kind, events);
        self.exit_selection(events);
        true
    }

    /// Leaves selection mode without consuming the charge.
    pub fn cancel_selection(&mut self, events: &mut EventQueue<GameEvent>) {
        if self.pending_selection.is_some() {
            self.exit_selection(events);
        }
    }

    /// Challenge reward path: the counter jumps straight to its cost and the
    /// ready notification fires.
    pub fn grant_free_charge(&mut self, kind: SkillKind, events: &mut EventQueue<GameEvent>) {
        let i = kind.index();
        self.charges[i] = self.costs[i];
        events.emit(GameEvent::SkillChargeChanged {
            kind,
            charge: self.charges[i],
        });
        events.emit(GameEvent::SkillReady { kind });
    }

    pub fn reset(&mut self) {
        self.charges = [0; 3];
        self.pending_selection = None;
    }

    fn consume(&mut self, kind: SkillKind, events: &mut EventQueue<GameEvent>) {
        self.charges[kind.index()] = 0;
        events.emit(GameEvent::SkillChargeChanged { kind, charge: 0 });
    }

    fn exit_selection(&mut self, events: &mut EventQueue<GameEvent>) {
        self.pending_selection = None;
        events.emit(GameEvent::SelectionModeChanged { active: false });
    }
}
