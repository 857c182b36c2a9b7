use std::collections::HashSet;
use std::time::Duration;

use engine::events::EventQueue;
use engine::tasks::Timers;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, MAX_RANK};
use crate::physics::PhysicsCommand;
use crate::piece::{BodyKind, GoldenState, PieceId, Vec2f};
use crate::pool::PiecePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum TransactionKind {
    RankUp,
    Annihilation,
}

/// A locked pair waiting out its animation interval. `a` is the lower id and
/// the survivor of a rank-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MergeTransaction {
    kind: TransactionKind,
    a: PieceId,
    b: PieceId,
    rank: u8,
    midpoint: Vec2f,
}

/// Outcome of a completed transaction, handed to the session for scoring and
/// tracker fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergeResolution {
    RankUp {
        id: PieceId,
        new_rank: u8,
        pos: Vec2f,
        /// Either parent was golden when the transaction resolved.
        golden_parent: bool,
    },
    Annihilated {
        pos: Vec2f,
    },
}

/// Decides when a merge happens and what it produces — exactly once per
/// pair. Contacts lock both participants before anything mutates; the actual
/// rank-up or annihilation is a suspended task that resolves after the
/// animation interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeEngine {
    locks: HashSet<PieceId>,
    transactions: Timers<MergeTransaction>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self {
            locks: HashSet::new(),
            transactions: Timers::new(),
        }
    }

    pub fn is_locked(&self, id: PieceId) -> bool {
        self.locks.contains(&id)
    }

    pub fn in_flight(&self) -> usize {
        self.transactions.len()
    }

    /// External "entities touched" notification. Each participant reports the
    /// contact from its own perspective; only the lower id initiates, so the
    /// symmetric duplicate is dropped here. Returns true when a transaction
    /// was started.
    pub fn notify_contact(
        &mut self,
        a: PieceId,
        b: PieceId,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        config: &GameConfig,
    ) -> bool {
        if a >= b {
            return false;
        }
        if self.locks.contains(&a) || self.locks.contains(&b) {
            return false;
        }
        let (Some(pa), Some(pb)) = (pool.get(a), pool.get(b)) else {
            return false;
        };
        if pa.is_obstacle || pb.is_obstacle {
            return false;
        }
        if !pa.can_merge || !pb.can_merge || pa.is_merging || pb.is_merging {
            return false;
        }
        if pa.rank != pb.rank {
            return false;
        }

        let rank = pa.rank;
        let midpoint = pa.pos.midpoint(pb.pos);

        // Both ids lock in the same step; no third contact can interleave.
        self.locks.insert(a);
        self.locks.insert(b);
        for id in [a, b] {
            if let Some(piece) = pool.get_mut(id) {
                piece.is_merging = true;
                piece.body = BodyKind::Kinematic;
                piece.vel = Vec2f::ZERO;
            }
            physics.emit(PhysicsCommand::SetKinematic { id });
        }

        let (kind, after) = if rank >= MAX_RANK {
            (TransactionKind::Annihilation, config.merge.annihilation_duration())
        } else {
            (TransactionKind::RankUp, config.merge.anim_duration)
        };
        debug!("merge locked: {a} + {b} at rank {rank} ({kind:?})");
        self.transactions.schedule(
            after,
            MergeTransaction {
                kind,
                a,
                b,
                rank,
                midpoint,
            },
        );
        true
    }

    /// Resolves transactions whose animation interval elapsed this tick.
    /// `gravity` is the difficulty gravity applied to unfrozen bodies.
    pub fn tick(
        &mut self,
        dt: Duration,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        gravity: f32,
    ) -> Vec<MergeResolution> {
        let mut resolutions = Vec::new();
        for tx in self.transactions.tick(dt) {
            if let Some(resolution) = self.resolve(tx, pool, physics, gravity) {
                resolutions.push(resolution);
            }
        }
        resolutions
    }

    fn resolve(
        &mut self,
        tx: MergeTransaction,
        pool: &mut PiecePool,
        physics: &mut EventQueue<PhysicsCommand>,
        gravity: f32,
    ) -> Option<MergeResolution> {
        self.locks.remove(&tx.a);
        self.locks.remove(&tx.b);

        if !pool.contains(tx.a) || !pool.contains(tx.b) {
            // A participant vanished mid-flight (bomb, sweep). Expected race:
            // unwind silently, unfreezing whichever piece still exists.
            for id in [tx.a, tx.b] {
                if let Some(piece) = pool.get_mut(id) {
                    piece.is_merging = false;
                    piece.body = BodyKind::Dynamic;
                    physics.emit(PhysicsCommand::SetDynamic {
                        id,
                        gravity_scale: gravity,
                    });
                }
            }
            debug!("merge aborted: participant of {} + {} vanished", tx.a, tx.b);
            return None;
        }

        match tx.kind {
            TransactionKind::RankUp => {
                // Golden state is captured before the pool release resets it.
                let golden_a = pool.get(tx.a).map_or(GoldenState::None, |p| p.golden);
                let golden_b = pool.get(tx.b).map_or(GoldenState::None, |p| p.golden);
                let golden_parent = golden_a.is_golden() || golden_b.is_golden();
                let transfer = golden_a.should_transfer() || golden_b.should_transfer();

                pool.release(tx.b);
                physics.emit(PhysicsCommand::Remove { id: tx.b });

                let new_rank = tx.rank + 1;
                let survivor = pool.get_mut(tx.a)?;
                survivor.pos = tx.midpoint;
                survivor.upgrade(new_rank);
                survivor.golden = if transfer {
                    GoldenState::Transferred
                } else {
                    GoldenState::None
                };
                physics.emit(PhysicsCommand::Teleport {
                    id: tx.a,
                    pos: tx.midpoint,
                });
                physics.emit(PhysicsCommand::SetDynamic {
                    id: tx.a,
                    gravity_scale: gravity,
                });

                debug!("merge resolved: {} + {} -> rank {new_rank}", tx.a, tx.b);
                Some(MergeResolution::RankUp {
                    id: tx.a,
                    new_rank,
                    pos: tx.midpoint,
                    golden_parent,
                })
            }
            TransactionKind::Annihilation => {
                for id in [tx.a, tx.b] {
                    pool.release(id);
                    physics.emit(PhysicsCommand::Remove { id });
                }
                debug!("max-rank pair {} + {} annihilated", tx.a, tx.b);
                Some(MergeResolution::Annihilated { pos: tx.midpoint })
            }
        }
    }

    /// Drops every in-flight transaction and force-returns its participants
    /// without score or event side effects (session deactivation).
    pub fn cancel_all(&mut self, pool: &mut PiecePool, physics: &mut EventQueue<PhysicsCommand>) {
        for tx in self.transactions.cancel_all() {
            for id in [tx.a, tx.b] {
                if pool.release(id) {
                    physics.emit(PhysicsCommand::Remove { id });
                }
            }
        }
        self.locks.clear();
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}
