use serde::{Deserialize, Serialize};

use crate::config;

/// Stable entity id. Ids are handed out monotonically and never recycled, so
/// comparing two ids is always a valid tie-break.
pub type PieceId = u32;

/// Below this speed a dynamic piece counts as settled.
pub const SETTLE_SPEED: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    pub const ZERO: Vec2f = Vec2f { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2f) -> f32 {
        Vec2f::new(self.x - other.x, self.y - other.y).length()
    }

    pub fn midpoint(self, other: Vec2f) -> Vec2f {
        Vec2f::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Golden status propagates exactly one merge hop: a piece rolled golden at
/// spawn passes it on, a piece that received it does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoldenState {
    #[default]
    None,
    Original,
    Transferred,
}

impl GoldenState {
    pub fn is_golden(self) -> bool {
        !matches!(self, GoldenState::None)
    }

    pub fn should_transfer(self) -> bool {
        matches!(self, GoldenState::Original)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyKind {
    #[default]
    Kinematic,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub rank: u8,
    pub is_obstacle: bool,
    /// False until the post-landing grace period elapses.
    pub can_merge: bool,
    /// True while locked into a merge or annihilation transaction.
    pub is_merging: bool,
    pub golden: GoldenState,
    pub body: BodyKind,
    /// True while the piece hangs under the drop scheduler.
    pub dropping: bool,
    pub size: f32,
    pub pos: Vec2f,
    pub vel: Vec2f,
}

impl Piece {
    pub fn new(id: PieceId) -> Self {
        Self {
            id,
            rank: 0,
            is_obstacle: false,
            can_merge: false,
            is_merging: false,
            golden: GoldenState::None,
            body: BodyKind::Kinematic,
            dropping: false,
            size: config::rank_size(0),
            pos: Vec2f::ZERO,
            vel: Vec2f::ZERO,
        }
    }

    pub fn init_mergeable(&mut self, rank: u8, pos: Vec2f, dropping: bool) {
        self.rank = rank.min(config::MAX_RANK);
        self.is_obstacle = false;
        self.can_merge = false;
        self.is_merging = false;
        self.golden = GoldenState::None;
        self.body = if dropping {
            BodyKind::Kinematic
        } else {
            BodyKind::Dynamic
        };
        self.dropping = dropping;
        self.size = config::rank_size(self.rank);
        self.pos = pos;
        self.vel = Vec2f::ZERO;
    }

    pub fn init_obstacle(&mut self, pos: Vec2f, size: f32) {
        self.rank = 0;
        self.is_obstacle = true;
        self.can_merge = false;
        self.is_merging = false;
        self.golden = GoldenState::None;
        self.body = BodyKind::Dynamic;
        self.dropping = false;
        self.size = size;
        self.pos = pos;
        self.vel = Vec2f::ZERO;
    }

    /// Rank-up in place after a merge resolves. Merge eligibility is not
    /// touched: the survivor keeps its landed status.
    pub fn upgrade(&mut self, new_rank: u8) {
        self.rank = new_rank.min(config::MAX_RANK);
        self.size = config::rank_size(self.rank);
        self.is_merging = false;
        self.body = BodyKind::Dynamic;
        self.vel = Vec2f::ZERO;
    }

    /// Lowers the rank one step, floored at 0.
    pub fn downgrade(&mut self) {
        self.rank = self.rank.saturating_sub(1);
        self.size = config::rank_size(self.rank);
    }

    /// Neutral defaults for the free list.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Piece::new(id);
    }

    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    pub fn top(&self) -> f32 {
        self.pos.y + self.radius()
    }

    pub fn is_settled(&self) -> bool {
        self.body == BodyKind::Dynamic && self.vel.length() < SETTLE_SPEED
    }
}
