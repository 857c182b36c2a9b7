use serde::{Deserialize, Serialize};

use crate::piece::Vec2f;
use crate::session::GamePhase;
use crate::skills::SkillKind;

/// Everything the presentation side may react to. Observers never mutate
/// core state; they drain this once per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum GameEvent {
    PhaseChanged { phase: GamePhase },
    ScoreChanged { score: u32 },
    BestScoreChanged { best: u32 },
    HighestRankChanged { rank: u8 },
    MergeCompleted { new_rank: u8, pos: Vec2f, combo: u32 },
    Annihilated { pos: Vec2f },
    TierChanged { tier: usize },
    FeverStarted,
    FeverEnded,
    FeverProgress { remaining: f32 },
    SkillChargeChanged { kind: SkillKind, charge: u32 },
    SkillReady { kind: SkillKind },
    SelectionModeChanged { active: bool },
    ChallengeProgress { progress: f32 },
    ChallengeCompleted,
    DropCommitted { rank: u8, x: f32 },
    DropRejected { x: f32 },
    QueuedRankChanged { rank: u8 },
}
