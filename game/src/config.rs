use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Highest mergeable rank. Two pieces of this rank annihilate instead of
/// ranking up.
pub const MAX_RANK: u8 = 10;

pub const RANK_COUNT: usize = MAX_RANK as usize + 1;

/// Piece diameters per rank, in world units.
pub const RANK_SIZES: [f32; RANK_COUNT] = [
    0.45, 0.58, 0.72, 0.88, 1.05, 1.25, 1.45, 1.68, 1.92, 2.20, 2.50,
];

/// Base score for producing a piece of each rank.
pub const RANK_SCORES: [u32; RANK_COUNT] = [1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 100];

/// Rank-indexed lookups clamp out-of-range ranks to the nearest valid entry.
pub fn rank_size(rank: u8) -> f32 {
    RANK_SIZES[rank.min(MAX_RANK) as usize]
}

pub fn rank_score(rank: u8) -> u32 {
    RANK_SCORES[rank.min(MAX_RANK) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsTuning {
    /// Baseline gravity scale; the difficulty scheduler interpolates from
    /// here as score climbs.
    pub gravity_scale: f32,
    pub friction: f32,
    pub bounciness: f32,
    pub linear_drag: f32,
    pub angular_drag: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity_scale: 5.0,
            friction: 0.3,
            bounciness: 0.3,
            linear_drag: 0.2,
            angular_drag: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerTuning {
    pub width: f32,
    pub height: f32,
    pub bottom_y: f32,
    pub game_over_line_y: f32,
    #[serde(with = "engine::serde_duration")]
    pub game_over_delay: Duration,
}

impl Default for ContainerTuning {
    fn default() -> Self {
        Self {
            width: 5.0,
            height: 8.5,
            bottom_y: -3.8,
            game_over_line_y: 4.0,
            game_over_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTuning {
    pub drop_y: f32,
    #[serde(with = "engine::serde_duration")]
    pub cooldown: Duration,
    pub min_x: f32,
    pub max_x: f32,
    /// Holding a piece this long forces the commit.
    #[serde(with = "engine::serde_duration")]
    pub auto_drop_time: Duration,
    /// Commits this close to the previous commit x are rejected.
    pub exclusion_radius: f32,
    /// Delay after landing before a piece may participate in merges.
    #[serde(with = "engine::serde_duration")]
    pub merge_grace: Duration,
    pub golden_chance: f32,
}

impl Default for DropTuning {
    fn default() -> Self {
        Self {
            drop_y: 4.8,
            cooldown: Duration::from_millis(300),
            min_x: -2.3,
            max_x: 2.3,
            auto_drop_time: Duration::from_secs(7),
            exclusion_radius: 0.4,
            merge_grace: Duration::from_millis(200),
            golden_chance: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeTuning {
    #[serde(with = "engine::serde_duration")]
    pub anim_duration: Duration,
    #[serde(with = "engine::serde_duration")]
    pub combo_window: Duration,
    pub chain_bonus_base: f32,
}

impl MergeTuning {
    /// Annihilations animate half again as long as a rank-up.
    pub fn annihilation_duration(&self) -> Duration {
        self.anim_duration.mul_f32(1.5)
    }
}

impl Default for MergeTuning {
    fn default() -> Self {
        Self {
            anim_duration: Duration::from_millis(100),
            combo_window: Duration::from_millis(1500),
            chain_bonus_base: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeverTuning {
    /// Consecutive in-window merges needed to trigger fever.
    pub combo_threshold: u32,
    #[serde(with = "engine::serde_duration")]
    pub duration: Duration,
    pub score_multiplier: f32,
    pub cooldown_multiplier: f32,
}

impl Default for FeverTuning {
    fn default() -> Self {
        Self {
            combo_threshold: 5,
            duration: Duration::from_secs(3),
            score_multiplier: 2.0,
            cooldown_multiplier: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleTuning {
    pub size: f32,
    /// Obstacles fall a little harder than fruit of the same tier.
    pub gravity_factor: f32,
    pub mass: f32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            size: 1.0,
            gravity_factor: 1.2,
            mass: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTuning {
    pub shake_cost: u32,
    pub downgrade_cost: u32,
    pub bomb_cost: u32,
}

impl Default for SkillTuning {
    fn default() -> Self {
        Self {
            shake_cost: 10,
            downgrade_cost: 15,
            bomb_cost: 20,
        }
    }
}

/// One difficulty bracket. The greatest tier whose threshold is at or below
/// the current score is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyTier {
    pub score_threshold: u32,
    pub min_rank: u8,
    pub max_rank: u8,
    pub gravity_scale: f32,
    pub rank_weights: Vec<f32>,
    /// Seconds between obstacle spawns; zero disables obstacles.
    #[serde(with = "engine::serde_duration")]
    pub obstacle_interval: Duration,
}

fn default_tiers() -> Vec<DifficultyTier> {
    vec![
        DifficultyTier {
            score_threshold: 0,
            min_rank: 0,
            max_rank: 3,
            gravity_scale: 5.0,
            rank_weights: vec![35.0, 30.0, 20.0, 15.0],
            obstacle_interval: Duration::ZERO,
        },
        DifficultyTier {
            score_threshold: 2000,
            min_rank: 0,
            max_rank: 4,
            gravity_scale: 5.3,
            rank_weights: vec![25.0, 30.0, 25.0, 15.0, 5.0],
            obstacle_interval: Duration::ZERO,
        },
        DifficultyTier {
            score_threshold: 5000,
            min_rank: 1,
            max_rank: 4,
            gravity_scale: 5.7,
            rank_weights: vec![30.0, 30.0, 25.0, 15.0],
            obstacle_interval: Duration::from_secs(25),
        },
        DifficultyTier {
            score_threshold: 10000,
            min_rank: 1,
            max_rank: 5,
            gravity_scale: 6.5,
            rank_weights: vec![20.0, 30.0, 25.0, 15.0, 10.0],
            obstacle_interval: Duration::from_secs(18),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(default)]
    pub physics: PhysicsTuning,
    #[serde(default)]
    pub container: ContainerTuning,
    #[serde(default)]
    pub drop: DropTuning,
    #[serde(default)]
    pub merge: MergeTuning,
    #[serde(default)]
    pub fever: FeverTuning,
    #[serde(default)]
    pub obstacle: ObstacleTuning,
    #[serde(default)]
    pub skills: SkillTuning,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<DifficultyTier>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsTuning::default(),
            container: ContainerTuning::default(),
            drop: DropTuning::default(),
            merge: MergeTuning::default(),
            fever: FeverTuning::default(),
            obstacle: ObstacleTuning::default(),
            skills: SkillTuning::default(),
            tiers: default_tiers(),
        }
    }
}

impl GameConfig {
    /// Parses a tuning document; anything unreadable falls back to the
    /// defaults so a broken config never takes the game down.
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str::<GameConfig>(text)
            .map(Self::sanitized)
            .unwrap_or_default()
    }

    /// Tier thresholds must be strictly increasing for greatest-at-or-below
    /// selection; loaded configs are put back in shape rather than rejected.
    pub fn sanitized(mut self) -> Self {
        if self.tiers.is_empty() {
            self.tiers = default_tiers();
        }
        self.tiers.sort_by_key(|t| t.score_threshold);
        self.tiers.dedup_by_key(|t| t.score_threshold);
        self.drop.golden_chance = self.drop.golden_chance.clamp(0.0, 1.0);
        self
    }

    /// Merge score before the golden and fever multipliers:
    /// base × (1 + (combo−1)/2) + chain_bonus_base × (combo−1).
    pub fn merge_score(&self, new_rank: u8, combo: u32) -> u32 {
        let base = rank_score(new_rank) as f32;
        let chain = combo.saturating_sub(1) as f32;
        (base * (1.0 + chain * 0.5) + self.merge.chain_bonus_base * chain).round() as u32
    }

    /// One-time bonus for reaching a rank for the first time this session.
    pub fn first_reach_bonus(&self, new_rank: u8) -> u32 {
        100 * (u32::from(new_rank) + 1)
    }

    /// Flat payout when two max-rank pieces annihilate.
    pub fn annihilation_score(&self) -> u32 {
        rank_score(MAX_RANK) * 5
    }
}
