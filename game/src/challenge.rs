use engine::events::EventQueue;
use engine::rng::Rng;
use engine::store::KeyValueStore;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const KEY_CHALLENGE_DATE: &str = "challengeDate";
pub const KEY_CHALLENGE_KIND: &str = "challengeKind";
pub const KEY_CHALLENGE_TARGET: &str = "challengeTarget";
pub const KEY_CHALLENGE_COMPLETED: &str = "challengeCompleted";
pub const KEY_CHALLENGE_REWARD: &str = "challengeRewardPending";

/// Rank a CreateRank challenge counts productions of.
pub const CREATE_RANK_TARGET_RANK: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeKind {
    /// Reach a total score.
    Score,
    /// Produce N pieces of the target rank.
    CreateRank,
    /// Reach a combo count.
    Combo,
    /// Reach a score without activating any skill.
    NoSkillScore,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 4] = [
        ChallengeKind::Score,
        ChallengeKind::CreateRank,
        ChallengeKind::Combo,
        ChallengeKind::NoSkillScore,
    ];

    fn index(self) -> usize {
        match self {
            ChallengeKind::Score => 0,
            ChallengeKind::CreateRank => 1,
            ChallengeKind::Combo => 2,
            ChallengeKind::NoSkillScore => 3,
        }
    }

    fn default_target(self) -> u32 {
        match self {
            ChallengeKind::Score => 3000,
            ChallengeKind::CreateRank => 3,
            ChallengeKind::Combo => 5,
            ChallengeKind::NoSkillScore => 2000,
        }
    }
}

/// FNV-1a, the stable day-string hash behind challenge derivation. Every
/// player on the same calendar day draws the same challenge.
fn fnv1a64(s: &str) -> u64 {
    let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// One calendar day's challenge. Completion and the pending reward persist
/// across sessions; in-game progress does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallenge {
    day: String,
    kind: ChallengeKind,
    target: u32,
    current: u32,
    completed: bool,
    reward_pending: bool,
    used_skill: bool,
}

impl DailyChallenge {
    /// Restores the stored record when the day matches `today`, otherwise
    /// derives a fresh challenge from the day string and persists it.
    pub fn load_or_generate(today: &str, store: &mut dyn KeyValueStore) -> Self {
        let stored_day = store.get_string(KEY_CHALLENGE_DATE, "");
        if stored_day == today {
            let kind_index = store.get_i64(KEY_CHALLENGE_KIND, 0).max(0) as usize;
            let kind = ChallengeKind::ALL[kind_index % ChallengeKind::ALL.len()];
            let target = store
                .get_i64(KEY_CHALLENGE_TARGET, i64::from(kind.default_target()))
                .max(1) as u32;
            return Self {
                day: today.to_string(),
                kind,
                target,
                current: 0,
                completed: store.get_i64(KEY_CHALLENGE_COMPLETED, 0) != 0,
                reward_pending: store.get_i64(KEY_CHALLENGE_REWARD, 0) != 0,
                used_skill: false,
            };
        }

        let mut rng = Rng::new(fnv1a64(today));
        let kind = ChallengeKind::ALL[rng.range_u32(ChallengeKind::ALL.len() as u32) as usize];
        let target = kind.default_target();
        debug!("new daily challenge for {today}: {kind:?} target {target}");

        store.set_string(KEY_CHALLENGE_DATE, today);
        store.set_i64(KEY_CHALLENGE_KIND, kind.index() as i64);
        store.set_i64(KEY_CHALLENGE_TARGET, i64::from(target));
        store.set_i64(KEY_CHALLENGE_COMPLETED, 0);
        store.set_i64(KEY_CHALLENGE_REWARD, 0);
        store.save();

        Self {
            day: today.to_string(),
            kind,
            target,
            current: 0,
            completed: false,
            reward_pending: false,
            used_skill: false,
        }
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn reward_pending(&self) -> bool {
        self.reward_pending
    }

    pub fn progress(&self) -> f32 {
        if self.completed {
            return 1.0;
        }
        if self.target == 0 {
            return 0.0;
        }
        (self.current as f32 / self.target as f32).clamp(0.0, 1.0)
    }

    pub fn observe_score(
        &mut self,
        score: u32,
        store: &mut dyn KeyValueStore,
        events: &mut EventQueue<GameEvent>,
    ) {
        if self.completed {
            return;
        }
        match self.kind {
            ChallengeKind::Score => {
                self.current = score;
                self.update_progress(store, events);
            }
            ChallengeKind::NoSkillScore if !self.used_skill => {
                self.current = score;
                self.update_progress(store, events);
            }
            _ => {}
        }
    }

    pub fn observe_merge(
        &mut self,
        new_rank: u8,
        combo: u32,
        store: &mut dyn KeyValueStore,
        events: &mut EventQueue<GameEvent>,
    ) {
        if self.completed {
            return;
        }
        match self.kind {
            ChallengeKind::CreateRank if new_rank == CREATE_RANK_TARGET_RANK => {
                self.current += 1;
                self.update_progress(store, events);
            }
            ChallengeKind::Combo if combo > self.current => {
                self.current = combo;
                self.update_progress(store, events);
            }
            _ => {}
        }
    }

    /// Any skill activation permanently zeroes no-skill progress this game.
    pub fn notify_skill_used(&mut self, events: &mut EventQueue<GameEvent>) {
        self.used_skill = true;
        if self.kind == ChallengeKind::NoSkillScore && !self.completed {
            self.current = 0;
            events.emit(GameEvent::ChallengeProgress { progress: 0.0 });
        }
    }

    /// Consumes the pending reward; called once at the start of a session.
    pub fn try_consume_reward(&mut self, store: &mut dyn KeyValueStore) -> bool {
        if !self.reward_pending {
            return false;
        }
        self.reward_pending = false;
        store.set_i64(KEY_CHALLENGE_REWARD, 0);
        store.save();
        true
    }

    pub fn reset_for_new_game(&mut self, events: &mut EventQueue<GameEvent>) {
        self.current = 0;
        self.used_skill = false;
        if !self.completed {
            events.emit(GameEvent::ChallengeProgress { progress: 0.0 });
        }
    }

    fn update_progress(
        &mut self,
        store: &mut dyn KeyValueStore,
        events: &mut EventQueue<GameEvent>,
    ) {
        events.emit(GameEvent::ChallengeProgress {
            progress: self.progress(),
        });

        if self.current >= self.target && !self.completed {
            self.completed = true;
            self.reward_pending = true;
            store.set_i64(KEY_CHALLENGE_COMPLETED, 1);
            store.set_i64(KEY_CHALLENGE_REWARD, 1);
            store.save();
            debug!("daily challenge completed: {:?}", self.kind);
            events.emit(GameEvent::ChallengeCompleted);
        }
    }
}
