use std::collections::HashSet;

use engine::events::EventQueue;
use engine::store::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const KEY_BEST_SCORE: &str = "bestScore";
pub const KEY_TOTAL_GAMES: &str = "totalGames";
pub const KEY_HIGHEST_RANK: &str = "highestRank";

/// Score accumulator plus the records that outlive a session (best score,
/// games played, highest rank ever produced). Records persist through the
/// external store on every improvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    current: u32,
    best: u32,
    total_games: u32,
    highest_rank: u8,
    /// Ranks already produced this session; first production pays a bonus.
    reached: HashSet<u8>,
}

impl ScoreLedger {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            current: 0,
            best: store.get_i64(KEY_BEST_SCORE, 0).max(0) as u32,
            total_games: store.get_i64(KEY_TOTAL_GAMES, 0).max(0) as u32,
            highest_rank: store.get_i64(KEY_HIGHEST_RANK, 0).clamp(0, u8::MAX as i64) as u8,
            reached: HashSet::new(),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn total_games(&self) -> u32 {
        self.total_games
    }

    pub fn highest_rank(&self) -> u8 {
        self.highest_rank
    }

    pub fn add(
        &mut self,
        amount: u32,
        store: &mut dyn KeyValueStore,
        events: &mut EventQueue<GameEvent>,
    ) {
        self.current = self.current.saturating_add(amount);
        events.emit(GameEvent::ScoreChanged {
            score: self.current,
        });

        if self.current > self.best {
            self.best = self.current;
            store.set_i64(KEY_BEST_SCORE, i64::from(self.best));
            store.save();
            events.emit(GameEvent::BestScoreChanged { best: self.best });
        }
    }

    /// True exactly once per rank per session.
    pub fn claim_first_reach(&mut self, rank: u8) -> bool {
        self.reached.insert(rank)
    }

    pub fn record_rank(
        &mut self,
        rank: u8,
        store: &mut dyn KeyValueStore,
        events: &mut EventQueue<GameEvent>,
    ) {
        if rank > self.highest_rank {
            self.highest_rank = rank;
            store.set_i64(KEY_HIGHEST_RANK, i64::from(rank));
            store.save();
            events.emit(GameEvent::HighestRankChanged { rank });
        }
    }

    pub fn reset_current(&mut self, events: &mut EventQueue<GameEvent>) {
        self.current = 0;
        self.reached.clear();
        events.emit(GameEvent::ScoreChanged { score: 0 });
    }

    pub fn on_game_end(&mut self, store: &mut dyn KeyValueStore) {
        self.total_games = self.total_games.saturating_add(1);
        store.set_i64(KEY_TOTAL_GAMES, i64::from(self.total_games));
        store.save();
    }
}
