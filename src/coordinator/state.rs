use crate::games::types::{GameConfig, GameRound};
use serde::Serialize;
use std::collections::VecDeque;

/// Ended rounds kept for the status endpoint
pub const HISTORY_LIMIT: usize = 32;

/// Process-local shadow of the program's round state
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    pub next_round_id: u64,
    pub current: Option<GameRound>,
    pub history: VecDeque<GameRound>,
    /// Last config read from or written to the program
    pub config: Option<GameConfig>,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self {
            next_round_id: 1,
            current: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            config: None,
        }
    }

    /// Derive the id counter from the program's completed-games counter
    pub fn seed(&mut self, config: GameConfig) {
        self.next_round_id = self.next_round_id.max(config.next_round_id());
        self.config = Some(config);
    }

    pub fn in_flight(&self) -> Option<&GameRound> {
        self.current.as_ref().filter(|round| round.is_in_flight())
    }

    /// Never moves the counter backwards
    pub fn resync_after(&mut self, round_id: u64) {
        self.next_round_id = self.next_round_id.max(round_id.saturating_add(1));
    }

    pub fn record_ended(&mut self, round: GameRound) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(round);
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            next_round_id: self.next_round_id,
            current_round: self.current.clone(),
            recent_rounds: self.history.iter().rev().cloned().collect(),
            config: self.config,
        }
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view for operators; most recent round first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSnapshot {
    pub next_round_id: u64,
    pub current_round: Option<GameRound>,
    pub recent_rounds: Vec<GameRound>,
    pub config: Option<GameConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::CrashPoint;

    fn config(total: u64) -> GameConfig {
        GameConfig {
            house_edge_percent: 5,
            min_bet: 1,
            max_bet: 2,
            total_games_completed: total,
        }
    }

    #[test]
    fn test_seed_from_completed_games() {
        let mut state = CoordinatorState::new();
        assert_eq!(state.next_round_id, 1);

        state.seed(config(41));
        assert_eq!(state.next_round_id, 42);
    }

    #[test]
    fn test_resync_never_goes_backwards() {
        let mut state = CoordinatorState::new();
        state.next_round_id = 10;

        state.resync_after(50);
        assert_eq!(state.next_round_id, 51);

        state.resync_after(3);
        assert_eq!(state.next_round_id, 51);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = CoordinatorState::new();
        for id in 1..=(HISTORY_LIMIT as u64 + 5) {
            let round = GameRound::pending(id, CrashPoint::new(150).unwrap()).activate().end();
            state.record_ended(round);
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot.recent_rounds.len(), HISTORY_LIMIT);
        assert_eq!(snapshot.recent_rounds[0].round_id, HISTORY_LIMIT as u64 + 5);
    }
}
