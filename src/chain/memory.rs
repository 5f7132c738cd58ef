//! In-process simulation of the crash game program
//!
//! Mirrors the program's observable rules closely enough to drive the
//! coordinator without a validator: one config slot, a round table keyed by id,
//! and the same rejection cases. Failures, latency and "landed but never
//! confirmed" submissions can be injected per operation.

use super::{ChainClient, TxConfirmation};
use crate::errors::{ChainError, ChainResult};
use crate::games::types::{ConfigUpdate, CrashPoint, GameConfig, RoundSnapshot};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

/// Bet bounds the program writes on `initialize`, before any config update
pub const PROGRAM_DEFAULT_MIN_BET: u64 = 1_000;
pub const PROGRAM_DEFAULT_MAX_BET: u64 = 1_000_000_000;

/// Facade operations, used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOp {
    FetchConfig,
    FetchRound,
    Initialize,
    UpdateConfig,
    StartRound,
    EndRound,
}

/// A submission the simulated program accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    Initialize(u8),
    UpdateConfig(ConfigUpdate),
    StartRound(u64, u16),
    EndRound(u64),
}

#[derive(Debug, Default)]
struct ProgramState {
    config: Option<GameConfig>,
    rounds: BTreeMap<u64, RoundSnapshot>,
    active_rounds: usize,
    peak_active_rounds: usize,
    calls: Vec<ChainCall>,
}

#[derive(Debug, Default)]
struct Faults {
    failures: HashMap<ChainOp, VecDeque<ChainError>>,
    stalls: HashSet<ChainOp>,
}

/// Simulated program implementing [`ChainClient`]
#[derive(Debug, Default)]
pub struct InMemoryChain {
    state: Mutex<ProgramState>,
    faults: Mutex<Faults>,
    latency: Mutex<Option<Duration>>,
    signatures: AtomicU64,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program that has already been initialized with `config`
    pub fn with_config(config: GameConfig) -> Self {
        let chain = Self::new();
        chain.lock_state().config = Some(config);
        chain
    }

    /// Delay applied to every call before it takes effect
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Fail the next call of `op` with `error`; queued failures are consumed in order
    pub fn fail_next(&self, op: ChainOp, error: ChainError) {
        self.lock_faults()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Apply the next call of `op` but never confirm it
    pub fn stall_next(&self, op: ChainOp) {
        self.lock_faults().stalls.insert(op);
    }

    pub fn config(&self) -> Option<GameConfig> {
        self.lock_state().config
    }

    pub fn round(&self, round_id: u64) -> Option<RoundSnapshot> {
        self.lock_state().rounds.get(&round_id).copied()
    }

    /// Accepted submissions, in order
    pub fn calls(&self) -> Vec<ChainCall> {
        self.lock_state().calls.clone()
    }

    pub fn active_rounds(&self) -> usize {
        self.lock_state().active_rounds
    }

    /// Highest number of simultaneously active rounds ever observed
    pub fn peak_active_rounds(&self) -> usize {
        self.lock_state().peak_active_rounds
    }

    fn lock_state(&self) -> MutexGuard<'_, ProgramState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latency, then any injected failure for `op`
    async fn before(&self, op: ChainOp) -> ChainResult<()> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .lock_faults()
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Confirm a submission, or hang forever if a stall was injected
    async fn confirm(&self, op: ChainOp) -> ChainResult<TxConfirmation> {
        let stalled = self.lock_faults().stalls.remove(&op);
        if stalled {
            std::future::pending::<()>().await;
        }
        let n = self.signatures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxConfirmation::new(format!("mem-{:08}", n)))
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn fetch_config(&self) -> ChainResult<Option<GameConfig>> {
        self.before(ChainOp::FetchConfig).await?;
        Ok(self.lock_state().config)
    }

    async fn fetch_round(&self, round_id: u64) -> ChainResult<Option<RoundSnapshot>> {
        self.before(ChainOp::FetchRound).await?;
        Ok(self.lock_state().rounds.get(&round_id).copied())
    }

    async fn initialize(&self, house_edge: u8) -> ChainResult<TxConfirmation> {
        self.before(ChainOp::Initialize).await?;
        {
            let mut state = self.lock_state();
            if state.config.is_some() {
                return Err(ChainError::AlreadyInitialized);
            }
            state.config = Some(GameConfig {
                house_edge_percent: house_edge,
                min_bet: PROGRAM_DEFAULT_MIN_BET,
                max_bet: PROGRAM_DEFAULT_MAX_BET,
                total_games_completed: 0,
            });
            state.calls.push(ChainCall::Initialize(house_edge));
        }
        self.confirm(ChainOp::Initialize).await
    }

    async fn update_config(&self, update: ConfigUpdate) -> ChainResult<TxConfirmation> {
        self.before(ChainOp::UpdateConfig).await?;
        {
            let mut state = self.lock_state();
            let mut config = state
                .config
                .ok_or_else(|| ChainError::Rejected("game config not initialized".to_string()))?;
            update.apply_to(&mut config);
            if config.min_bet > config.max_bet {
                return Err(ChainError::Rejected(format!(
                    "invalid bet bounds: min {} > max {}",
                    config.min_bet, config.max_bet
                )));
            }
            if config.house_edge_percent > 100 {
                return Err(ChainError::Rejected("invalid house edge".to_string()));
            }
            state.config = Some(config);
            state.calls.push(ChainCall::UpdateConfig(update));
        }
        self.confirm(ChainOp::UpdateConfig).await
    }

    async fn start_round(&self, round_id: u64, crash_point: CrashPoint) -> ChainResult<TxConfirmation> {
        self.before(ChainOp::StartRound).await?;
        {
            let mut state = self.lock_state();
            if state.config.is_none() {
                return Err(ChainError::Rejected("game config not initialized".to_string()));
            }
            if state.rounds.contains_key(&round_id) {
                return Err(ChainError::Rejected(format!("round {} already exists", round_id)));
            }
            state.rounds.insert(
                round_id,
                RoundSnapshot {
                    round_id,
                    crash_point: crash_point.hundredths(),
                    active: true,
                },
            );
            state.active_rounds += 1;
            state.peak_active_rounds = state.peak_active_rounds.max(state.active_rounds);
            state.calls.push(ChainCall::StartRound(round_id, crash_point.hundredths()));
        }
        self.confirm(ChainOp::StartRound).await
    }

    async fn end_round(&self, round_id: u64) -> ChainResult<TxConfirmation> {
        self.before(ChainOp::EndRound).await?;
        {
            let mut state = self.lock_state();
            match state.rounds.get_mut(&round_id) {
                Some(round) if round.active => round.active = false,
                Some(_) => {
                    return Err(ChainError::Rejected(format!("round {} is not active", round_id)))
                }
                None => return Err(ChainError::Rejected(format!("round {} not found", round_id))),
            }
            state.active_rounds -= 1;
            if let Some(config) = state.config.as_mut() {
                config.total_games_completed += 1;
            }
            state.calls.push(ChainCall::EndRound(round_id));
        }
        self.confirm(ChainOp::EndRound).await
    }
}
