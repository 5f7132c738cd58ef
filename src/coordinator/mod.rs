//! Round coordinator
//!
//! Owns the process-local round state and is the only component that submits
//! round transitions. Every transition runs under `gate`, so at most one chain
//! submission is in flight at a time and a round is never started while another
//! is pending or active. The automatic loop waits for the gate; manual operator
//! requests are rejected with [`ControlError::Busy`] instead of queueing.

pub mod bootstrap;
pub mod round_loop;
pub mod state;

pub use bootstrap::Bootstrapper;
pub use round_loop::RoundLoop;
pub use state::{CoordinatorSnapshot, CoordinatorState, HISTORY_LIMIT};

use crate::chain::{ChainClient, TxConfirmation};
use crate::config::GameDefaults;
use crate::errors::{ChainError, ChainResult, ControlError, ControlResult};
use crate::games::{
    outcome::{OutcomeSource, UniformCrashPoints},
    types::{ConfigUpdate, CrashPoint, GameConfig, GameRound},
};
use crate::metrics::RoundMetrics;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Upper bound on round accounts probed per reconciliation
const RECONCILE_PROBE_LIMIT: usize = 16;

/// Bound a chain call; an elapsed timeout counts as a failed submission
pub(crate) async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> ChainResult<T>
where
    F: Future<Output = ChainResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::timeout(
            operation,
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePolicy {
    Wait,
    Reject,
}

pub struct Coordinator {
    chain: Arc<dyn ChainClient>,
    outcomes: Arc<dyn OutcomeSource>,
    bootstrap: Bootstrapper,
    gate: Mutex<()>,
    state: RwLock<CoordinatorState>,
    metrics: Arc<RoundMetrics>,
    submit_timeout: Duration,
}

impl Coordinator {
    pub fn new(chain: Arc<dyn ChainClient>, submit_timeout: Duration) -> Self {
        Self {
            bootstrap: Bootstrapper::new(chain.clone(), submit_timeout),
            chain,
            outcomes: Arc::new(UniformCrashPoints),
            gate: Mutex::new(()),
            state: RwLock::new(CoordinatorState::new()),
            metrics: Arc::new(RoundMetrics::new()),
            submit_timeout,
        }
    }

    /// Replace the crash point source
    pub fn with_outcomes(mut self, outcomes: Arc<dyn OutcomeSource>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn metrics(&self) -> Arc<RoundMetrics> {
        self.metrics.clone()
    }

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn next_round_id(&self) -> u64 {
        self.state.read().await.next_round_id
    }

    pub async fn current_round(&self) -> Option<GameRound> {
        self.state.read().await.current.clone()
    }

    /// Bootstrap the program and seed the round counter from it
    pub async fn ensure_initialized(&self, defaults: &GameDefaults) -> ControlResult<GameConfig> {
        let _gate = self.acquire(GatePolicy::Wait).await?;
        let config = self.bootstrap.ensure_initialized(defaults).await?;

        let mut state = self.state.write().await;
        state.seed(config);
        self.metrics.set_next_round_id(state.next_round_id);
        info!("Next round id: {}", state.next_round_id);
        Ok(config)
    }

    /// Manual `initialize`; does not touch round state
    pub async fn force_initialize(&self, house_edge: u8) -> ControlResult<TxConfirmation> {
        let result = self.bootstrap.force_initialize(house_edge).await;
        self.metrics.record("initialize", result.is_ok());
        if result.is_ok() {
            self.refresh_config().await;
        }
        result
    }

    /// Manual partial config update
    pub async fn update_config(&self, update: ConfigUpdate) -> ControlResult<TxConfirmation> {
        update.validate()?;
        let result = bounded("update_config", self.submit_timeout, self.chain.update_config(update)).await;
        self.metrics.record("update_config", result.is_ok());

        let tx = result.map_err(|e| {
            warn!(error = %e, "Config update failed");
            ControlError::from(e)
        })?;
        info!(signature = %tx, "Config updated: {:?}", update);

        {
            let mut state = self.state.write().await;
            if let Some(config) = state.config.as_mut() {
                update.apply_to(config);
            }
        }
        Ok(tx)
    }

    /// Start a round with the next id and a freshly drawn crash point
    pub async fn begin_next_round(&self) -> ControlResult<u64> {
        let _gate = self.acquire(GatePolicy::Wait).await?;
        let round_id = self.claim_slot().await?;
        let crash_point = self.outcomes.next_crash_point();
        self.start(round_id, crash_point).await?;
        Ok(round_id)
    }

    /// End the current round; returns its id
    pub async fn finish_current_round(&self) -> ControlResult<u64> {
        let _gate = self.acquire(GatePolicy::Wait).await?;
        let round = self.state.read().await.in_flight().cloned().ok_or(ControlError::NoActiveRound)?;
        self.finish(round).await
    }

    /// Operator-driven start with an explicit id and crash point
    pub async fn begin_round(&self, round_id: u64, crash_point: CrashPoint) -> ControlResult<()> {
        if round_id == 0 {
            return Err(ControlError::Validation("roundId must be at least 1".to_string()));
        }
        let _gate = self.acquire(GatePolicy::Reject).await?;
        let expected = self.claim_slot().await?;
        if round_id != expected {
            info!("Manual round {} differs from expected next id {}", round_id, expected);
        }
        self.start(round_id, crash_point).await
    }

    /// Operator-driven end; `round_id` must name the current round
    pub async fn end_round(&self, round_id: u64) -> ControlResult<()> {
        if round_id == 0 {
            return Err(ControlError::Validation("roundId must be at least 1".to_string()));
        }
        let _gate = self.acquire(GatePolicy::Reject).await?;
        let round = self.state.read().await.in_flight().cloned().ok_or(ControlError::NoActiveRound)?;
        if round.round_id != round_id {
            return Err(ControlError::RoundMismatch {
                expected: round.round_id,
                requested: round_id,
            });
        }
        self.finish(round).await.map(|_| ())
    }

    /// Align local state with the program before minting a new id
    ///
    /// Closes a current round the program already reports as ended, moves the
    /// counter forward to the program's completed-games counter, then probes
    /// round accounts from `next_round_id` onwards: ended rounds are skipped and
    /// an active one is adopted as the current round.
    pub async fn reconcile(&self) -> ControlResult<()> {
        let _gate = self.acquire(GatePolicy::Wait).await?;

        let current = self.state.read().await.in_flight().cloned();
        if let Some(round) = current {
            if self.ended_on_chain(round.round_id).await {
                warn!("Round {} already ended on chain, closing it locally", round.round_id);
                self.commit_ended(round).await;
            }
        }

        if let Some(config) = bounded("fetch_config", self.submit_timeout, self.chain.fetch_config()).await? {
            let mut state = self.state.write().await;
            if config.next_round_id() > state.next_round_id {
                warn!(
                    "Program completed {} games, advancing next round id {} -> {}",
                    config.total_games_completed,
                    state.next_round_id,
                    config.next_round_id()
                );
            }
            state.seed(config);
        }

        for _ in 0..RECONCILE_PROBE_LIMIT {
            let probe = {
                let state = self.state.read().await;
                if state.in_flight().is_some() {
                    break;
                }
                state.next_round_id
            };

            let Some(found) = bounded("fetch_round", self.submit_timeout, self.chain.fetch_round(probe)).await?
            else {
                break;
            };

            let mut state = self.state.write().await;
            state.resync_after(found.round_id);
            if found.active {
                warn!("Round {} is active on chain, adopting it", found.round_id);
                state.current = Some(
                    GameRound::pending(found.round_id, CrashPoint::saturating(found.crash_point)).activate(),
                );
                self.metrics.set_round_active(true);
                break;
            }
            info!("Round {} already ended on chain, skipping id", found.round_id);
        }

        let next = self.state.read().await.next_round_id;
        self.metrics.set_next_round_id(next);
        debug!("Reconciled, next round id {}", next);
        Ok(())
    }

    async fn acquire(&self, policy: GatePolicy) -> ControlResult<MutexGuard<'_, ()>> {
        match policy {
            GatePolicy::Wait => Ok(self.gate.lock().await),
            GatePolicy::Reject => self.gate.try_lock().map_err(|_| ControlError::Busy),
        }
    }

    /// Refuse while a round is in flight; otherwise the id the counter points at
    async fn claim_slot(&self) -> ControlResult<u64> {
        let state = self.state.read().await;
        match state.in_flight() {
            Some(round) => Err(ControlError::RoundInProgress(round.round_id)),
            None => Ok(state.next_round_id),
        }
    }

    /// Caller holds the gate
    async fn start(&self, round_id: u64, crash_point: CrashPoint) -> ControlResult<()> {
        let pending = GameRound::pending(round_id, crash_point);
        self.state.write().await.current = Some(pending.clone());
        self.metrics.set_round_active(true);
        info!("Starting round {} (crash {})", round_id, crash_point);

        let result = bounded(
            "start_round",
            self.submit_timeout,
            self.chain.start_round(round_id, crash_point),
        )
        .await;
        self.metrics.record("start", result.is_ok());

        let mut state = self.state.write().await;
        match result {
            Ok(tx) => {
                state.current = Some(pending.activate());
                state.resync_after(round_id);
                self.metrics.set_next_round_id(state.next_round_id);
                info!(signature = %tx, "🎲 Round {} started (crash {})", round_id, crash_point);
                Ok(())
            }
            Err(e) => {
                state.current = None;
                self.metrics.set_round_active(false);
                warn!(error = %e, "Failed to start round {}", round_id);
                Err(e.into())
            }
        }
    }

    /// Caller holds the gate; on failure the round stays current
    async fn finish(&self, round: GameRound) -> ControlResult<u64> {
        let round_id = round.round_id;
        info!("Ending round {}", round_id);

        let result = bounded("end_round", self.submit_timeout, self.chain.end_round(round_id)).await;
        self.metrics.record("end", result.is_ok());

        match result {
            Ok(tx) => {
                self.commit_ended(round).await;
                info!(signature = %tx, "🏁 Round {} ended", round_id);
                Ok(round_id)
            }
            Err(e) => {
                // A timed-out end may still have landed; the program then rejects every retry
                if self.ended_on_chain(round_id).await {
                    warn!(error = %e, "Round {} already ended on chain, closing it locally", round_id);
                    self.commit_ended(round).await;
                    return Ok(round_id);
                }
                warn!(error = %e, "Failed to end round {}", round_id);
                Err(e.into())
            }
        }
    }

    async fn commit_ended(&self, round: GameRound) {
        let mut state = self.state.write().await;
        state.current = None;
        state.record_ended(round.end());
        if let Some(config) = state.config.as_mut() {
            config.total_games_completed += 1;
        }
        self.metrics.set_round_active(false);
    }

    /// True only if the program reports the round account as inactive
    async fn ended_on_chain(&self, round_id: u64) -> bool {
        match bounded("fetch_round", self.submit_timeout, self.chain.fetch_round(round_id)).await {
            Ok(Some(snapshot)) => !snapshot.active,
            Ok(None) => false,
            Err(e) => {
                debug!("Round {} lookup failed: {}", round_id, e);
                false
            }
        }
    }

    async fn refresh_config(&self) {
        match bounded("fetch_config", self.submit_timeout, self.chain.fetch_config()).await {
            Ok(Some(config)) => self.state.write().await.config = Some(config),
            Ok(None) => {}
            Err(e) => debug!("Config refresh failed: {}", e),
        }
    }
}
