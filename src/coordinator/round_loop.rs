//! Automatic round cadence: begin, hold for the active period, finish, gap, repeat

use super::Coordinator;
use crate::config::RoundTiming;
use crate::errors::ControlError;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct RoundLoop {
    coordinator: Arc<Coordinator>,
    timing: RoundTiming,
    shutdown: CancellationToken,
}

impl RoundLoop {
    pub fn new(coordinator: Arc<Coordinator>, timing: RoundTiming, shutdown: CancellationToken) -> Self {
        Self {
            coordinator,
            timing,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the shutdown token is cancelled
    ///
    /// Cancellation is only observed while sleeping, so a submission in flight
    /// always completes and its outcome is recorded.
    pub async fn run(self) {
        info!(
            "🔁 Round loop started (active {}ms, gap {}ms)",
            self.timing.active_duration_ms, self.timing.gap_duration_ms
        );

        while !self.shutdown.is_cancelled() {
            if !self.begin_phase().await {
                break;
            }
            if !self.pause(self.timing.active_duration()).await {
                self.finish_before_exit().await;
                break;
            }
            if !self.finish_phase().await {
                break;
            }
            if !self.pause(self.timing.gap_duration()).await {
                break;
            }
        }

        info!("🛑 Round loop stopped");
    }

    /// Returns false if shutdown was requested before a round became active
    async fn begin_phase(&self) -> bool {
        loop {
            if let Err(e) = self.coordinator.reconcile().await {
                warn!(error = %e, "Reconciliation failed");
            }

            match self.coordinator.begin_next_round().await {
                Ok(_) => return true,
                Err(ControlError::RoundInProgress(round_id)) => {
                    info!("Round {} already in progress, holding it for the active period", round_id);
                    return true;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "Start failed, retrying in {}ms",
                        self.timing.retry_backoff_ms
                    );
                    if !self.pause(self.timing.retry_backoff()).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Returns false if shutdown was requested while retrying
    async fn finish_phase(&self) -> bool {
        loop {
            match self.coordinator.finish_current_round().await {
                Ok(_) => return true,
                Err(ControlError::NoActiveRound) => {
                    info!("Round already ended elsewhere");
                    return true;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "End failed, retrying in {}ms",
                        self.timing.retry_backoff_ms
                    );
                    if !self.pause(self.timing.retry_backoff()).await {
                        self.finish_before_exit().await;
                        return false;
                    }
                }
            }
        }
    }

    /// One last end attempt so the program is not left with an orphaned active round
    async fn finish_before_exit(&self) {
        if !self.timing.finish_on_shutdown {
            return;
        }
        match self.coordinator.finish_current_round().await {
            Ok(round_id) => info!("Ended round {} before shutdown", round_id),
            Err(ControlError::NoActiveRound) => {}
            Err(e) => warn!(error = %e, "Could not end round before shutdown"),
        }
    }

    /// Sleep unless cancelled; false means shutdown
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
