//! One-time program bootstrap
//!
//! `initialize` followed by `update_config` form one logical bootstrap. Once
//! `initialize` has been submitted (confirmed or timed out) the update is owed,
//! so the next attempt finishes the job instead of adopting half-written defaults.

use super::bounded;
use crate::chain::{ChainClient, TxConfirmation};
use crate::config::GameDefaults;
use crate::errors::{ChainError, ControlError, ControlResult};
use crate::games::types::{validate_house_edge, ConfigUpdate, GameConfig};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::info;

pub struct Bootstrapper {
    chain: Arc<dyn ChainClient>,
    submit_timeout: Duration,
    defaults_owed: AtomicBool,
}

impl Bootstrapper {
    pub fn new(chain: Arc<dyn ChainClient>, submit_timeout: Duration) -> Self {
        Self {
            chain,
            submit_timeout,
            defaults_owed: AtomicBool::new(false),
        }
    }

    /// Make sure the program has a config, creating it with `defaults` if absent
    pub async fn ensure_initialized(&self, defaults: &GameDefaults) -> ControlResult<GameConfig> {
        let update = ConfigUpdate::all(defaults.min_bet, defaults.max_bet, defaults.house_edge);
        update.validate()?;

        let existing = bounded("fetch_config", self.submit_timeout, self.chain.fetch_config()).await?;
        match existing {
            Some(config) if !self.defaults_owed.load(Ordering::SeqCst) => {
                info!(
                    "✅ Game ready (houseEdge={}%, min={}, max={}, completed={})",
                    config.house_edge_percent,
                    config.min_bet,
                    config.max_bet,
                    config.total_games_completed
                );
                return Ok(config);
            }
            Some(_) => {
                info!("Resuming bootstrap: applying default bet bounds");
            }
            None => {
                info!("Initializing game (houseEdge={}%)...", defaults.house_edge);
                // Owed from submission on: a timed-out initialize may still land
                let resumed = self.defaults_owed.swap(true, Ordering::SeqCst);
                match bounded(
                    "initialize",
                    self.submit_timeout,
                    self.chain.initialize(defaults.house_edge),
                )
                .await
                {
                    Ok(tx) => {
                        info!(signature = %tx, "Initialized (houseEdge={}%)", defaults.house_edge);
                    }
                    Err(ChainError::AlreadyInitialized) if resumed => {
                        info!("Earlier initialize landed late, applying default bet bounds");
                    }
                    Err(ChainError::AlreadyInitialized) => {
                        self.defaults_owed.store(false, Ordering::SeqCst);
                        info!("Game config appeared concurrently, adopting it");
                        return self.fetch_required().await;
                    }
                    Err(e @ ChainError::Timeout { .. }) => return Err(e.into()),
                    Err(e) => {
                        self.defaults_owed.store(resumed, Ordering::SeqCst);
                        return Err(e.into());
                    }
                }
            }
        }

        let tx = bounded("update_config", self.submit_timeout, self.chain.update_config(update)).await?;
        self.defaults_owed.store(false, Ordering::SeqCst);
        info!(
            signature = %tx,
            "Config updated (min={}, max={}, houseEdge={}%)",
            defaults.min_bet,
            defaults.max_bet,
            defaults.house_edge
        );

        self.fetch_required().await
    }

    /// Operator-requested `initialize`; round state is untouched
    pub async fn force_initialize(&self, house_edge: u8) -> ControlResult<TxConfirmation> {
        validate_house_edge(house_edge)?;
        let tx = bounded("initialize", self.submit_timeout, self.chain.initialize(house_edge)).await?;
        info!(signature = %tx, "Initialized (houseEdge={}%)", house_edge);
        Ok(tx)
    }

    /// True while an `initialize` may have landed without its follow-up update
    pub fn defaults_owed(&self) -> bool {
        self.defaults_owed.load(Ordering::SeqCst)
    }

    async fn fetch_required(&self) -> ControlResult<GameConfig> {
        bounded("fetch_config", self.submit_timeout, self.chain.fetch_config())
            .await?
            .ok_or_else(|| ControlError::Bootstrap("game config missing after initialization".to_string()))
    }
}
