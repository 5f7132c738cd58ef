//! Chain client facade
//!
//! The coordinator talks to the on-chain program only through [`ChainClient`].
//! `solana` is the RPC-backed implementation used in production, `memory` is an
//! in-process simulation of the program for dry runs and tests.

pub mod instructions;
pub mod memory;
pub mod solana;

use crate::errors::ChainResult;
use crate::games::types::{ConfigUpdate, CrashPoint, GameConfig, RoundSnapshot};
use async_trait::async_trait;
use std::fmt;

pub use memory::InMemoryChain;
pub use solana::SolanaChainClient;

/// Confirmation of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfirmation {
    pub signature: String,
}

impl TxConfirmation {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }
}

impl fmt::Display for TxConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Narrow contract to the deployed crash game program
///
/// Every mutating call submits exactly one transaction and resolves once it is
/// confirmed. Reads never fail for "not found"; absence is `Ok(None)`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Global config, or `None` while the program is uninitialized
    async fn fetch_config(&self) -> ChainResult<Option<GameConfig>>;

    /// Round account state, or `None` if the round was never started
    async fn fetch_round(&self, round_id: u64) -> ChainResult<Option<RoundSnapshot>>;

    /// Create the global config; fails with `AlreadyInitialized` if it exists
    async fn initialize(&self, house_edge: u8) -> ChainResult<TxConfirmation>;

    /// Update any subset of the config fields
    async fn update_config(&self, update: ConfigUpdate) -> ChainResult<TxConfirmation>;

    async fn start_round(&self, round_id: u64, crash_point: CrashPoint) -> ChainResult<TxConfirmation>;

    async fn end_round(&self, round_id: u64) -> ChainResult<TxConfirmation>;
}
