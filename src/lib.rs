//! Crash game round operator
//!
//! Off-chain coordinator for an on-chain crash game program: bootstraps the
//! program config, drives rounds on a fixed cadence (start with a drawn crash
//! point, hold, end, pause) and exposes an admin HTTP surface for manual control.

pub mod api;
pub mod chain;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod games;
pub mod metrics;

pub use chain::{ChainClient, InMemoryChain, SolanaChainClient, TxConfirmation};
pub use config::{ChainMode, ConfigLoader, OperatorConfig};
pub use coordinator::{Coordinator, CoordinatorSnapshot, RoundLoop};
pub use errors::{ChainError, ConfigurationError, ControlError};
pub use games::{ConfigUpdate, CrashPoint, GameConfig, GameRound, RoundStatus};
