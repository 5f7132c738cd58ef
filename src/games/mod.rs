//! Round domain types and outcome generation

pub mod outcome;
pub mod types;

pub use outcome::{FixedCrashPoint, OutcomeSource, UniformCrashPoints};
pub use types::{ConfigUpdate, CrashPoint, GameConfig, GameRound, RoundSnapshot, RoundStatus};
