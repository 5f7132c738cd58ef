use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{ControlError, ControlResult};

/// Lowest crash point the program accepts (1.00x)
pub const MIN_CRASH_POINT: u16 = 100;

/// Highest crash point the program accepts (9.99x)
pub const MAX_CRASH_POINT: u16 = 999;

/// Highest house edge percentage
pub const MAX_HOUSE_EDGE: u8 = 100;

/// Global configuration mirrored from the program's `game_config` account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub house_edge_percent: u8,
    pub min_bet: u64,
    pub max_bet: u64,
    pub total_games_completed: u64,
}

impl GameConfig {
    /// Round id the coordinator should mint next for this config
    pub fn next_round_id(&self) -> u64 {
        self.total_games_completed.saturating_add(1)
    }
}

/// Round outcome multiplier in hundredths, always within 100..=999
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u16", into = "u16")]
pub struct CrashPoint(u16);

impl CrashPoint {
    pub fn new(hundredths: u16) -> ControlResult<Self> {
        if !(MIN_CRASH_POINT..=MAX_CRASH_POINT).contains(&hundredths) {
            return Err(ControlError::Validation(format!(
                "crash point must be between {} and {}, got {}",
                MIN_CRASH_POINT, MAX_CRASH_POINT, hundredths
            )));
        }
        Ok(Self(hundredths))
    }

    /// Clamp any value into the valid range
    pub fn saturating(hundredths: u16) -> Self {
        Self(hundredths.clamp(MIN_CRASH_POINT, MAX_CRASH_POINT))
    }

    pub fn hundredths(self) -> u16 {
        self.0
    }

    /// Multiplier as a float, for display only
    pub fn multiplier(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u16> for CrashPoint {
    type Error = ControlError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CrashPoint> for u16 {
    fn from(value: CrashPoint) -> Self {
        value.0
    }
}

impl fmt::Display for CrashPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

/// Round lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    /// Start submitted, not yet confirmed
    Pending,
    Active,
    Ended,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "pending"),
            RoundStatus::Active => write!(f, "active"),
            RoundStatus::Ended => write!(f, "ended"),
        }
    }
}

/// The coordinator's shadow of a round; the program holds the authoritative copy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRound {
    pub round_id: u64,
    pub crash_point: CrashPoint,
    pub status: RoundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl GameRound {
    pub fn pending(round_id: u64, crash_point: CrashPoint) -> Self {
        Self {
            round_id,
            crash_point,
            status: RoundStatus::Pending,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn activate(mut self) -> Self {
        self.status = RoundStatus::Active;
        self.started_at = Some(Utc::now());
        self
    }

    pub fn end(mut self) -> Self {
        self.status = RoundStatus::Ended;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Pending and active rounds both occupy the current-round slot
    pub fn is_in_flight(&self) -> bool {
        matches!(self.status, RoundStatus::Pending | RoundStatus::Active)
    }
}

/// On-chain view of a single round account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub crash_point: u16,
    pub active: bool,
}

/// Partial config update; every field is either left unchanged or set
///
/// `Some(0)` is a real value and is submitted as such.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub min_bet: Option<u64>,
    pub max_bet: Option<u64>,
    pub house_edge: Option<u8>,
}

impl ConfigUpdate {
    /// Full update used by bootstrap
    pub fn all(min_bet: u64, max_bet: u64, house_edge: u8) -> Self {
        Self {
            min_bet: Some(min_bet),
            max_bet: Some(max_bet),
            house_edge: Some(house_edge),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_bet.is_none() && self.max_bet.is_none() && self.house_edge.is_none()
    }

    /// Local checks; bounds against the current on-chain values are the program's job
    pub fn validate(&self) -> ControlResult<()> {
        if self.is_empty() {
            return Err(ControlError::Validation(
                "config update must set at least one of minBet, maxBet, houseEdge".to_string(),
            ));
        }
        if let Some(edge) = self.house_edge {
            validate_house_edge(edge)?;
        }
        if let (Some(min), Some(max)) = (self.min_bet, self.max_bet) {
            if min > max {
                return Err(ControlError::Validation(format!(
                    "minBet ({}) must not exceed maxBet ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Apply to a config the way the program does: unset fields stay unchanged
    pub fn apply_to(&self, config: &mut GameConfig) {
        if let Some(min) = self.min_bet {
            config.min_bet = min;
        }
        if let Some(max) = self.max_bet {
            config.max_bet = max;
        }
        if let Some(edge) = self.house_edge {
            config.house_edge_percent = edge;
        }
    }
}

pub fn validate_house_edge(house_edge: u8) -> ControlResult<()> {
    if house_edge > MAX_HOUSE_EDGE {
        return Err(ControlError::Validation(format!(
            "house edge must be between 0 and {}, got {}",
            MAX_HOUSE_EDGE, house_edge
        )));
    }
    Ok(())
}
