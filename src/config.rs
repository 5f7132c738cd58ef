//! Operator configuration
//!
//! Defaults, optional TOML file, then environment overrides, then validation.
//! Everything is read once at startup.

use crate::errors::{ConfigResult, ConfigurationError};
use crate::games::types::MAX_HOUSE_EDGE;
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::Path, str::FromStr, time::Duration};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_PROGRAM_ID: &str = "CX9N85RmEnkFybbab3YTfQViUN4SvsTxrLy7Po2aWzGf";

/// Complete operator configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub chain: ChainConfig,
    pub game: GameDefaults,
    pub rounds: RoundTiming,
    pub api: ApiConfig,
}

/// Which chain client backs the coordinator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// Live program over JSON-RPC
    Rpc,
    /// In-process simulation, nothing leaves the machine
    Memory,
}

impl FromStr for ChainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpc" => Ok(ChainMode::Rpc),
            "memory" => Ok(ChainMode::Memory),
            other => Err(format!("unknown chain mode '{}'", other)),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub mode: ChainMode,
    pub rpc_url: String,
    pub program_id: String,
    /// JSON byte array of the admin keypair; never written back out
    #[serde(skip_serializing)]
    pub admin_secret_key: Option<String>,
    pub admin_keypair_path: Option<String>,
    /// Upper bound on every submission or read against the program
    pub submit_timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mode: ChainMode::Rpc,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            admin_secret_key: None,
            admin_keypair_path: None,
            submit_timeout_ms: 45_000,
        }
    }
}

impl ChainConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("mode", &self.mode)
            .field("rpc_url", &self.rpc_url)
            .field("program_id", &self.program_id)
            .field("admin_secret_key", &self.admin_secret_key.as_ref().map(|_| "<redacted>"))
            .field("admin_keypair_path", &self.admin_keypair_path)
            .field("submit_timeout_ms", &self.submit_timeout_ms)
            .finish()
    }
}

/// Values written to the program when it is bootstrapped
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameDefaults {
    pub house_edge: u8,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl Default for GameDefaults {
    fn default() -> Self {
        Self {
            house_edge: 5,
            min_bet: 1_000_000,
            max_bet: 100_000_000,
        }
    }
}

/// Autonomous loop cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTiming {
    pub active_duration_ms: u64,
    pub gap_duration_ms: u64,
    pub retry_backoff_ms: u64,
    /// End the in-flight round before the loop exits on shutdown
    pub finish_on_shutdown: bool,
}

impl Default for RoundTiming {
    fn default() -> Self {
        Self {
            active_duration_ms: 30_000,
            gap_duration_ms: 5_000,
            retry_backoff_ms: 3_000,
            finish_on_shutdown: true,
        }
    }
}

impl RoundTiming {
    pub fn active_duration(&self) -> Duration {
        Duration::from_millis(self.active_duration_ms)
    }

    pub fn gap_duration(&self) -> Duration {
        Duration::from_millis(self.gap_duration_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Admin HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            allowed_origins: vec!["*".to_string()],
            // Admin calls wait for confirmation, so this sits above the submit timeout
            request_timeout_secs: 60,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and process environment
    pub fn load(&self) -> ConfigResult<OperatorConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(&self, lookup: F) -> ConfigResult<OperatorConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => OperatorConfig::default(),
        };

        apply_overrides(&mut config, lookup)?;
        validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> ConfigResult<OperatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }
}

fn parse_var<T: FromStr>(field: &str, value: String, reason: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

fn apply_overrides<F>(config: &mut OperatorConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Chain
    if let Some(mode) = lookup("CHAIN_MODE") {
        config.chain.mode = parse_var("CHAIN_MODE", mode, "Expected 'rpc' or 'memory'")?;
    }
    if let Some(url) = lookup("RPC_URL") {
        config.chain.rpc_url = url;
    }
    if let Some(program_id) = lookup("PROGRAM_ID") {
        config.chain.program_id = program_id;
    }
    if let Some(secret) = lookup("ADMIN_SECRET_KEY") {
        config.chain.admin_secret_key = Some(secret);
    }
    if let Some(path) = lookup("ADMIN_KEYPAIR_PATH") {
        config.chain.admin_keypair_path = Some(path);
    }
    if let Some(timeout) = lookup("SUBMIT_TIMEOUT_MS") {
        config.chain.submit_timeout_ms = parse_var("SUBMIT_TIMEOUT_MS", timeout, "Invalid timeout value")?;
    }

    // Game defaults
    if let Some(edge) = lookup("HOUSE_EDGE") {
        config.game.house_edge = parse_var("HOUSE_EDGE", edge, "Expected a percentage 0-100")?;
    }
    if let Some(min) = lookup("MIN_BET") {
        config.game.min_bet = parse_var("MIN_BET", min, "Expected an unsigned integer amount")?;
    }
    if let Some(max) = lookup("MAX_BET") {
        config.game.max_bet = parse_var("MAX_BET", max, "Expected an unsigned integer amount")?;
    }

    // Round timing
    if let Some(ms) = lookup("ROUND_DURATION_MS") {
        config.rounds.active_duration_ms = parse_var("ROUND_DURATION_MS", ms, "Invalid duration")?;
    }
    if let Some(ms) = lookup("GAP_BETWEEN_ROUNDS_MS") {
        config.rounds.gap_duration_ms = parse_var("GAP_BETWEEN_ROUNDS_MS", ms, "Invalid duration")?;
    }
    if let Some(ms) = lookup("RETRY_BACKOFF_MS") {
        config.rounds.retry_backoff_ms = parse_var("RETRY_BACKOFF_MS", ms, "Invalid duration")?;
    }

    // API
    if let Some(host) = lookup("API_HOST") {
        config.api.host = host;
    }
    if let Some(port) = lookup("API_PORT") {
        config.api.port = parse_var("API_PORT", port, "Invalid port number")?;
    }

    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate configuration values
pub fn validate(config: &OperatorConfig) -> ConfigResult<()> {
    if config.game.house_edge > MAX_HOUSE_EDGE {
        return Err(invalid("game.house_edge", config.game.house_edge, "House edge must be 0-100"));
    }
    if config.game.min_bet > config.game.max_bet {
        return Err(invalid(
            "game.min_bet",
            config.game.min_bet,
            "Min bet cannot exceed max bet",
        ));
    }

    if config.rounds.active_duration_ms == 0 {
        return Err(invalid("rounds.active_duration_ms", 0, "Active duration cannot be zero"));
    }
    if config.rounds.retry_backoff_ms == 0 {
        return Err(invalid("rounds.retry_backoff_ms", 0, "Retry backoff cannot be zero"));
    }

    if config.chain.submit_timeout_ms < 100 {
        return Err(invalid(
            "chain.submit_timeout_ms",
            config.chain.submit_timeout_ms,
            "Timeout must be at least 100ms",
        ));
    }
    if config.chain.mode == ChainMode::Rpc {
        if config.chain.rpc_url.is_empty() {
            return Err(ConfigurationError::MissingRequired("chain.rpc_url".to_string()));
        }
        if config.chain.program_id.is_empty() {
            return Err(ConfigurationError::MissingRequired("chain.program_id".to_string()));
        }
    }

    if config.api.port == 0 {
        return Err(invalid("api.port", 0, "API port cannot be zero"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = OperatorConfig::default();
        assert_eq!(config.game.house_edge, 5);
        assert_eq!(config.game.min_bet, 1_000_000);
        assert_eq!(config.game.max_bet, 100_000_000);
        assert_eq!(config.rounds.active_duration_ms, 30_000);
        assert_eq!(config.rounds.gap_duration_ms, 5_000);
        assert_eq!(config.api.port, 4000);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigLoader::new()
            .load_with(env_of(&[
                ("HOUSE_EDGE", "7"),
                ("MIN_BET", "10"),
                ("MAX_BET", "20"),
                ("ROUND_DURATION_MS", "1500"),
                ("CHAIN_MODE", "memory"),
                ("ADMIN_SECRET_KEY", "[1,2,3]"),
            ]))
            .unwrap();

        assert_eq!(config.game.house_edge, 7);
        assert_eq!(config.game.min_bet, 10);
        assert_eq!(config.game.max_bet, 20);
        assert_eq!(config.rounds.active_duration_ms, 1500);
        assert_eq!(config.chain.mode, ChainMode::Memory);
        assert_eq!(config.chain.admin_secret_key.as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_invalid_env_value() {
        let result = ConfigLoader::new().load_with(env_of(&[("HOUSE_EDGE", "lots")]));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "HOUSE_EDGE"
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = OperatorConfig::default();
        config.game.house_edge = 101;
        assert!(validate(&config).is_err());

        let mut config = OperatorConfig::default();
        config.game.min_bet = config.game.max_bet + 1;
        assert!(validate(&config).is_err());

        let mut config = OperatorConfig::default();
        config.chain.submit_timeout_ms = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_secret_redacted_in_debug() {
        let config = ChainConfig {
            admin_secret_key: Some("[9,9,9]".to_string()),
            ..ChainConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("9,9,9"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[rounds]\ngap_duration_ms = 42\n").unwrap();

        let config = ConfigLoader::new()
            .with_path(temp_file.path())
            .load_with(env_of(&[]))
            .unwrap();

        assert_eq!(config.rounds.gap_duration_ms, 42);
        assert_eq!(config.rounds.active_duration_ms, 30_000);
        assert_eq!(config.api.port, 4000);
    }
}
