//! Anchor wire format for the crash game program
//!
//! Instruction data is an 8-byte discriminator (`sha256("global:<name>")[..8]`)
//! followed by the arguments in Borsh layout. For the integer, bool and
//! `Option` arguments used here Borsh and bincode's default fixed-int little
//! endian encoding are byte-identical, so bincode does the encoding.
//! Accounts carry an 8-byte `sha256("account:<Name>")[..8]` prefix.

use crate::errors::{ChainError, ChainResult};
use crate::games::types::{ConfigUpdate, CrashPoint, GameConfig, RoundSnapshot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

pub const GAME_CONFIG_SEED: &[u8] = b"game_config";
pub const ROUND_SEED: &[u8] = b"round";

const DISCRIMINATOR_LEN: usize = 8;

fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("global", name)
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("account", name)
}

#[derive(Serialize)]
struct InitializeArgs {
    house_edge: u8,
}

#[derive(Serialize)]
struct UpdateConfigArgs {
    min_bet: Option<u64>,
    max_bet: Option<u64>,
    house_edge: Option<u8>,
}

#[derive(Serialize)]
struct StartRoundArgs {
    round_id: u64,
    crash_point: u16,
}

/// `GameConfig` account body after the discriminator
#[derive(Deserialize)]
struct GameConfigAccount {
    _authority: [u8; 32],
    house_edge: u8,
    min_bet: u64,
    max_bet: u64,
    total_games: u64,
}

/// `GameRound` account body after the discriminator
#[derive(Deserialize)]
struct GameRoundAccount {
    round_id: u64,
    crash_point: u16,
    is_active: bool,
}

fn encode<T: Serialize>(name: &str, args: &T) -> ChainResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    let body = bincode::serialize(args)
        .map_err(|e| ChainError::Decode(format!("failed to encode {} args: {}", name, e)))?;
    data.extend_from_slice(&body);
    Ok(data)
}

fn decode<T: DeserializeOwned>(name: &str, data: &[u8]) -> ChainResult<T> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(ChainError::Decode(format!(
            "{} account too short: {} bytes",
            name,
            data.len()
        )));
    }
    let (prefix, body) = data.split_at(DISCRIMINATOR_LEN);
    if prefix != account_discriminator(name) {
        return Err(ChainError::Decode(format!("{} discriminator mismatch", name)));
    }
    // Trailing bytes (bump, padding) are ignored
    bincode::deserialize(body).map_err(|e| ChainError::Decode(format!("{}: {}", name, e)))
}

pub fn decode_game_config(data: &[u8]) -> ChainResult<GameConfig> {
    let account: GameConfigAccount = decode("GameConfig", data)?;
    Ok(GameConfig {
        house_edge_percent: account.house_edge,
        min_bet: account.min_bet,
        max_bet: account.max_bet,
        total_games_completed: account.total_games,
    })
}

pub fn decode_game_round(data: &[u8]) -> ChainResult<RoundSnapshot> {
    let account: GameRoundAccount = decode("GameRound", data)?;
    Ok(RoundSnapshot {
        round_id: account.round_id,
        crash_point: account.crash_point,
        active: account.is_active,
    })
}

/// Program id plus the addresses derived from it
#[derive(Debug, Clone)]
pub struct ProgramAccounts {
    pub program_id: Pubkey,
    pub game_config: Pubkey,
}

impl ProgramAccounts {
    pub fn new(program_id: Pubkey) -> Self {
        let (game_config, _) = Pubkey::find_program_address(&[GAME_CONFIG_SEED], &program_id);
        Self {
            program_id,
            game_config,
        }
    }

    pub fn round_address(&self, round_id: u64) -> Pubkey {
        let (address, _) =
            Pubkey::find_program_address(&[ROUND_SEED, &round_id.to_le_bytes()], &self.program_id);
        address
    }

    pub fn initialize(&self, authority: &Pubkey, house_edge: u8) -> ChainResult<Instruction> {
        let data = encode("initialize", &InitializeArgs { house_edge })?;
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(self.game_config, false),
                AccountMeta::new(*authority, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        ))
    }

    pub fn update_config(&self, authority: &Pubkey, update: ConfigUpdate) -> ChainResult<Instruction> {
        let args = UpdateConfigArgs {
            min_bet: update.min_bet,
            max_bet: update.max_bet,
            house_edge: update.house_edge,
        };
        let data = encode("update_config", &args)?;
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(self.game_config, false),
                AccountMeta::new_readonly(*authority, true),
            ],
        ))
    }

    pub fn start_round(
        &self,
        authority: &Pubkey,
        round_id: u64,
        crash_point: CrashPoint,
    ) -> ChainResult<Instruction> {
        let args = StartRoundArgs {
            round_id,
            crash_point: crash_point.hundredths(),
        };
        let data = encode("start_round", &args)?;
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(self.game_config, false),
                AccountMeta::new(self.round_address(round_id), false),
                AccountMeta::new(*authority, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        ))
    }

    pub fn end_round(&self, authority: &Pubkey, round_id: u64) -> ChainResult<Instruction> {
        let data = encode("end_round", &())?;
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(self.game_config, false),
                AccountMeta::new(self.round_address(round_id), false),
                AccountMeta::new_readonly(*authority, true),
            ],
        ))
    }
}
