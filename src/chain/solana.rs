//! RPC-backed chain client
//!
//! Builds one Anchor instruction per facade call, signs it with the admin
//! keypair and waits for `confirmed` commitment through the nonblocking
//! `RpcClient`.

use super::{
    instructions::{decode_game_config, decode_game_round, ProgramAccounts},
    ChainClient, TxConfirmation,
};
use crate::config::ChainConfig;
use crate::errors::{ChainError, ChainResult};
use crate::games::types::{ConfigUpdate, CrashPoint, GameConfig, RoundSnapshot};
use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SolanaChainClient {
    rpc: RpcClient,
    admin: Keypair,
    accounts: ProgramAccounts,
    commitment: CommitmentConfig,
}

impl SolanaChainClient {
    pub fn new(rpc_url: String, admin: Keypair, program_id: Pubkey) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, commitment),
            admin,
            accounts: ProgramAccounts::new(program_id),
            commitment,
        }
    }

    /// Build from configuration, loading the admin key from the inline secret or keypair file
    pub fn from_config(config: &ChainConfig) -> ChainResult<Self> {
        let admin = load_admin_keypair(config)?;
        let program_id = Pubkey::from_str(&config.program_id)
            .map_err(|e| ChainError::Key(format!("invalid program id '{}': {}", config.program_id, e)))?;

        info!(
            "🔑 Admin {} | program {} | rpc {}",
            admin.pubkey(),
            program_id,
            config.rpc_url
        );
        Ok(Self::new(config.rpc_url.clone(), admin, program_id))
    }

    async fn submit(&self, instruction: Instruction) -> ChainResult<TxConfirmation> {
        let blockhash = self.rpc.get_latest_blockhash().await.map_err(map_client_error)?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.admin.pubkey()),
            &[&self.admin],
            blockhash,
        );
        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(map_client_error)?;
        debug!(%signature, "transaction confirmed");
        Ok(TxConfirmation::new(signature.to_string()))
    }

    async fn account_data(&self, address: &Pubkey) -> ChainResult<Option<Vec<u8>>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(map_client_error)?;
        Ok(response.value.map(|account| account.data))
    }
}

#[async_trait]
impl ChainClient for SolanaChainClient {
    async fn fetch_config(&self) -> ChainResult<Option<GameConfig>> {
        self.account_data(&self.accounts.game_config)
            .await?
            .map(|data| decode_game_config(&data))
            .transpose()
    }

    async fn fetch_round(&self, round_id: u64) -> ChainResult<Option<RoundSnapshot>> {
        self.account_data(&self.accounts.round_address(round_id))
            .await?
            .map(|data| decode_game_round(&data))
            .transpose()
    }

    async fn initialize(&self, house_edge: u8) -> ChainResult<TxConfirmation> {
        let ix = self.accounts.initialize(&self.admin.pubkey(), house_edge)?;
        match self.submit(ix).await {
            // The system program only reports a generic allocation failure, so check the account
            Err(ChainError::Rejected(msg)) => match self.fetch_config().await {
                Ok(Some(_)) => Err(ChainError::AlreadyInitialized),
                _ => Err(ChainError::Rejected(msg)),
            },
            result => result,
        }
    }

    async fn update_config(&self, update: ConfigUpdate) -> ChainResult<TxConfirmation> {
        let ix = self.accounts.update_config(&self.admin.pubkey(), update)?;
        self.submit(ix).await
    }

    async fn start_round(&self, round_id: u64, crash_point: CrashPoint) -> ChainResult<TxConfirmation> {
        let ix = self
            .accounts
            .start_round(&self.admin.pubkey(), round_id, crash_point)?;
        self.submit(ix).await
    }

    async fn end_round(&self, round_id: u64) -> ChainResult<TxConfirmation> {
        let ix = self.accounts.end_round(&self.admin.pubkey(), round_id)?;
        self.submit(ix).await
    }
}

/// Program-level failures surface as transaction errors; everything else is transport
fn map_client_error(error: ClientError) -> ChainError {
    match error.get_transaction_error() {
        Some(tx_error) => ChainError::Rejected(format!("{} ({})", tx_error, error)),
        None => ChainError::Rpc(error.to_string()),
    }
}

/// Inline JSON byte array (`ADMIN_SECRET_KEY`) wins over a keypair file path
fn load_admin_keypair(config: &ChainConfig) -> ChainResult<Keypair> {
    if let Some(secret) = config.admin_secret_key.as_deref() {
        return keypair_from_json(secret);
    }
    if let Some(path) = config.admin_keypair_path.as_deref() {
        return read_keypair_file(path)
            .map_err(|e| ChainError::Key(format!("failed to read keypair file {}: {}", path, e)));
    }
    Err(ChainError::Key(
        "no admin key configured (set ADMIN_SECRET_KEY or ADMIN_KEYPAIR_PATH)".to_string(),
    ))
}

pub fn keypair_from_json(secret: &str) -> ChainResult<Keypair> {
    let bytes: Vec<u8> = serde_json::from_str(secret)
        .map_err(|e| ChainError::Key(format!("admin secret is not a JSON byte array: {}", e)))?;
    Keypair::try_from(bytes.as_slice()).map_err(|e| ChainError::Key(format!("invalid admin keypair: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_from_json_roundtrip() {
        let original = Keypair::new();
        let json = serde_json::to_string(&original.to_bytes().to_vec()).unwrap();

        let loaded = keypair_from_json(&json).unwrap();
        assert_eq!(loaded.pubkey(), original.pubkey());
    }

    #[test]
    fn test_keypair_from_json_rejects_garbage() {
        assert!(matches!(keypair_from_json("not json"), Err(ChainError::Key(_))));
        assert!(matches!(keypair_from_json("[1,2,3]"), Err(ChainError::Key(_))));
    }

    #[test]
    fn test_missing_key_material() {
        let config = ChainConfig {
            admin_secret_key: None,
            admin_keypair_path: None,
            ..ChainConfig::default()
        };
        assert!(matches!(load_admin_keypair(&config), Err(ChainError::Key(_))));
    }
}
