use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U256};
use serde_json::{json, Value};
use std::path::Path;
use thiserror::Error;

const CONFIRM_ATTEMPTS: u32 = 60;
const CONFIRM_POLL_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("rpc request failed: {0}")]
    Rpc(#[from] reqwest::Error),
    #[error("rpc node error: {0}")]
    Node(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("transaction {0} reverted")]
    Reverted(String),
    #[error("transaction {0} not confirmed in time")]
    Unconfirmed(String),
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_wallet(path: &Path) -> Result<LocalWallet, Box<dyn std::error::Error>> {
    if path.exists() {
        let hex_key = std::fs::read_to_string(path)?;
        let wallet = hex_key.trim().parse::<LocalWallet>()?;
        Ok(wallet)
    } else {
        Err("Wallet key file not found".into())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_wallet(path: &Path, wallet: &LocalWallet) -> Result<(), Box<dyn std::error::Error>> {
    let hex_key = hex::encode(wallet.signer().to_bytes());
    std::fs::write(path, hex_key)?;
    Ok(())
}

/// The connected wallet, if any. The funded uploader refuses to run without
/// one.
pub struct WalletSession {
    wallet: Option<LocalWallet>,
}

impl WalletSession {
    pub fn connected(wallet: LocalWallet) -> Self {
        Self {
            wallet: Some(wallet),
        }
    }

    pub fn disconnected() -> Self {
        Self { wallet: None }
    }

    /// Loads the wallet key from disk, generating and persisting a fresh one
    /// on first run.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let wallet = match load_wallet(path) {
            Ok(wallet) => {
                tracing::info!("Loaded existing wallet key");
                wallet
            }
            Err(_) => {
                tracing::info!("Generating new wallet key");
                let wallet = LocalWallet::new(&mut rand::thread_rng());
                save_wallet(path, &wallet)?;
                wallet
            }
        };
        Ok(Self::connected(wallet))
    }

    // Browsers get an ephemeral session key; there is no filesystem to keep
    // one in.
    #[cfg(target_arch = "wasm32")]
    pub fn open(_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::connected(LocalWallet::new(&mut rand::thread_rng())))
    }

    pub fn signer(&self) -> Option<&LocalWallet> {
        self.wallet.as_ref()
    }

    pub fn address(&self) -> Option<String> {
        self.wallet.as_ref().map(|w| address_hex(w.address()))
    }
}

pub fn address_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Wraps a signer and a JSON-RPC endpoint into the provider shape the storage
/// client needs: an address, message signing, and confirmed payments.
#[derive(Clone)]
pub struct ChainProvider {
    wallet: LocalWallet,
    rpc_url: String,
    http: reqwest::Client,
}

impl ChainProvider {
    pub fn new(wallet: LocalWallet, rpc_url: String, chain_id: u64) -> Self {
        Self {
            wallet: wallet.with_chain_id(chain_id),
            rpc_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn address_hex(&self) -> String {
        address_hex(self.wallet.address())
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<String, WalletError> {
        let signature = self
            .wallet
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(format!("0x{}", signature))
    }

    /// Transfers `amount_atomic` (smallest denomination, decimal string) to
    /// `to` and waits for the receipt. Returns the transaction hash only once
    /// the chain has confirmed it.
    pub async fn send_payment(&self, to: &str, amount_atomic: &str) -> Result<String, WalletError> {
        let to: Address = to
            .parse()
            .map_err(|_| WalletError::InvalidAddress(to.to_string()))?;
        let value = U256::from_dec_str(amount_atomic)
            .map_err(|_| WalletError::InvalidAmount(amount_atomic.to_string()))?;

        let from = self.wallet.address();
        let nonce = self
            .rpc("eth_getTransactionCount", json!([address_hex(from), "pending"]))
            .await
            .and_then(u256_from_hex)?;
        let gas_price = self
            .rpc("eth_gasPrice", json!([]))
            .await
            .and_then(u256_from_hex)?;

        let tx = TransactionRequest::new()
            .from(from)
            .to(to)
            .value(value)
            .nonce(nonce)
            .gas(21_000u64)
            .gas_price(gas_price)
            .chain_id(self.wallet.chain_id());
        let typed: TypedTransaction = tx.into();
        let signature = self
            .wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);

        let tx_hash = self
            .rpc(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw.as_ref()))]),
            )
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Node("malformed transaction hash".to_string()))?;

        self.wait_for_receipt(tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: String) -> Result<String, WalletError> {
        for _ in 0..CONFIRM_ATTEMPTS {
            let receipt = self
                .rpc("eth_getTransactionReceipt", json!([&tx_hash]))
                .await?;
            if !receipt.is_null() {
                if receipt["status"] == "0x1" {
                    return Ok(tx_hash);
                }
                return Err(WalletError::Reverted(tx_hash));
            }
            sleep_ms(CONFIRM_POLL_MS).await;
        }
        Err(WalletError::Unconfirmed(tx_hash))
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if let Some(error) = response.get("error") {
            if !error.is_null() {
                return Err(WalletError::Node(error.to_string()));
            }
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn u256_from_hex(value: Value) -> Result<U256, WalletError> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::Node("expected hex quantity".to_string()))?;
    U256::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|_| WalletError::Node(format!("malformed hex quantity: {}", raw)))
}

async fn sleep_ms(ms: u64) {
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::TimeoutFuture::new(ms as u32).await;
}
