use crate::backend::wallet::{ChainProvider, WalletError};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Decimals of the settlement currency's atomic unit.
const CURRENCY_DECIMALS: u32 = 18;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage node error: {0}")]
    Node(String),
    #[error("payment failed: {0}")]
    Payment(#[from] WalletError),
    #[error("malformed balance: {0}")]
    MalformedBalance(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Content metadata attached to an upload transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FundReceipt {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
}

/// What the funded uploader needs from a storage node. `BundlrClient` is the
/// real implementation; tests substitute their own.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait StorageClient {
    /// Handshake with the node. Must complete before any other call.
    async fn ready(&mut self) -> Result<(), StorageError>;
    /// Funded balance for `address`, in atomic units of the settlement
    /// currency.
    async fn get_balance(&self, address: &str) -> Result<String, StorageError>;
    /// Deposits `amount_atomic` into the prepaid balance. Returns once the
    /// chain has confirmed the payment and the node has been told about it.
    async fn fund(&self, amount_atomic: &str) -> Result<FundReceipt, StorageError>;
    /// Submits `data` as one content-addressed transaction.
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<UploadReceipt, StorageError>;
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    addresses: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

/// HTTP client for a Bundlr-style storage node. Payments go through the
/// wrapped [`ChainProvider`]; everything else is plain REST.
pub struct BundlrClient {
    node_url: String,
    currency: String,
    provider: ChainProvider,
    http: reqwest::Client,
    deposit_address: Option<String>,
}

impl BundlrClient {
    pub fn new(node_url: String, currency: String, provider: ChainProvider) -> Self {
        Self {
            node_url: node_url.trim_end_matches('/').to_string(),
            currency,
            provider,
            http: reqwest::Client::new(),
            deposit_address: None,
        }
    }

    pub fn provider(&self) -> &ChainProvider {
        &self.provider
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl StorageClient for BundlrClient {
    async fn ready(&mut self) -> Result<(), StorageError> {
        let url = format!("{}/info", self.node_url);
        let response = self.http.get(&url).send().await?;
        let info: NodeInfo = check_status(response, "node handshake").await?.json().await?;
        let deposit = info.addresses.get(&self.currency).cloned().ok_or_else(|| {
            StorageError::Node(format!("node does not settle in {}", self.currency))
        })?;
        self.deposit_address = Some(deposit);
        Ok(())
    }

    async fn get_balance(&self, address: &str) -> Result<String, StorageError> {
        let url = format!(
            "{}/account/balance/{}?address={}",
            self.node_url, self.currency, address
        );
        let response = self.http.get(&url).send().await?;
        let balance: BalanceResponse =
            check_status(response, "balance query").await?.json().await?;
        Ok(balance.balance)
    }

    async fn fund(&self, amount_atomic: &str) -> Result<FundReceipt, StorageError> {
        let deposit = self
            .deposit_address
            .as_deref()
            .ok_or_else(|| StorageError::Node("client not ready".to_string()))?;
        let tx_hash = self.provider.send_payment(deposit, amount_atomic).await?;

        // The payment is confirmed; now have the node credit it.
        let url = format!("{}/account/balance/{}", self.node_url, self.currency);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "tx_id": tx_hash }))
            .send()
            .await?;
        check_status(response, "funding credit").await?;
        Ok(FundReceipt { tx_hash })
    }

    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<UploadReceipt, StorageError> {
        let anchor: [u8; 32] = rand::random();
        let mut hasher = Sha256::new();
        hasher.update(anchor);
        hasher.update(&data);
        let digest = hasher.finalize();
        let signature = self.provider.sign_message(&digest).await?;

        let body = json!({
            "data": general_purpose::STANDARD.encode(&data),
            "tags": tags,
            "owner": self.provider.address_hex(),
            "anchor": hex::encode(anchor),
            "signature": signature,
        });
        let url = format!("{}/tx/{}", self.node_url, self.currency);
        let response = self.http.post(&url).json(&body).send().await?;
        let receipt: UploadReceipt = check_status(response, "content upload")
            .await?
            .json()
            .await?;
        Ok(receipt)
    }
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, StorageError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Node(format!(
        "{} failed with {}: {}",
        context, status, body
    )))
}

/// Converts an atomic-unit balance string to whole units of the settlement
/// currency.
pub fn to_units(atomic: &str) -> Result<f64, StorageError> {
    let raw: u128 = atomic
        .trim()
        .parse()
        .map_err(|_| StorageError::MalformedBalance(atomic.to_string()))?;
    Ok(raw as f64 / 10f64.powi(CURRENCY_DECIMALS as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_units_converts_atomic_balances() {
        assert_eq!(to_units("200000000000000000").unwrap(), 0.2);
        assert_eq!(to_units("50000000000000000").unwrap(), 0.05);
        assert_eq!(to_units("0").unwrap(), 0.0);
    }

    #[test]
    fn test_to_units_rejects_garbage() {
        assert!(to_units("not-a-number").is_err());
        assert!(to_units("-5").is_err());
    }

    #[test]
    fn test_tag_serializes_as_name_value() {
        let tag = Tag::new("Content-Type", "application/json");
        let value = serde_json::to_value(&tag).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "name": "Content-Type", "value": "application/json" })
        );
    }
}
