use crate::backend::storage::{self, BundlrClient, StorageClient, StorageError, Tag};
use crate::backend::wallet::{ChainProvider, WalletSession};
#[cfg(not(target_arch = "wasm32"))]
use futures::future::BoxFuture;
#[cfg(target_arch = "wasm32")]
use futures::future::LocalBoxFuture;
use futures::future::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_NODE_URL: &str = "https://node1.bundlr.network";
pub const DEFAULT_CURRENCY: &str = "matic";
pub const DEFAULT_RPC_URL: &str = "https://polygon-rpc.com";
pub const DEFAULT_CHAIN_ID: u64 = 137;
/// Retrieval URLs are `{GATEWAY_URL}/{tx id}`; consumers parse them, so the
/// shape is load-bearing.
pub const GATEWAY_URL: &str = "https://arweave.net";
/// Prepaid balance floor, in whole units of the settlement currency.
pub const MIN_BALANCE: f64 = 0.05;
/// Fixed top-up: 0.2 units, expressed in the atomic denomination.
pub const TOP_UP_ATOMIC: &str = "200000000000000000";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no wallet signer is connected")]
    SignerUnavailable,
    #[error("storage client initialization failed: {0}")]
    StorageClientInitFailed(#[source] StorageError),
    #[error("funding failed: {0}")]
    FundingFailed(#[source] StorageError),
    #[error("content upload failed: {0}")]
    UploadFailed(#[source] StorageError),
}

/// The upload capability handed to the social client's update operation.
#[cfg(not(target_arch = "wasm32"))]
pub type UploadFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<String, UploadError>> + Send + Sync>;
#[cfg(target_arch = "wasm32")]
pub type UploadFn = Arc<dyn Fn(Value) -> LocalBoxFuture<'static, Result<String, UploadError>>>;

/// Endpoints and thresholds for the funded uploader. A struct rather than
/// bare globals so tests can point it somewhere else.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub node_url: String,
    pub currency: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub gateway_url: String,
    pub min_balance: f64,
    pub top_up_atomic: String,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            node_url: DEFAULT_NODE_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            gateway_url: GATEWAY_URL.to_string(),
            min_balance: MIN_BALANCE,
            top_up_atomic: TOP_UP_ATOMIC.to_string(),
        }
    }
}

/// Uploads JSON payloads to the storage network, topping up the prepaid
/// balance first when it runs low.
///
/// Each call may spend real funds (one funding transaction plus one content
/// transaction), so calls are not idempotent and nothing here retries.
pub struct FundedUploader {
    config: UploaderConfig,
    session: WalletSession,
}

impl FundedUploader {
    pub fn new(config: UploaderConfig, session: WalletSession) -> Self {
        Self { config, session }
    }

    pub fn address(&self) -> Option<String> {
        self.session.address()
    }

    /// Persists `payload` to the storage network and returns its public
    /// retrieval URL.
    pub async fn upload(&self, payload: &Value) -> Result<String, UploadError> {
        let signer = self
            .session
            .signer()
            .cloned()
            .ok_or(UploadError::SignerUnavailable)?;
        let provider =
            ChainProvider::new(signer, self.config.rpc_url.clone(), self.config.chain_id);
        let address = provider.address_hex();
        let mut client = BundlrClient::new(
            self.config.node_url.clone(),
            self.config.currency.clone(),
            provider,
        );
        client
            .ready()
            .await
            .map_err(UploadError::StorageClientInitFailed)?;
        self.fund_and_upload(&client, &address, payload).await
    }

    /// Funding, when needed, completes and confirms strictly before the
    /// content transaction is submitted.
    async fn fund_and_upload<C: StorageClient>(
        &self,
        client: &C,
        address: &str,
        payload: &Value,
    ) -> Result<String, UploadError> {
        let raw = client
            .get_balance(address)
            .await
            .map_err(UploadError::FundingFailed)?;
        let balance = storage::to_units(&raw).map_err(UploadError::FundingFailed)?;
        if balance < self.config.min_balance {
            tracing::info!(balance, address, "prepaid balance below minimum, topping up");
            client
                .fund(&self.config.top_up_atomic)
                .await
                .map_err(UploadError::FundingFailed)?;
        }

        let serialized = serde_json::to_string(payload)
            .map_err(|e| UploadError::UploadFailed(StorageError::Encoding(e.to_string())))?;
        let receipt = client
            .upload(
                serialized.into_bytes(),
                vec![Tag::new("Content-Type", "application/json")],
            )
            .await
            .map_err(UploadError::UploadFailed)?;

        let url = format!(
            "{}/{}",
            self.config.gateway_url.trim_end_matches('/'),
            receipt.id
        );
        tracing::info!(%url, "upload complete");
        Ok(url)
    }

    /// Boxes this uploader as the [`UploadFn`] capability the social client
    /// invokes when an update needs its metadata persisted.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn upload_fn(self: &Arc<Self>) -> UploadFn {
        let uploader = Arc::clone(self);
        Arc::new(move |payload: Value| {
            let uploader = Arc::clone(&uploader);
            async move { uploader.upload(&payload).await }.boxed()
        })
    }

    #[cfg(target_arch = "wasm32")]
    pub fn upload_fn(self: &Arc<Self>) -> UploadFn {
        let uploader = Arc::clone(self);
        Arc::new(move |payload: Value| {
            let uploader = Arc::clone(&uploader);
            async move { uploader.upload(&payload).await }.boxed_local()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{FundReceipt, UploadReceipt};
    use serde_json::json;
    use std::sync::Mutex;

    struct MockStorage {
        balance: String,
        fail_fund: bool,
        calls: Mutex<Vec<&'static str>>,
        uploaded: Mutex<Option<(Vec<u8>, Vec<Tag>)>>,
    }

    impl MockStorage {
        fn with_balance(balance: &str) -> Self {
            Self {
                balance: balance.to_string(),
                fail_fund: false,
                calls: Mutex::new(vec![]),
                uploaded: Mutex::new(None),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl StorageClient for MockStorage {
        async fn ready(&mut self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get_balance(&self, _address: &str) -> Result<String, StorageError> {
            self.calls.lock().unwrap().push("balance");
            Ok(self.balance.clone())
        }

        async fn fund(&self, _amount_atomic: &str) -> Result<FundReceipt, StorageError> {
            self.calls.lock().unwrap().push("fund");
            if self.fail_fund {
                return Err(StorageError::Node("funding rejected".to_string()));
            }
            Ok(FundReceipt {
                tx_hash: "0xfund".to_string(),
            })
        }

        async fn upload(
            &self,
            data: Vec<u8>,
            tags: Vec<Tag>,
        ) -> Result<UploadReceipt, StorageError> {
            self.calls.lock().unwrap().push("upload");
            *self.uploaded.lock().unwrap() = Some((data, tags));
            Ok(UploadReceipt {
                id: "mock-tx-1".to_string(),
            })
        }
    }

    fn uploader() -> FundedUploader {
        FundedUploader::new(UploaderConfig::default(), WalletSession::disconnected())
    }

    #[tokio::test]
    async fn test_tops_up_before_upload_when_underfunded() {
        // 0.01 units, below the 0.05 floor
        let storage = MockStorage::with_balance("10000000000000000");
        let url = uploader()
            .fund_and_upload(&storage, "0xabc", &json!({"hello": "world"}))
            .await
            .unwrap();

        assert_eq!(storage.calls(), vec!["balance", "fund", "upload"]);
        assert_eq!(url, "https://arweave.net/mock-tx-1");
    }

    #[tokio::test]
    async fn test_skips_funding_at_threshold() {
        // exactly 0.05 units
        let storage = MockStorage::with_balance("50000000000000000");
        let url = uploader()
            .fund_and_upload(&storage, "0xabc", &json!({"hello": "world"}))
            .await
            .unwrap();

        assert_eq!(storage.calls(), vec!["balance", "upload"]);
        assert_eq!(url, "https://arweave.net/mock-tx-1");
    }

    #[tokio::test]
    async fn test_funding_failure_aborts_upload() {
        let mut storage = MockStorage::with_balance("0");
        storage.fail_fund = true;

        let result = uploader()
            .fund_and_upload(&storage, "0xabc", &json!({"hello": "world"}))
            .await;

        assert!(matches!(result, Err(UploadError::FundingFailed(_))));
        assert_eq!(storage.calls(), vec!["balance", "fund"]);
    }

    #[tokio::test]
    async fn test_malformed_balance_is_a_funding_error() {
        let storage = MockStorage::with_balance("not-a-balance");
        let result = uploader()
            .fund_and_upload(&storage, "0xabc", &json!({}))
            .await;

        assert!(matches!(result, Err(UploadError::FundingFailed(_))));
        assert_eq!(storage.calls(), vec!["balance"]);
    }

    #[tokio::test]
    async fn test_payload_serialized_compactly_with_content_type() {
        let storage = MockStorage::with_balance("100000000000000000");
        let payload = json!({"name": "Alice", "bio": "hi"});
        uploader()
            .fund_and_upload(&storage, "0xabc", &payload)
            .await
            .unwrap();

        let (data, tags) = storage.uploaded.lock().unwrap().clone().unwrap();
        assert_eq!(data, serde_json::to_string(&payload).unwrap().into_bytes());
        assert_eq!(tags, vec![Tag::new("Content-Type", "application/json")]);
    }

    #[tokio::test]
    async fn test_upload_requires_connected_signer() {
        let result = uploader().upload(&json!({})).await;
        assert!(matches!(result, Err(UploadError::SignerUnavailable)));
    }
}
