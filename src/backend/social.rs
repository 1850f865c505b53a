use crate::backend::profile::{profile_metadata, Profile, ProfileUpdateRequest};
use crate::backend::uploader::{UploadError, UploadFn};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.lens.dev";

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("social api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("social api returned {status} for {path}")]
    Api { path: String, status: u16 },
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Client for the social protocol's HTTP API.
#[derive(Clone)]
pub struct SocialClient {
    base_url: String,
    http: reqwest::Client,
}

impl SocialClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// The profile currently bound to `address`, or `None` while the protocol
    /// has none for it.
    pub async fn active_profile(&self, address: &str) -> Result<Option<Profile>, SocialError> {
        let path = format!("/profiles/active?address={}", address);
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SocialError::Api {
                path,
                status: response.status().as_u16(),
            });
        }
        Ok(Some(response.json::<Profile>().await?))
    }

    /// Prepares the update operation for `profile`. The protocol persists its
    /// metadata off-chain through `upload`, which is why the capability is
    /// injected here instead of hard-wired.
    pub fn update_profile_details(&self, profile: &Profile, upload: UploadFn) -> UpdateProfileDetails {
        UpdateProfileDetails {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            profile_id: profile.id.clone(),
            upload,
        }
    }
}

pub struct UpdateProfileDetails {
    base_url: String,
    http: reqwest::Client,
    profile_id: String,
    upload: UploadFn,
}

#[derive(Debug, Clone)]
pub struct UpdateReceipt {
    pub content_url: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataResponse {
    #[serde(default)]
    tx_hash: Option<String>,
}

impl UpdateProfileDetails {
    /// Serializes the request's metadata, persists it through the upload
    /// capability, then submits the update pointing at the content URL. No
    /// retries at this layer; a failure surfaces as-is.
    pub async fn execute(&self, request: ProfileUpdateRequest) -> Result<UpdateReceipt, SocialError> {
        let metadata = profile_metadata(&request);
        let content_url = (self.upload)(metadata).await?;

        let path = format!("/profiles/{}/metadata", self.profile_id);
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "metadataUrl": content_url }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SocialError::Api {
                path,
                status: response.status().as_u16(),
            });
        }
        let receipt: MetadataResponse = response.json().await?;
        Ok(UpdateReceipt {
            content_url,
            tx_hash: receipt.tx_hash,
        })
    }
}
