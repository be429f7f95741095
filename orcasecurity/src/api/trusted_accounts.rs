//! Trusted cloud account API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

pub const CLOUD_PROVIDERS: &[&str] = &["aws", "azure", "gcp"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedCloudAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub cloud_provider: String,
    pub account_id: String,
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct TrustedAccountsApi<'a> {
    client: &'a Client,
}

impl<'a> TrustedAccountsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/trusted_cloud_accounts/{id}
    pub async fn get(&self, id: &str) -> Result<TrustedCloudAccount, ApiError> {
        self.client
            .get(&format!("/api/trusted_cloud_accounts/{}", id))
            .await
    }

    /// POST /api/trusted_cloud_accounts
    pub async fn create(
        &self,
        request: &TrustedCloudAccount,
    ) -> Result<TrustedCloudAccount, ApiError> {
        self.client.post("/api/trusted_cloud_accounts", request).await
    }

    /// PUT /api/trusted_cloud_accounts/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &TrustedCloudAccount,
    ) -> Result<TrustedCloudAccount, ApiError> {
        self.client
            .put(&format!("/api/trusted_cloud_accounts/{}", id), request)
            .await
    }

    /// DELETE /api/trusted_cloud_accounts/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/trusted_cloud_accounts/{}", id))
            .await
            .map(|_| ())
    }
}
