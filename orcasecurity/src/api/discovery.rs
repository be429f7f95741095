//! Discovery view API implementation
//!
//! Only requester-owned and organization-level views come back from this
//! endpoint; the server scopes visibility by the token.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub query: serde_json::Value,
    #[serde(default)]
    pub organization_level: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_params: HashMap<String, String>,
    /// Owner metadata reported on reads; never sent on writes
    #[serde(skip_serializing)]
    #[serde(default)]
    pub owner: Option<String>,
}

pub struct DiscoveryApi<'a> {
    client: &'a Client,
}

impl<'a> DiscoveryApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/discovery/views/{id}
    pub async fn get_view(&self, id: &str) -> Result<DiscoveryView, ApiError> {
        self.client
            .get(&format!("/api/discovery/views/{}", id))
            .await
    }

    /// POST /api/discovery/views
    pub async fn create_view(&self, request: &DiscoveryView) -> Result<DiscoveryView, ApiError> {
        self.client.post("/api/discovery/views", request).await
    }

    /// PUT /api/discovery/views/{id}
    pub async fn update_view(
        &self,
        id: &str,
        request: &DiscoveryView,
    ) -> Result<DiscoveryView, ApiError> {
        self.client
            .put(&format!("/api/discovery/views/{}", id), request)
            .await
    }

    /// DELETE /api/discovery/views/{id}
    pub async fn delete_view(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/discovery/views/{}", id))
            .await
            .map(|_| ())
    }
}
