//! Webhook configuration API implementation
//!
//! Webhook configs are keyed by name, not by a server-assigned id, and the
//! API never returns the shared secret on reads.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub insecure: bool,
}

pub struct WebhooksApi<'a> {
    client: &'a Client,
}

impl<'a> WebhooksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/webhooks/{name}
    pub async fn get(&self, name: &str) -> Result<WebhookConfig, ApiError> {
        self.client.get(&format!("/api/webhooks/{}", name)).await
    }

    /// POST /api/webhooks
    pub async fn create(&self, request: &WebhookConfig) -> Result<WebhookConfig, ApiError> {
        self.client.post("/api/webhooks", request).await
    }

    /// PUT /api/webhooks/{name}
    pub async fn update(&self, name: &str, request: &WebhookConfig) -> Result<WebhookConfig, ApiError> {
        self.client
            .put(&format!("/api/webhooks/{}", name), request)
            .await
    }

    /// DELETE /api/webhooks/{name}
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/webhooks/{}", name))
            .await
            .map(|_| ())
    }
}
