//! Custom discovery alert API implementation
//!
//! Discovery alerts fire on asset inventory queries. The `query` field
//! carries the parsed discovery filter; `organization_id` is assigned by
//! the server.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationText {
    pub enable: bool,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceFramework {
    pub name: String,
    pub section: String,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomDiscoveryAlert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: serde_json::Value,
    pub category: String,
    pub score: f64,
    pub allow_adjusting_severity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_text: Option<RemediationText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_frameworks: Option<Vec<ComplianceFramework>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

pub struct AlertsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/rules/{id}
    pub async fn get(&self, id: &str) -> Result<CustomDiscoveryAlert, ApiError> {
        self.client.get(&format!("/api/rules/{}", id)).await
    }

    /// POST /api/rules
    pub async fn create(
        &self,
        request: &CustomDiscoveryAlert,
    ) -> Result<CustomDiscoveryAlert, ApiError> {
        self.client.post("/api/rules", request).await
    }

    /// PUT /api/rules/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &CustomDiscoveryAlert,
    ) -> Result<CustomDiscoveryAlert, ApiError> {
        self.client
            .put(&format!("/api/rules/{}", id), request)
            .await
    }

    /// DELETE /api/rules/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/rules/{}", id))
            .await
            .map(|_| ())
    }
}
