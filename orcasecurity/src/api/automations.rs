//! Automation API implementation
//!
//! An automation pairs an alert query with response actions. Each action on
//! the wire is `{"type": <numeric id>, "data": {...}}`; the ids follow the
//! platform's action-type numbering and are not contiguous.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

pub const ACTION_TYPE_EMAIL: i64 = 1;
pub const ACTION_TYPE_SLACK: i64 = 3;
pub const ACTION_TYPE_WEBHOOK: i64 = 9;
pub const ACTION_TYPE_JIRA_ISSUE: i64 = 11;
pub const ACTION_TYPE_SPLUNK: i64 = 12;
pub const ACTION_TYPE_SUMOLOGIC: i64 = 13;
pub const ACTION_TYPE_OPSGENIE: i64 = 14;
pub const ACTION_TYPE_PAGER_DUTY: i64 = 16;
pub const ACTION_TYPE_AZURE_DEVOPS: i64 = 22;
pub const ACTION_TYPE_SERVICENOW: i64 = 26;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationAction {
    #[serde(rename = "type")]
    pub action_type: i64,
    pub data: serde_json::Value,
    /// v2 only; v1 actions leave this unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_level: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: serde_json::Value,
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<AutomationAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationV2 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dsl_filter: serde_json::Value,
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<AutomationAction>,
    #[serde(default)]
    pub business_units: Vec<String>,
}

/// Automations API (v1)
pub struct AutomationsApi<'a> {
    client: &'a Client,
}

impl<'a> AutomationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/automations/{id}
    pub async fn get(&self, id: &str) -> Result<Automation, ApiError> {
        self.client.get(&format!("/api/automations/{}", id)).await
    }

    /// POST /api/automations
    pub async fn create(&self, request: &Automation) -> Result<Automation, ApiError> {
        self.client.post("/api/automations", request).await
    }

    /// PUT /api/automations/{id}
    pub async fn update(&self, id: &str, request: &Automation) -> Result<Automation, ApiError> {
        self.client
            .put(&format!("/api/automations/{}", id), request)
            .await
    }

    /// DELETE /api/automations/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/automations/{}", id))
            .await
            .map(|_| ())
    }
}

/// Automations API (v2): dsl_filter queries plus business unit scoping
pub struct AutomationsV2Api<'a> {
    client: &'a Client,
}

impl<'a> AutomationsV2Api<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v2/automations/{id}
    pub async fn get(&self, id: &str) -> Result<AutomationV2, ApiError> {
        self.client
            .get(&format!("/api/v2/automations/{}", id))
            .await
    }

    /// POST /api/v2/automations
    pub async fn create(&self, request: &AutomationV2) -> Result<AutomationV2, ApiError> {
        self.client.post("/api/v2/automations", request).await
    }

    /// PUT /api/v2/automations/{id}
    pub async fn update(&self, id: &str, request: &AutomationV2) -> Result<AutomationV2, ApiError> {
        self.client
            .put(&format!("/api/v2/automations/{}", id), request)
            .await
    }

    /// DELETE /api/v2/automations/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/v2/automations/{}", id))
            .await
            .map(|_| ())
    }
}
