//! Group permission API implementation
//!
//! A permission entry binds a group to a role, scoped either to the whole
//! organization (`all_cloud_accounts`) or to explicit cloud accounts and
//! business units.

use serde::{Deserialize, Serialize};

use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPermission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub group_id: String,
    pub role_id: String,
    #[serde(default)]
    pub all_cloud_accounts: bool,
    #[serde(default)]
    pub cloud_account_ids: Vec<String>,
    #[serde(default)]
    pub business_unit_ids: Vec<String>,
}

pub struct PermissionsApi<'a> {
    client: &'a Client,
}

impl<'a> PermissionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/rbac/permissions/{id}
    pub async fn get(&self, id: &str) -> Result<GroupPermission, ApiError> {
        self.client
            .get(&format!("/api/rbac/permissions/{}", id))
            .await
    }

    /// POST /api/rbac/permissions
    pub async fn create(&self, request: &GroupPermission) -> Result<GroupPermission, ApiError> {
        self.client.post("/api/rbac/permissions", request).await
    }

    /// PUT /api/rbac/permissions/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &GroupPermission,
    ) -> Result<GroupPermission, ApiError> {
        self.client
            .put(&format!("/api/rbac/permissions/{}", id), request)
            .await
    }

    /// DELETE /api/rbac/permissions/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/rbac/permissions/{}", id))
            .await
            .map(|_| ())
    }
}
