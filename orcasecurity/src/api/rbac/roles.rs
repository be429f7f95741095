//! Custom role API implementation

use serde::{Deserialize, Serialize};

use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permission_groups: Vec<String>,
}

pub struct RolesApi<'a> {
    client: &'a Client,
}

impl<'a> RolesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/rbac/roles
    pub async fn list(&self) -> Result<Vec<CustomRole>, ApiError> {
        self.client.get("/api/rbac/roles").await
    }

    /// GET /api/rbac/roles/{id}
    pub async fn get(&self, id: &str) -> Result<CustomRole, ApiError> {
        self.client.get(&format!("/api/rbac/roles/{}", id)).await
    }

    /// POST /api/rbac/roles
    pub async fn create(&self, request: &CustomRole) -> Result<CustomRole, ApiError> {
        self.client.post("/api/rbac/roles", request).await
    }

    /// PUT /api/rbac/roles/{id}
    pub async fn update(&self, id: &str, request: &CustomRole) -> Result<CustomRole, ApiError> {
        self.client
            .put(&format!("/api/rbac/roles/{}", id), request)
            .await
    }

    /// DELETE /api/rbac/roles/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/rbac/roles/{}", id))
            .await
            .map(|_| ())
    }
}
