//! Custom dashboard API implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardWidget {
    pub id: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomDashboard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub organization_level: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub filter_data: HashMap<String, String>,
    pub widgets: Vec<DashboardWidget>,
}

pub struct DashboardsApi<'a> {
    client: &'a Client,
}

impl<'a> DashboardsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/dashboards/{id}
    pub async fn get(&self, id: &str) -> Result<CustomDashboard, ApiError> {
        self.client.get(&format!("/api/dashboards/{}", id)).await
    }

    /// POST /api/dashboards
    pub async fn create(&self, request: &CustomDashboard) -> Result<CustomDashboard, ApiError> {
        self.client.post("/api/dashboards", request).await
    }

    /// PUT /api/dashboards/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &CustomDashboard,
    ) -> Result<CustomDashboard, ApiError> {
        self.client
            .put(&format!("/api/dashboards/{}", id), request)
            .await
    }

    /// DELETE /api/dashboards/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/dashboards/{}", id))
            .await
            .map(|_| ())
    }
}
