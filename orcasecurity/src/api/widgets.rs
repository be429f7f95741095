//! Custom widget API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

/// Widget categories the dashboard editor accepts
pub const WIDGET_TYPES: &[&str] = &["pie", "donut", "bar", "line", "table", "counter", "map"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetExtraParams {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub size: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    /// Free-form editor settings; resources carry this as a JSON string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomWidget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub organization_level: bool,
    pub extra_params: WidgetExtraParams,
}

pub struct WidgetsApi<'a> {
    client: &'a Client,
}

impl<'a> WidgetsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/widgets/{id}
    pub async fn get(&self, id: &str) -> Result<CustomWidget, ApiError> {
        self.client.get(&format!("/api/widgets/{}", id)).await
    }

    /// POST /api/widgets
    pub async fn create(&self, request: &CustomWidget) -> Result<CustomWidget, ApiError> {
        self.client.post("/api/widgets", request).await
    }

    /// PUT /api/widgets/{id}
    pub async fn update(&self, id: &str, request: &CustomWidget) -> Result<CustomWidget, ApiError> {
        self.client
            .put(&format!("/api/widgets/{}", id), request)
            .await
    }

    /// DELETE /api/widgets/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/widgets/{}", id))
            .await
            .map(|_| ())
    }
}
