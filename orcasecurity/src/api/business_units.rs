//! Business unit API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnitFilterData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_providers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnitShiftLeftFilterData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shiftleft_project_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_data: Option<BusinessUnitFilterData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shiftleft_filter_data: Option<BusinessUnitShiftLeftFilterData>,
}

pub struct BusinessUnitsApi<'a> {
    client: &'a Client,
}

impl<'a> BusinessUnitsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/business_units/{id}
    pub async fn get(&self, id: &str) -> Result<BusinessUnit, ApiError> {
        self.client
            .get(&format!("/api/business_units/{}", id))
            .await
    }

    /// POST /api/business_units
    pub async fn create(&self, request: &BusinessUnit) -> Result<BusinessUnit, ApiError> {
        self.client.post("/api/business_units", request).await
    }

    /// PUT /api/business_units/{id}
    pub async fn update(&self, id: &str, request: &BusinessUnit) -> Result<BusinessUnit, ApiError> {
        self.client
            .put(&format!("/api/business_units/{}", id), request)
            .await
    }

    /// DELETE /api/business_units/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/business_units/{}", id))
            .await
            .map(|_| ())
    }
}
