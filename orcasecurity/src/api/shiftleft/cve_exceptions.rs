//! Shift Left CVE exception list API implementation

use serde::{Deserialize, Serialize};

use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CveException {
    pub cve_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `YYYY-MM-DD`; absent means the exception never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_fix_available_filter: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CveExceptionList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub shift_left_project_ids: Vec<String>,
    pub cves: Vec<CveException>,
}

pub struct CveExceptionsApi<'a> {
    client: &'a Client,
}

impl<'a> CveExceptionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/shiftleft/cve_exceptions/{id}
    pub async fn get(&self, id: &str) -> Result<CveExceptionList, ApiError> {
        self.client
            .get(&format!("/api/shiftleft/cve_exceptions/{}", id))
            .await
    }

    /// POST /api/shiftleft/cve_exceptions
    pub async fn create(&self, request: &CveExceptionList) -> Result<CveExceptionList, ApiError> {
        self.client
            .post("/api/shiftleft/cve_exceptions", request)
            .await
    }

    /// PUT /api/shiftleft/cve_exceptions/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &CveExceptionList,
    ) -> Result<CveExceptionList, ApiError> {
        self.client
            .put(&format!("/api/shiftleft/cve_exceptions/{}", id), request)
            .await
    }

    /// DELETE /api/shiftleft/cve_exceptions/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/shiftleft/cve_exceptions/{}", id))
            .await
            .map(|_| ())
    }
}
