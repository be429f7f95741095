//! Custom sonar alert API implementation
//!
//! Sonar alerts run a Sonar query string (not JSON) against collected data.

use serde::{Deserialize, Serialize};

use super::alerts::{ComplianceFramework, RemediationText};
use super::client::Client;
use super::error::ApiError;

/// Categories the platform accepts for sonar and discovery alerts
pub const ALERT_CATEGORIES: &[&str] = &[
    "Access control",
    "Authentication",
    "Best practices",
    "Data at risk",
    "Data protection",
    "IAM misconfigurations",
    "Lateral movement",
    "Logging and monitoring",
    "Malicious activity",
    "Malware",
    "Neglected assets",
    "Network misconfigurations",
    "Source code vulnerabilities",
    "Suspicious activity",
    "System integrity",
    "Vendor services misconfigurations",
    "Vulnerabilities",
    "Workload misconfigurations",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomSonarAlert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rule: String,
    pub category: String,
    pub score: f64,
    pub allow_adjusting_severity: bool,
    pub context_score: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_text: Option<RemediationText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_frameworks: Option<Vec<ComplianceFramework>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

pub struct SonarApi<'a> {
    client: &'a Client,
}

impl<'a> SonarApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/sonar/rules/{id}
    pub async fn get(&self, id: &str) -> Result<CustomSonarAlert, ApiError> {
        self.client.get(&format!("/api/sonar/rules/{}", id)).await
    }

    /// POST /api/sonar/rules
    pub async fn create(&self, request: &CustomSonarAlert) -> Result<CustomSonarAlert, ApiError> {
        self.client.post("/api/sonar/rules", request).await
    }

    /// PUT /api/sonar/rules/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &CustomSonarAlert,
    ) -> Result<CustomSonarAlert, ApiError> {
        self.client
            .put(&format!("/api/sonar/rules/{}", id), request)
            .await
    }

    /// DELETE /api/sonar/rules/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/sonar/rules/{}", id))
            .await
            .map(|_| ())
    }
}
