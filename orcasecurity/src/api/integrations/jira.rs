//! Jira integration API implementation
//!
//! The templates endpoint 404s when no Jira integration is configured for
//! the organization; callers should translate that into a useful message.

use serde::Deserialize;

use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct JiraTemplate {
    pub id: String,
    pub template_name: String,
    pub template_type: String,
    pub project_key: String,
}

pub struct JiraApi<'a> {
    client: &'a Client,
}

impl<'a> JiraApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/integrations/jira/templates
    pub async fn list_templates(&self) -> Result<Vec<JiraTemplate>, ApiError> {
        self.client.get("/api/integrations/jira/templates").await
    }
}
