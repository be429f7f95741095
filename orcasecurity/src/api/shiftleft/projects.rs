//! Shift Left project API implementation

use serde::{Deserialize, Serialize};

use crate::api::client::Client;
use crate::api::common::ApiQueryParams;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftLeftProject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub default_policies: bool,
}

pub struct ProjectsApi<'a> {
    client: &'a Client,
}

impl<'a> ProjectsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/shiftleft/projects
    ///
    /// `search` narrows results server side; matching on the exact key is
    /// still the caller's job.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<ShiftLeftProject>, ApiError> {
        let params = ApiQueryParams::new().add_optional("search", search);
        if params.is_empty() {
            self.client.get("/api/shiftleft/projects").await
        } else {
            self.client
                .get_with_params("/api/shiftleft/projects", &params)
                .await
        }
    }

    /// GET /api/shiftleft/projects/{id}
    pub async fn get(&self, id: &str) -> Result<ShiftLeftProject, ApiError> {
        self.client
            .get(&format!("/api/shiftleft/projects/{}", id))
            .await
    }

    /// POST /api/shiftleft/projects
    pub async fn create(&self, request: &ShiftLeftProject) -> Result<ShiftLeftProject, ApiError> {
        self.client.post("/api/shiftleft/projects", request).await
    }

    /// PUT /api/shiftleft/projects/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &ShiftLeftProject,
    ) -> Result<ShiftLeftProject, ApiError> {
        self.client
            .put(&format!("/api/shiftleft/projects/{}", id), request)
            .await
    }

    /// DELETE /api/shiftleft/projects/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/shiftleft/projects/{}", id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn list_passes_search_as_query_parameter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/shiftleft/projects?search=backend")
            .with_status(200)
            .with_body(
                r#"{"status":"success","data":[
                    {"id":"slp-1","name":"Backend","key":"backend","default_policies":true}
                ]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token").unwrap();
        let projects = client
            .shiftleft()
            .projects()
            .list(Some("backend"))
            .await
            .unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].key, "backend");
        mock.assert_async().await;
    }
}
