//! Group API implementation

use serde::{Deserialize, Serialize};

use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sso_group: bool,
    #[serde(default)]
    pub users: Vec<String>,
}

pub struct GroupsApi<'a> {
    client: &'a Client,
}

impl<'a> GroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/rbac/groups
    pub async fn list(&self) -> Result<Vec<Group>, ApiError> {
        self.client.get("/api/rbac/groups").await
    }

    /// GET /api/rbac/groups/{id}
    pub async fn get(&self, id: &str) -> Result<Group, ApiError> {
        self.client.get(&format!("/api/rbac/groups/{}", id)).await
    }

    /// POST /api/rbac/groups
    pub async fn create(&self, request: &Group) -> Result<Group, ApiError> {
        self.client.post("/api/rbac/groups", request).await
    }

    /// PUT /api/rbac/groups/{id}
    pub async fn update(&self, id: &str, request: &Group) -> Result<Group, ApiError> {
        self.client
            .put(&format!("/api/rbac/groups/{}", id), request)
            .await
    }

    /// DELETE /api/rbac/groups/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/api/rbac/groups/{}", id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn list_parses_group_collection() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/rbac/groups")
            .with_status(200)
            .with_body(
                r#"{"status":"success","data":[
                    {"id":"grp-1","name":"platform","sso_group":false,"users":["u-1"]},
                    {"id":"grp-2","name":"sso-eng","sso_group":true}
                ]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token").unwrap();
        let groups = client.rbac().groups().list().await.unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].users, vec!["u-1"]);
        assert!(groups[1].sso_group);
        assert!(groups[1].users.is_empty());
    }
}
