//! User API implementation

use serde::Deserialize;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    users: Vec<User>,
}

pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/users
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let response: UserListResponse = self.client.get("/api/users").await?;
        Ok(response.users)
    }
}
