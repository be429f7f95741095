pub mod groups;
pub mod permissions;
pub mod roles;

use crate::api::Client;

/// RBAC API providing role, group, and permission operations
pub struct RbacApi<'a> {
    client: &'a Client,
}

impl<'a> RbacApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Custom role operations
    pub fn roles(&self) -> roles::RolesApi<'a> {
        roles::RolesApi::new(self.client)
    }

    /// Group operations
    pub fn groups(&self) -> groups::GroupsApi<'a> {
        groups::GroupsApi::new(self.client)
    }

    /// Group permission operations
    pub fn permissions(&self) -> permissions::PermissionsApi<'a> {
        permissions::PermissionsApi::new(self.client)
    }
}
