pub mod jira;

use crate::api::Client;

/// Third-party integration API
pub struct IntegrationsApi<'a> {
    client: &'a Client,
}

impl<'a> IntegrationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Jira integration operations
    pub fn jira(&self) -> jira::JiraApi<'a> {
        jira::JiraApi::new(self.client)
    }
}
