pub mod cve_exceptions;
pub mod projects;

use crate::api::Client;

/// Shift Left API providing project and CVE exception operations
pub struct ShiftLeftApi<'a> {
    client: &'a Client,
}

impl<'a> ShiftLeftApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Shift Left project operations
    pub fn projects(&self) -> projects::ProjectsApi<'a> {
        projects::ProjectsApi::new(self.client)
    }

    /// CVE exception list operations
    pub fn cve_exceptions(&self) -> cve_exceptions::CveExceptionsApi<'a> {
        cve_exceptions::CveExceptionsApi::new(self.client)
    }
}
