//! User data source implementation
//!
//! The API has no per-user lookup endpoint, so the data source lists all
//! users and matches on email.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

#[derive(Default)]
pub struct UserDataSource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl UserDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &str {
        "orcasecurity_user"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up an organization user by email")
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .description("Email address of the user to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("User ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("first_name", AttributeType::String)
                    .description("User first name")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("last_name", AttributeType::String)
                    .description("User last name")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let email = match request.config.get_string(&AttributePath::new("email")) {
            Ok(email) => email,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing email",
                    "The 'email' attribute is required",
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data.client.users().list().await {
            Ok(users) => match users.into_iter().find(|user| user.email == email) {
                Some(user) => {
                    let mut state = DynamicValue::null();
                    let _ = state.set_string(&AttributePath::new("email"), user.email);
                    let _ = state.set_string(&AttributePath::new("id"), user.id);
                    let _ = state.set_string(&AttributePath::new("first_name"), user.first_name);
                    let _ = state.set_string(&AttributePath::new("last_name"), user.last_name);

                    ReadDataSourceResponse {
                        state,
                        diagnostics,
                        deferred: None,
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        "User not found",
                        format!("No user with email '{}' exists in the organization", email),
                    ));
                    ReadDataSourceResponse {
                        state: DynamicValue::null(),
                        diagnostics,
                        deferred: None,
                    }
                }
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to list users",
                    format!("API error: {}", e),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<crate::OrcaProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract OrcaProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::Server;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{ClientCapabilities, Dynamic};

    fn provider_data_for(url: &str) -> crate::OrcaProviderData {
        let client = Client::new(url, "test-token").unwrap();
        crate::OrcaProviderData {
            client: Arc::new(client),
        }
    }

    fn lookup_config(email: &str) -> DynamicValue {
        let mut obj = HashMap::new();
        obj.insert("email".to_string(), Dynamic::String(email.to_string()));
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn read_finds_user_by_email() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {"users": [
                    {"id": "u-1", "email": "alice@example.com", "first_name": "Alice", "last_name": "Reyes"},
                    {"id": "u-2", "email": "bob@example.com", "first_name": "Bob", "last_name": "Tran"}
                ]}}"#,
            )
            .create_async()
            .await;

        let mut data_source = UserDataSource::new();
        data_source.provider_data = Some(provider_data_for(&server.url()));

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "orcasecurity_user".to_string(),
                    config: lookup_config("bob@example.com"),
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "u-2"
        );
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("first_name"))
                .unwrap(),
            "Bob"
        );
    }

    #[tokio::test]
    async fn read_errors_when_no_user_matches() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_body(r#"{"status": "success", "data": {"users": []}}"#)
            .create_async()
            .await;

        let mut data_source = UserDataSource::new();
        data_source.provider_data = Some(provider_data_for(&server.url()));

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "orcasecurity_user".to_string(),
                    config: lookup_config("ghost@example.com"),
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("User not found"));
        assert!(response.diagnostics[0]
            .detail
            .contains("ghost@example.com"));
    }
}
