//! Trusted cloud account resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::OneOfValidator;

use crate::api::trusted_accounts::{TrustedCloudAccount, CLOUD_PROVIDERS};

#[derive(Default)]
pub struct TrustedCloudAccountResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl TrustedCloudAccountResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_account(&self, config: &DynamicValue) -> Result<TrustedCloudAccount, Diagnostic> {
        let cloud_provider = config
            .get_string(&AttributePath::new("cloud_provider"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing cloud_provider",
                    "The 'cloud_provider' attribute is required",
                )
            })?;

        let account_id = config
            .get_string(&AttributePath::new("account_id"))
            .map_err(|_| {
                Diagnostic::error("Missing account_id", "The 'account_id' attribute is required")
            })?;

        let account_name = config
            .get_string(&AttributePath::new("account_name"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing account_name",
                    "The 'account_name' attribute is required",
                )
            })?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        Ok(TrustedCloudAccount {
            id: None,
            cloud_provider,
            account_id,
            account_name,
            description,
        })
    }
}

#[async_trait]
impl Resource for TrustedCloudAccountResource {
    fn type_name(&self) -> &str {
        "orcasecurity_trusted_cloud_account"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Marks a third-party cloud account as trusted so cross-account access from it does not raise alerts")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Trusted account ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud_provider", AttributeType::String)
                    .description("Cloud provider the account lives in (aws, azure or gcp)")
                    .required()
                    .validator(OneOfValidator::create(CLOUD_PROVIDERS))
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("account_id", AttributeType::String)
                    .description("Provider-native account identifier")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("account_name", AttributeType::String)
                    .description("Display name for the trusted account")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Why the account is trusted")
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let account = match self.extract_account(&request.config) {
            Ok(account) => account,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data
            .client
            .trusted_accounts()
            .create(&account)
            .await
        {
            Ok(created) => {
                let mut new_state = request.planned_state;
                if let Some(id) = created.id {
                    let _ = new_state.set_string(&AttributePath::new("id"), id);
                }
                CreateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create trusted cloud account",
                    format!("API error: {}", e),
                ));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let id = match request.current_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
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
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

        match provider_data.client.trusted_accounts().get(&id).await {
            Ok(account) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(
                    &AttributePath::new("cloud_provider"),
                    account.cloud_provider,
                );
                let _ = new_state.set_string(&AttributePath::new("account_id"), account.account_id);
                let _ =
                    new_state.set_string(&AttributePath::new("account_name"), account.account_name);
                if let Some(description) = account.description {
                    let _ = new_state.set_string(&AttributePath::new("description"), description);
                }

                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read trusted cloud account",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing trusted cloud account ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_account(&request.config) {
            Ok(account) => match provider_data
                .client
                .trusted_accounts()
                .update(&id, &account)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update trusted cloud account",
                        format!("API error: {}", e),
                    ));
                    UpdateResourceResponse {
                        new_state: request.prior_state,
                        private: vec![],
                        diagnostics,
                    }
                }
            },
            Err(diag) => {
                diagnostics.push(diag);
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data.client.trusted_accounts().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete trusted cloud account",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for TrustedCloudAccountResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for TrustedCloudAccountResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
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
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{ClientCapabilities, Dynamic};

    fn provider_data_for(url: &str) -> crate::OrcaProviderData {
        let client = Client::new(url, "test-token").unwrap();
        crate::OrcaProviderData {
            client: Arc::new(client),
        }
    }

    fn account_config() -> DynamicValue {
        let mut obj = HashMap::new();
        obj.insert(
            "cloud_provider".to_string(),
            Dynamic::String("aws".to_string()),
        );
        obj.insert(
            "account_id".to_string(),
            Dynamic::String("123456789012".to_string()),
        );
        obj.insert(
            "account_name".to_string(),
            Dynamic::String("shared-tooling".to_string()),
        );
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[test]
    fn type_name_matches_registry_key() {
        let resource = TrustedCloudAccountResource::new();
        assert_eq!(resource.type_name(), "orcasecurity_trusted_cloud_account");
    }

    #[tokio::test]
    async fn schema_marks_replacement_attributes() {
        let resource = TrustedCloudAccountResource::new();
        let response = resource.schema(Context::new(), ResourceSchemaRequest {}).await;

        assert!(response.diagnostics.is_empty());
        let attrs = &response.schema.block.attributes;
        assert!(attrs.iter().any(|a| a.name == "id" && a.computed));
        assert!(attrs.iter().any(|a| a.name == "cloud_provider" && a.required));
        assert!(attrs.iter().any(|a| a.name == "account_id" && a.required));
        let provider = attrs
            .iter()
            .find(|a| a.name == "cloud_provider")
            .unwrap();
        assert_eq!(provider.plan_modifiers.len(), 1);
        assert_eq!(provider.validators.len(), 1);
    }

    #[tokio::test]
    async fn create_posts_account_and_stores_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/trusted_cloud_accounts")
            .match_header("authorization", "Token test-token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "cloud_provider": "aws",
                "account_id": "123456789012",
                "account_name": "shared-tooling",
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "ta-1",
                    "cloud_provider": "aws",
                    "account_id": "123456789012",
                    "account_name": "shared-tooling"
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = TrustedCloudAccountResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    planned_state: account_config(),
                    config: account_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        mock.assert_async().await;
        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "ta-1"
        );
    }

    #[tokio::test]
    async fn create_without_provider_data_fails() {
        let resource = TrustedCloudAccountResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    planned_state: account_config(),
                    config: account_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Provider not configured"));
    }

    #[tokio::test]
    async fn read_refreshes_state_from_api() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/trusted_cloud_accounts/ta-1")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "ta-1",
                    "cloud_provider": "aws",
                    "account_id": "123456789012",
                    "account_name": "renamed-elsewhere",
                    "description": "managed by the platform team"
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = TrustedCloudAccountResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = account_config();
        state
            .set_string(&AttributePath::new("id"), "ta-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let new_state = response.new_state.unwrap();
        assert_eq!(
            new_state
                .get_string(&AttributePath::new("account_name"))
                .unwrap(),
            "renamed-elsewhere"
        );
        assert_eq!(
            new_state
                .get_string(&AttributePath::new("description"))
                .unwrap(),
            "managed by the platform team"
        );
    }

    #[tokio::test]
    async fn read_gone_account_clears_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/trusted_cloud_accounts/ta-1")
            .with_status(404)
            .with_body(r#"{"error": "trusted account not found"}"#)
            .create_async()
            .await;

        let mut resource = TrustedCloudAccountResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = account_config();
        state
            .set_string(&AttributePath::new("id"), "ta-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_account() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/api/trusted_cloud_accounts/ta-1")
            .with_status(404)
            .with_body(r#"{"error": "trusted account not found"}"#)
            .create_async()
            .await;

        let mut resource = TrustedCloudAccountResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = account_config();
        state
            .set_string(&AttributePath::new("id"), "ta-1".to_string())
            .unwrap();

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    prior_state: state,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_copies_id_into_state() {
        let resource = TrustedCloudAccountResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "orcasecurity_trusted_cloud_account".to_string(),
                    id: "ta-42".to_string(),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "ta-42"
        );
    }
}
