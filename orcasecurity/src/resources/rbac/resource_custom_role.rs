//! Custom RBAC role resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
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
use tfplug::validator::ListLengthValidator;

use crate::api::rbac::roles::CustomRole;
use crate::resources::{dynamic_string_list, string_list};

#[derive(Default)]
pub struct CustomRoleResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomRoleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_role(&self, config: &DynamicValue) -> Result<CustomRole, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let permission_groups = config
            .get_list(&AttributePath::new("permission_groups"))
            .map(string_list)
            .map_err(|_| {
                Diagnostic::error(
                    "Missing permission_groups",
                    "The 'permission_groups' attribute is required",
                )
            })?;

        Ok(CustomRole {
            id: None,
            name,
            description,
            permission_groups,
        })
    }
}

#[async_trait]
impl Resource for CustomRoleResource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_role"
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
            .description("Manages a custom RBAC role built from permission groups")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Role ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Role name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Role description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "permission_groups",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Permission group identifiers granted by the role")
                .required()
                .validator(ListLengthValidator::min(1))
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(groups) = request
            .config
            .get_list(&AttributePath::new("permission_groups"))
        {
            if groups.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        "Empty permission_groups",
                        "A custom role must grant at least one permission group",
                    )
                    .with_attribute(AttributePath::new("permission_groups")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
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

        let role = match self.extract_role(&request.config) {
            Ok(role) => role,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.rbac().roles().create(&role).await {
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
                    "Failed to create custom role",
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

        match provider_data.client.rbac().roles().get(&id).await {
            Ok(role) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), role.name);
                if let Some(description) = role.description {
                    let _ = new_state.set_string(&AttributePath::new("description"), description);
                }
                let _ = new_state.set_list(
                    &AttributePath::new("permission_groups"),
                    dynamic_string_list(role.permission_groups),
                );

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
                    "Failed to read custom role",
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
                    "Missing custom role ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_role(&request.config) {
            Ok(role) => match provider_data.client.rbac().roles().update(&id, &role).await {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update custom role",
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

        match provider_data.client.rbac().roles().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete custom role",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for CustomRoleResource {
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
impl ResourceWithConfigure for CustomRoleResource {
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

    fn role_config() -> DynamicValue {
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("auditor".to_string()));
        obj.insert(
            "permission_groups".to_string(),
            Dynamic::List(vec![
                Dynamic::String("assets.read".to_string()),
                Dynamic::String("alerts.read".to_string()),
            ]),
        );
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn validate_rejects_empty_permission_groups() {
        let resource = CustomRoleResource::new();
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("auditor".to_string()));
        obj.insert("permission_groups".to_string(), Dynamic::List(vec![]));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_custom_role".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Empty permission_groups"));
    }

    #[tokio::test]
    async fn create_posts_role_and_stores_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/rbac/roles")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "auditor",
                "permission_groups": ["assets.read", "alerts.read"],
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "role-1",
                    "name": "auditor",
                    "permission_groups": ["assets.read", "alerts.read"]
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = CustomRoleResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_custom_role".to_string(),
                    planned_state: role_config(),
                    config: role_config(),
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
            "role-1"
        );
    }

    #[tokio::test]
    async fn read_refreshes_permission_groups() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/rbac/roles/role-1")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "role-1",
                    "name": "auditor",
                    "permission_groups": ["assets.read"]
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = CustomRoleResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = role_config();
        state
            .set_string(&AttributePath::new("id"), "role-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_custom_role".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let new_state = response.new_state.unwrap();
        let groups = new_state
            .get_list(&AttributePath::new("permission_groups"))
            .unwrap();
        assert_eq!(groups.len(), 1);
    }
}
