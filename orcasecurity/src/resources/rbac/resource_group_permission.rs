//! Group permission resource implementation
//!
//! Binds a group to a role over a scope: every cloud account, an explicit
//! account list, or a business unit list. The API has no call to rebind a
//! permission to another group or role.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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

use crate::api::rbac::permissions::GroupPermission;
use crate::resources::{dynamic_string_list, string_list};

#[derive(Default)]
pub struct GroupPermissionResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl GroupPermissionResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_permission(&self, config: &DynamicValue) -> Result<GroupPermission, Diagnostic> {
        let group_id = config
            .get_string(&AttributePath::new("group_id"))
            .map_err(|_| {
                Diagnostic::error("Missing group_id", "The 'group_id' attribute is required")
            })?;

        let role_id = config
            .get_string(&AttributePath::new("role_id"))
            .map_err(|_| {
                Diagnostic::error("Missing role_id", "The 'role_id' attribute is required")
            })?;

        let all_cloud_accounts = config
            .get_bool(&AttributePath::new("all_cloud_accounts"))
            .unwrap_or(false);
        let cloud_account_ids = config
            .get_list(&AttributePath::new("cloud_account_ids"))
            .map(string_list)
            .unwrap_or_default();
        let business_unit_ids = config
            .get_list(&AttributePath::new("business_unit_ids"))
            .map(string_list)
            .unwrap_or_default();

        Ok(GroupPermission {
            id: None,
            group_id,
            role_id,
            all_cloud_accounts,
            cloud_account_ids,
            business_unit_ids,
        })
    }
}

#[async_trait]
impl Resource for GroupPermissionResource {
    fn type_name(&self) -> &str {
        "orcasecurity_group_permission"
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
            .description("Grants a role to a group over a set of cloud accounts or business units")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Permission ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_id", AttributeType::String)
                    .description("Group receiving the role")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_id", AttributeType::String)
                    .description("Role being granted")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("all_cloud_accounts", AttributeType::Bool)
                    .description("Grant over every cloud account instead of an explicit scope")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "cloud_account_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Cloud accounts in scope")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "business_unit_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Business units in scope")
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        let all_accounts = request
            .config
            .get_bool(&AttributePath::new("all_cloud_accounts"))
            .unwrap_or(false);

        if all_accounts {
            let has_accounts = request
                .config
                .get_list(&AttributePath::new("cloud_account_ids"))
                .map(|l| !l.is_empty())
                .unwrap_or(false);
            let has_units = request
                .config
                .get_list(&AttributePath::new("business_unit_ids"))
                .map(|l| !l.is_empty())
                .unwrap_or(false);

            if has_accounts || has_units {
                diagnostics.push(Diagnostic::error(
                    "Conflicting scope",
                    "'all_cloud_accounts' cannot be combined with 'cloud_account_ids' or 'business_unit_ids'",
                ));
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

        let permission = match self.extract_permission(&request.config) {
            Ok(permission) => permission,
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
            .rbac()
            .permissions()
            .create(&permission)
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
                    "Failed to create group permission",
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

        match provider_data.client.rbac().permissions().get(&id).await {
            Ok(permission) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("group_id"), permission.group_id);
                let _ = new_state.set_string(&AttributePath::new("role_id"), permission.role_id);
                let _ = new_state.set_bool(
                    &AttributePath::new("all_cloud_accounts"),
                    permission.all_cloud_accounts,
                );
                let _ = new_state.set_list(
                    &AttributePath::new("cloud_account_ids"),
                    dynamic_string_list(permission.cloud_account_ids),
                );
                let _ = new_state.set_list(
                    &AttributePath::new("business_unit_ids"),
                    dynamic_string_list(permission.business_unit_ids),
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
                    "Failed to read group permission",
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
                    "Missing group permission ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_permission(&request.config) {
            Ok(permission) => match provider_data
                .client
                .rbac()
                .permissions()
                .update(&id, &permission)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update group permission",
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

        match provider_data.client.rbac().permissions().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete group permission",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for GroupPermissionResource {
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
impl ResourceWithConfigure for GroupPermissionResource {
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

    fn permission_config() -> DynamicValue {
        let mut obj = HashMap::new();
        obj.insert("group_id".to_string(), Dynamic::String("grp-1".to_string()));
        obj.insert("role_id".to_string(), Dynamic::String("role-1".to_string()));
        obj.insert("all_cloud_accounts".to_string(), Dynamic::Bool(false));
        obj.insert(
            "cloud_account_ids".to_string(),
            Dynamic::List(vec![Dynamic::String("acc-1".to_string())]),
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
    async fn validate_rejects_scope_conflict() {
        let resource = GroupPermissionResource::new();
        let mut obj = HashMap::new();
        obj.insert("group_id".to_string(), Dynamic::String("grp-1".to_string()));
        obj.insert("role_id".to_string(), Dynamic::String("role-1".to_string()));
        obj.insert("all_cloud_accounts".to_string(), Dynamic::Bool(true));
        obj.insert(
            "cloud_account_ids".to_string(),
            Dynamic::List(vec![Dynamic::String("acc-1".to_string())]),
        );

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_group_permission".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Conflicting scope"));
    }

    #[tokio::test]
    async fn validate_allows_all_accounts_with_empty_lists() {
        let resource = GroupPermissionResource::new();
        let mut obj = HashMap::new();
        obj.insert("group_id".to_string(), Dynamic::String("grp-1".to_string()));
        obj.insert("role_id".to_string(), Dynamic::String("role-1".to_string()));
        obj.insert("all_cloud_accounts".to_string(), Dynamic::Bool(true));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_group_permission".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn create_posts_scope() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/rbac/permissions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "group_id": "grp-1",
                "role_id": "role-1",
                "all_cloud_accounts": false,
                "cloud_account_ids": ["acc-1"],
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "perm-1",
                    "group_id": "grp-1",
                    "role_id": "role-1",
                    "all_cloud_accounts": false,
                    "cloud_account_ids": ["acc-1"]
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = GroupPermissionResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_group_permission".to_string(),
                    planned_state: permission_config(),
                    config: permission_config(),
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
            "perm-1"
        );
    }

    #[tokio::test]
    async fn read_gone_permission_clears_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/rbac/permissions/perm-1")
            .with_status(404)
            .with_body(r#"{"detail": "not found"}"#)
            .create_async()
            .await;

        let mut resource = GroupPermissionResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = permission_config();
        state
            .set_string(&AttributePath::new("id"), "perm-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_group_permission".to_string(),
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
}
