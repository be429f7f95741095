//! Business unit resource implementation

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

use crate::api::business_units::{
    BusinessUnit, BusinessUnitFilterData, BusinessUnitShiftLeftFilterData,
};
use crate::resources::{dynamic_string_list, single_block, string_list};

#[derive(Default)]
pub struct BusinessUnitResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl BusinessUnitResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_unit(&self, config: &DynamicValue) -> Result<BusinessUnit, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let filter_data = config
            .get_map(&AttributePath::new("filter_data"))
            .ok()
            .map(|_| BusinessUnitFilterData {
                cloud_providers: config
                    .get_list(&AttributePath::new("filter_data").attribute("cloud_providers"))
                    .ok()
                    .map(string_list),
                cloud_account_ids: config
                    .get_list(&AttributePath::new("filter_data").attribute("cloud_account_ids"))
                    .ok()
                    .map(string_list),
            });

        let shiftleft_filter_data = config
            .get_map(&AttributePath::new("shiftleft_filter_data"))
            .ok()
            .map(|_| BusinessUnitShiftLeftFilterData {
                shiftleft_project_ids: config
                    .get_list(
                        &AttributePath::new("shiftleft_filter_data")
                            .attribute("shiftleft_project_ids"),
                    )
                    .ok()
                    .map(string_list),
            });

        Ok(BusinessUnit {
            id: None,
            name,
            description,
            filter_data,
            shiftleft_filter_data,
        })
    }
}

#[async_trait]
impl Resource for BusinessUnitResource {
    fn type_name(&self) -> &str {
        "orcasecurity_business_unit"
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
            .description("Groups cloud accounts or shift left projects into a business unit")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Business unit ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Business unit name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Business unit description")
                    .optional()
                    .build(),
            )
            .block(single_block(
                "filter_data",
                vec![
                    AttributeBuilder::new(
                        "cloud_providers",
                        AttributeType::List(Box::new(AttributeType::String)),
                    )
                    .description("Cloud providers whose accounts belong to the unit")
                    .optional()
                    .build(),
                    AttributeBuilder::new(
                        "cloud_account_ids",
                        AttributeType::List(Box::new(AttributeType::String)),
                    )
                    .description("Specific cloud account IDs that belong to the unit")
                    .optional()
                    .build(),
                ],
            ))
            .block(single_block(
                "shiftleft_filter_data",
                vec![AttributeBuilder::new(
                    "shiftleft_project_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Shift left project IDs that belong to the unit")
                .optional()
                .build()],
            ))
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

        let has_cloud_filter = request
            .config
            .get_map(&AttributePath::new("filter_data"))
            .is_ok();
        let has_shiftleft_filter = request
            .config
            .get_map(&AttributePath::new("shiftleft_filter_data"))
            .is_ok();

        if !has_cloud_filter && !has_shiftleft_filter {
            diagnostics.push(Diagnostic::error(
                "Missing filter",
                "At least one of 'filter_data' or 'shiftleft_filter_data' must be set",
            ));
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

        let unit = match self.extract_unit(&request.config) {
            Ok(unit) => unit,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.business_units().create(&unit).await {
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
                    "Failed to create business unit",
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

        match provider_data.client.business_units().get(&id).await {
            Ok(unit) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), unit.name);
                if let Some(description) = unit.description {
                    let _ = new_state.set_string(&AttributePath::new("description"), description);
                }
                if let Some(filter) = unit.filter_data {
                    if let Some(providers) = filter.cloud_providers {
                        let _ = new_state.set_list(
                            &AttributePath::new("filter_data").attribute("cloud_providers"),
                            dynamic_string_list(providers),
                        );
                    }
                    if let Some(account_ids) = filter.cloud_account_ids {
                        let _ = new_state.set_list(
                            &AttributePath::new("filter_data").attribute("cloud_account_ids"),
                            dynamic_string_list(account_ids),
                        );
                    }
                }
                if let Some(filter) = unit.shiftleft_filter_data {
                    if let Some(project_ids) = filter.shiftleft_project_ids {
                        let _ = new_state.set_list(
                            &AttributePath::new("shiftleft_filter_data")
                                .attribute("shiftleft_project_ids"),
                            dynamic_string_list(project_ids),
                        );
                    }
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
                    "Failed to read business unit",
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
                    "Missing business unit ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_unit(&request.config) {
            Ok(unit) => match provider_data
                .client
                .business_units()
                .update(&id, &unit)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update business unit",
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

        match provider_data.client.business_units().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete business unit",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for BusinessUnitResource {
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
impl ResourceWithConfigure for BusinessUnitResource {
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

    fn unit_config() -> DynamicValue {
        let mut filter = HashMap::new();
        filter.insert(
            "cloud_providers".to_string(),
            Dynamic::List(vec![Dynamic::String("aws".to_string())]),
        );

        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("payments".to_string()));
        obj.insert("filter_data".to_string(), Dynamic::Map(filter));
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn validate_requires_a_filter_block() {
        let resource = BusinessUnitResource::new();
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("payments".to_string()));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_business_unit".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Missing filter"));
    }

    #[tokio::test]
    async fn validate_accepts_shiftleft_only_filter() {
        let resource = BusinessUnitResource::new();
        let mut filter = HashMap::new();
        filter.insert(
            "shiftleft_project_ids".to_string(),
            Dynamic::List(vec![Dynamic::String("p-1".to_string())]),
        );
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("payments".to_string()));
        obj.insert("shiftleft_filter_data".to_string(), Dynamic::Map(filter));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_business_unit".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn create_sends_filter_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/business_units")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "payments",
                "filter_data": {"cloud_providers": ["aws"]},
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "bu-1",
                    "name": "payments",
                    "filter_data": {"cloud_providers": ["aws"]}
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = BusinessUnitResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_business_unit".to_string(),
                    planned_state: unit_config(),
                    config: unit_config(),
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
            "bu-1"
        );
    }

    #[tokio::test]
    async fn read_refreshes_filter_lists() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/business_units/bu-1")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "bu-1",
                    "name": "payments",
                    "filter_data": {"cloud_providers": ["aws", "gcp"]}
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = BusinessUnitResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = unit_config();
        state
            .set_string(&AttributePath::new("id"), "bu-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_business_unit".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let new_state = response.new_state.unwrap();
        let providers = new_state
            .get_list(&AttributePath::new("filter_data").attribute("cloud_providers"))
            .unwrap();
        assert_eq!(providers.len(), 2);
    }
}
