//! Automation resource implementation (v2 API)
//!
//! v2 scopes automations to business units and individual actions to the
//! organization level.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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

use super::actions::{action_blocks, generate_actions, set_action_state};
use crate::api::automations::AutomationV2;
use crate::resources::{dynamic_string_list, string_list};

#[derive(Default)]
pub struct AutomationV2Resource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl AutomationV2Resource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_automation(&self, config: &DynamicValue) -> Result<AutomationV2, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let raw_query = config
            .get_string(&AttributePath::new("query"))
            .map_err(|_| Diagnostic::error("Missing query", "The 'query' attribute is required"))?;
        let dsl_filter = serde_json::from_str(&raw_query).map_err(|e| {
            Diagnostic::error("Invalid query", format!("'query' must be valid JSON: {}", e))
        })?;

        let enabled = config
            .get_bool(&AttributePath::new("enabled"))
            .unwrap_or(true);

        let business_units = config
            .get_list(&AttributePath::new("business_unit_ids"))
            .ok()
            .map(string_list)
            .unwrap_or_default();

        let actions = generate_actions(config, true)?;

        Ok(AutomationV2 {
            id: None,
            name,
            description,
            dsl_filter,
            enabled,
            actions,
            business_units,
        })
    }
}

#[async_trait]
impl Resource for AutomationV2Resource {
    fn type_name(&self) -> &str {
        "orcasecurity_automation_v2"
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
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a v2 automation with business unit scoping")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Automation ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Automation name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Automation description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("query", AttributeType::String)
                    .description("JSON-encoded alert filter the automation triggers on")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .description("Whether the automation fires")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "business_unit_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Business units the automation is scoped to; empty means all")
                .optional()
                .build(),
            );

        for block in action_blocks(true) {
            builder = builder.block(block);
        }

        ResourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(raw) = request.config.get_string(&AttributePath::new("query")) {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
                diagnostics.push(Diagnostic::error(
                    "Invalid query",
                    format!("'query' must be valid JSON: {}", e),
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

        let automation = match self.extract_automation(&request.config) {
            Ok(automation) => automation,
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
            .automations_v2()
            .create(&automation)
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
                    "Failed to create automation",
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

        match provider_data.client.automations_v2().get(&id).await {
            Ok(automation) => {
                // Rebuilt from the response so blocks whose actions were
                // removed remotely drop out of state
                let mut new_state = DynamicValue::null();
                let _ = new_state.set_string(&AttributePath::new("id"), id);
                let _ = new_state.set_string(&AttributePath::new("name"), automation.name);
                if let Some(description) = automation.description {
                    let _ =
                        new_state.set_string(&AttributePath::new("description"), description);
                }
                let _ = new_state.set_string(
                    &AttributePath::new("query"),
                    automation.dsl_filter.to_string(),
                );
                let _ = new_state.set_bool(&AttributePath::new("enabled"), automation.enabled);
                if !automation.business_units.is_empty() {
                    let _ = new_state.set_list(
                        &AttributePath::new("business_unit_ids"),
                        dynamic_string_list(automation.business_units),
                    );
                }
                diagnostics.extend(set_action_state(&mut new_state, automation.actions, true));

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
                    "Failed to read automation",
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
                    "Missing automation ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_automation(&request.config) {
            Ok(automation) => match provider_data
                .client
                .automations_v2()
                .update(&id, &automation)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update automation",
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

        match provider_data.client.automations_v2().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete automation",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for AutomationV2Resource {
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
impl ResourceWithConfigure for AutomationV2Resource {
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
