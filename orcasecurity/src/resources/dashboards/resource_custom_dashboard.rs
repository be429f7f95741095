//! Custom dashboard resource implementation

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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::dashboards::{CustomDashboard, DashboardWidget};
use crate::resources::{list_block, map_string};

#[derive(Default)]
pub struct CustomDashboardResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomDashboardResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_dashboard(&self, config: &DynamicValue) -> Result<CustomDashboard, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let organization_level = config
            .get_bool(&AttributePath::new("organization_level"))
            .unwrap_or(false);

        let filter_data = config
            .get_map(&AttributePath::new("filter_data"))
            .map(|map| {
                map.into_iter()
                    .filter_map(|(key, value)| match value {
                        Dynamic::String(s) => Some((key, s)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let items = config
            .get_list(&AttributePath::new("widgets"))
            .map_err(|_| {
                Diagnostic::error("Missing widgets", "The 'widgets' block is required")
            })?;

        let mut widgets = Vec::with_capacity(items.len());
        for item in items {
            let map = match item {
                Dynamic::Map(map) => map,
                _ => continue,
            };
            match map_string(&map, "id").zip(map_string(&map, "size")) {
                Some((id, size)) => widgets.push(DashboardWidget { id, size }),
                None => {
                    return Err(Diagnostic::error(
                        "Invalid widget",
                        "Each 'widgets' block requires 'id' and 'size'",
                    ))
                }
            }
        }

        Ok(CustomDashboard {
            id: None,
            name,
            organization_level,
            filter_data,
            widgets,
        })
    }
}

#[async_trait]
impl Resource for CustomDashboardResource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_dashboard"
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
            .description("Manages a custom dashboard assembled from widgets")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Dashboard ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Dashboard name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_level", AttributeType::Bool)
                    .description("Share the dashboard with the whole organization")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "filter_data",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Filters applied to every widget on the dashboard")
                .optional()
                .build(),
            )
            .block(list_block(
                "widgets",
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .description("Widget ID, built-in or from a custom widget")
                        .required()
                        .build(),
                    AttributeBuilder::new("size", AttributeType::String)
                        .description("Widget size on the dashboard grid (sm, md or lg)")
                        .required()
                        .build(),
                ],
                1,
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

        match request.config.get_list(&AttributePath::new("widgets")) {
            Ok(widgets) if widgets.is_empty() => {
                diagnostics.push(Diagnostic::error(
                    "Empty widgets",
                    "A dashboard needs at least one 'widgets' block",
                ));
            }
            _ => {}
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

        let dashboard = match self.extract_dashboard(&request.config) {
            Ok(dashboard) => dashboard,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.dashboards().create(&dashboard).await {
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
                    "Failed to create custom dashboard",
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

        match provider_data.client.dashboards().get(&id).await {
            Ok(dashboard) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), dashboard.name);
                let _ = new_state.set_bool(
                    &AttributePath::new("organization_level"),
                    dashboard.organization_level,
                );
                if !dashboard.filter_data.is_empty() {
                    let filters = dashboard
                        .filter_data
                        .into_iter()
                        .map(|(key, value)| (key, Dynamic::String(value)))
                        .collect();
                    let _ = new_state.set_map(&AttributePath::new("filter_data"), filters);
                }
                let widgets = dashboard
                    .widgets
                    .into_iter()
                    .map(|widget| {
                        let mut map = std::collections::HashMap::new();
                        map.insert("id".to_string(), Dynamic::String(widget.id));
                        map.insert("size".to_string(), Dynamic::String(widget.size));
                        Dynamic::Map(map)
                    })
                    .collect();
                let _ = new_state.set_list(&AttributePath::new("widgets"), widgets);

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
                    "Failed to read custom dashboard",
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
                    "Missing custom dashboard ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_dashboard(&request.config) {
            Ok(dashboard) => match provider_data
                .client
                .dashboards()
                .update(&id, &dashboard)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update custom dashboard",
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

        match provider_data.client.dashboards().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete custom dashboard",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for CustomDashboardResource {
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
impl ResourceWithConfigure for CustomDashboardResource {
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
