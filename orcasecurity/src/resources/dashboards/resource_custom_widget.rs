//! Custom widget resource implementation
//!
//! Widget editor settings travel as a JSON string in configuration and as a
//! parsed object on the wire.

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

use crate::api::widgets::{CustomWidget, WidgetExtraParams, WIDGET_TYPES};
use crate::resources::single_block;

#[derive(Default)]
pub struct CustomWidgetResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomWidgetResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_widget(&self, config: &DynamicValue) -> Result<CustomWidget, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let organization_level = config
            .get_bool(&AttributePath::new("organization_level"))
            .unwrap_or(false);

        if config.get_map(&AttributePath::new("extra_params")).is_err() {
            return Err(Diagnostic::error(
                "Missing extra_params",
                "The 'extra_params' block is required",
            ));
        }

        let params_path = AttributePath::new("extra_params");
        let title = config
            .get_string(&params_path.clone().attribute("title"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing widget title",
                    "The 'extra_params' block requires 'title'",
                )
            })?;
        let subtitle = config
            .get_string(&params_path.clone().attribute("subtitle"))
            .ok();
        let size = config
            .get_string(&params_path.clone().attribute("size"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing widget size",
                    "The 'extra_params' block requires 'size'",
                )
            })?;
        let widget_type = config
            .get_string(&params_path.clone().attribute("type"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing widget type",
                    "The 'extra_params' block requires 'type'",
                )
            })?;

        let settings = match config.get_string(&params_path.attribute("settings")) {
            Ok(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                Diagnostic::error(
                    "Invalid widget settings",
                    format!("'settings' must be valid JSON: {}", e),
                )
            })?),
            Err(_) => None,
        };

        Ok(CustomWidget {
            id: None,
            name,
            organization_level,
            extra_params: WidgetExtraParams {
                title,
                subtitle,
                size,
                widget_type,
                settings,
            },
        })
    }
}

#[async_trait]
impl Resource for CustomWidgetResource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_widget"
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
            .description("Manages a custom dashboard widget")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Widget ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Widget name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_level", AttributeType::Bool)
                    .description("Share the widget with the whole organization")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .block(single_block(
                "extra_params",
                vec![
                    AttributeBuilder::new("title", AttributeType::String)
                        .description("Title rendered above the widget")
                        .required()
                        .build(),
                    AttributeBuilder::new("subtitle", AttributeType::String)
                        .description("Subtitle rendered under the title")
                        .optional()
                        .build(),
                    AttributeBuilder::new("size", AttributeType::String)
                        .description("Default size on the dashboard grid")
                        .required()
                        .build(),
                    AttributeBuilder::new("type", AttributeType::String)
                        .description("Chart type (pie, donut, bar, line, table, counter or map)")
                        .required()
                        .build(),
                    AttributeBuilder::new("settings", AttributeType::String)
                        .description("JSON-encoded editor settings")
                        .optional()
                        .build(),
                ],
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

        let params_path = AttributePath::new("extra_params");
        if let Ok(widget_type) = request
            .config
            .get_string(&params_path.clone().attribute("type"))
        {
            if !WIDGET_TYPES.contains(&widget_type.as_str()) {
                diagnostics.push(Diagnostic::error(
                    "Invalid widget type",
                    format!("Widget type must be one of: {}", WIDGET_TYPES.join(", ")),
                ));
            }
        }

        if let Ok(raw) = request
            .config
            .get_string(&params_path.attribute("settings"))
        {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
                diagnostics.push(Diagnostic::error(
                    "Invalid widget settings",
                    format!("'settings' must be valid JSON: {}", e),
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

        let widget = match self.extract_widget(&request.config) {
            Ok(widget) => widget,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.widgets().create(&widget).await {
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
                    "Failed to create custom widget",
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

        match provider_data.client.widgets().get(&id).await {
            Ok(widget) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), widget.name);
                let _ = new_state.set_bool(
                    &AttributePath::new("organization_level"),
                    widget.organization_level,
                );
                let params_path = AttributePath::new("extra_params");
                let _ = new_state.set_string(
                    &params_path.clone().attribute("title"),
                    widget.extra_params.title,
                );
                if let Some(subtitle) = widget.extra_params.subtitle {
                    let _ =
                        new_state.set_string(&params_path.clone().attribute("subtitle"), subtitle);
                }
                let _ = new_state.set_string(
                    &params_path.clone().attribute("size"),
                    widget.extra_params.size,
                );
                let _ = new_state.set_string(
                    &params_path.clone().attribute("type"),
                    widget.extra_params.widget_type,
                );
                if let Some(settings) = widget.extra_params.settings {
                    let _ = new_state.set_string(
                        &params_path.attribute("settings"),
                        settings.to_string(),
                    );
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
                    "Failed to read custom widget",
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
                    "Missing custom widget ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_widget(&request.config) {
            Ok(widget) => match provider_data.client.widgets().update(&id, &widget).await {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update custom widget",
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

        match provider_data.client.widgets().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete custom widget",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for CustomWidgetResource {
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
impl ResourceWithConfigure for CustomWidgetResource {
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

    fn widget_config(widget_type: &str) -> DynamicValue {
        let mut params = HashMap::new();
        params.insert(
            "title".to_string(),
            Dynamic::String("Alerts by category".to_string()),
        );
        params.insert("size".to_string(), Dynamic::String("md".to_string()));
        params.insert(
            "type".to_string(),
            Dynamic::String(widget_type.to_string()),
        );
        params.insert(
            "settings".to_string(),
            Dynamic::String(r#"{"group_by": "category"}"#.to_string()),
        );

        let mut obj = HashMap::new();
        obj.insert(
            "name".to_string(),
            Dynamic::String("alerts-by-category".to_string()),
        );
        obj.insert("organization_level".to_string(), Dynamic::Bool(false));
        obj.insert("extra_params".to_string(), Dynamic::Map(params));
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn validate_rejects_unknown_widget_type() {
        let resource = CustomWidgetResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_custom_widget".to_string(),
                    config: widget_config("sparkline"),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Invalid widget type"));
    }

    #[tokio::test]
    async fn create_parses_settings_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/widgets")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "alerts-by-category",
                "extra_params": {
                    "title": "Alerts by category",
                    "size": "md",
                    "type": "donut",
                    "settings": {"group_by": "category"},
                },
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "widget-1",
                    "name": "alerts-by-category",
                    "organization_level": false,
                    "extra_params": {
                        "title": "Alerts by category",
                        "size": "md",
                        "type": "donut"
                    }
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = CustomWidgetResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_custom_widget".to_string(),
                    planned_state: widget_config("donut"),
                    config: widget_config("donut"),
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
            "widget-1"
        );
    }

    #[test]
    fn extract_rejects_bad_settings_json() {
        let resource = CustomWidgetResource::new();
        let mut params = HashMap::new();
        params.insert("title".to_string(), Dynamic::String("t".to_string()));
        params.insert("size".to_string(), Dynamic::String("sm".to_string()));
        params.insert("type".to_string(), Dynamic::String("pie".to_string()));
        params.insert(
            "settings".to_string(),
            Dynamic::String("{broken".to_string()),
        );

        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("w".to_string()));
        obj.insert("extra_params".to_string(), Dynamic::Map(params));

        let err = resource
            .extract_widget(&DynamicValue::new(Dynamic::Map(obj)))
            .unwrap_err();
        assert!(err.summary.contains("Invalid widget settings"));
    }
}
