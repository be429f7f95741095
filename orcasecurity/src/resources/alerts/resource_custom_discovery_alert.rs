//! Custom discovery alert resource implementation

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
use tfplug::validator::NumberRangeValidator;

use crate::api::alerts::{ComplianceFramework, CustomDiscoveryAlert, RemediationText};
use crate::resources::{list_block, map_string, single_block};

#[derive(Default)]
pub struct CustomDiscoveryAlertResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomDiscoveryAlertResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_alert(&self, config: &DynamicValue) -> Result<CustomDiscoveryAlert, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let raw_query = config
            .get_string(&AttributePath::new("query"))
            .map_err(|_| Diagnostic::error("Missing query", "The 'query' attribute is required"))?;
        let query: serde_json::Value = serde_json::from_str(&raw_query).map_err(|e| {
            Diagnostic::error("Invalid query", format!("'query' must be valid JSON: {}", e))
                .with_attribute(AttributePath::new("query"))
        })?;

        let category = config
            .get_string(&AttributePath::new("category"))
            .map_err(|_| {
                Diagnostic::error("Missing category", "The 'category' attribute is required")
            })?;

        let score = config
            .get_number(&AttributePath::new("score"))
            .unwrap_or(5.0);
        let allow_adjusting_severity = config
            .get_bool(&AttributePath::new("allow_adjusting_severity"))
            .unwrap_or(true);

        let remediation_text = extract_remediation_text(config)?;
        let compliance_frameworks = extract_compliance_frameworks(config)?;

        Ok(CustomDiscoveryAlert {
            id: None,
            name,
            description,
            query,
            category,
            score,
            allow_adjusting_severity,
            remediation_text,
            compliance_frameworks,
            organization_id: None,
        })
    }
}

pub(crate) fn extract_remediation_text(
    config: &DynamicValue,
) -> Result<Option<RemediationText>, Diagnostic> {
    if config
        .get_map(&AttributePath::new("remediation_text"))
        .is_err()
    {
        return Ok(None);
    }

    let enable = config
        .get_bool(&AttributePath::new("remediation_text").attribute("enable"))
        .unwrap_or(true);
    let text = config
        .get_string(&AttributePath::new("remediation_text").attribute("text"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing remediation text",
                "The 'remediation_text' block requires 'text'",
            )
        })?;

    Ok(Some(RemediationText { enable, text }))
}

pub(crate) fn extract_compliance_frameworks(
    config: &DynamicValue,
) -> Result<Option<Vec<ComplianceFramework>>, Diagnostic> {
    let items = match config.get_list(&AttributePath::new("compliance_frameworks")) {
        Ok(items) if !items.is_empty() => items,
        _ => return Ok(None),
    };

    let mut frameworks = Vec::with_capacity(items.len());
    for item in items {
        let map = match item {
            Dynamic::Map(map) => map,
            _ => continue,
        };
        let entry = map_string(&map, "name")
            .zip(map_string(&map, "section"))
            .zip(map_string(&map, "priority"));
        match entry {
            Some(((name, section), priority)) => frameworks.push(ComplianceFramework {
                name,
                section,
                priority,
            }),
            None => {
                return Err(Diagnostic::error(
                    "Invalid compliance framework",
                    "Each 'compliance_frameworks' block requires 'name', 'section' and 'priority'",
                ))
            }
        }
    }

    Ok(Some(frameworks))
}

pub(crate) fn remediation_text_block() -> tfplug::schema::NestedBlock {
    single_block(
        "remediation_text",
        vec![
            AttributeBuilder::new("enable", AttributeType::Bool)
                .description("Show the remediation text on matching alerts")
                .required()
                .build(),
            AttributeBuilder::new("text", AttributeType::String)
                .description("Remediation instructions shown to analysts")
                .required()
                .build(),
        ],
    )
}

pub(crate) fn compliance_frameworks_block() -> tfplug::schema::NestedBlock {
    list_block(
        "compliance_frameworks",
        vec![
            AttributeBuilder::new("name", AttributeType::String)
                .description("Framework name")
                .required()
                .build(),
            AttributeBuilder::new("section", AttributeType::String)
                .description("Framework section the rule maps to")
                .required()
                .build(),
            AttributeBuilder::new("priority", AttributeType::String)
                .description("Priority within the framework")
                .required()
                .build(),
        ],
        0,
    )
}

/// Writes the framework list back into state after a refresh
pub(crate) fn set_compliance_frameworks_state(
    state: &mut DynamicValue,
    frameworks: Vec<ComplianceFramework>,
) {
    let items = frameworks
        .into_iter()
        .map(|framework| {
            let mut map = std::collections::HashMap::new();
            map.insert("name".to_string(), Dynamic::String(framework.name));
            map.insert("section".to_string(), Dynamic::String(framework.section));
            map.insert("priority".to_string(), Dynamic::String(framework.priority));
            Dynamic::Map(map)
        })
        .collect();
    let _ = state.set_list(&AttributePath::new("compliance_frameworks"), items);
}

pub(crate) fn set_remediation_text_state(state: &mut DynamicValue, remediation: RemediationText) {
    let _ = state.set_bool(
        &AttributePath::new("remediation_text").attribute("enable"),
        remediation.enable,
    );
    let _ = state.set_string(
        &AttributePath::new("remediation_text").attribute("text"),
        remediation.text,
    );
}

#[async_trait]
impl Resource for CustomDiscoveryAlertResource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_discovery_alert"
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
            .description("Manages a custom alert rule over asset discovery data")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Alert rule ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Rule name, shown as the alert title")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("What the rule detects")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("query", AttributeType::String)
                    .description("JSON-encoded discovery filter the rule matches against")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category", AttributeType::String)
                    .description("Alert category")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("score", AttributeType::Number)
                    .description("Base severity score, 0 to 10")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(5.0))
                    .validator(NumberRangeValidator::between(0.0, 10.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("allow_adjusting_severity", AttributeType::Bool)
                    .description("Let the platform adjust severity based on context")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_id", AttributeType::String)
                    .description("Organization the rule belongs to")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .block(remediation_text_block())
            .block(compliance_frameworks_block())
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

        if let Ok(raw) = request.config.get_string(&AttributePath::new("query")) {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
                diagnostics.push(
                    Diagnostic::error("Invalid query", format!("'query' must be valid JSON: {}", e))
                        .with_attribute(AttributePath::new("query")),
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

        let alert = match self.extract_alert(&request.config) {
            Ok(alert) => alert,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match provider_data.client.alerts().create(&alert).await {
            Ok(created) => {
                let mut new_state = request.planned_state;
                if let Some(id) = created.id {
                    let _ = new_state.set_string(&AttributePath::new("id"), id);
                }
                if let Some(organization_id) = created.organization_id {
                    let _ = new_state
                        .set_string(&AttributePath::new("organization_id"), organization_id);
                }
                CreateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create custom discovery alert",
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

        match provider_data.client.alerts().get(&id).await {
            Ok(alert) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), alert.name);
                if let Some(description) = alert.description {
                    let _ = new_state.set_string(&AttributePath::new("description"), description);
                }
                let _ = new_state.set_string(&AttributePath::new("query"), alert.query.to_string());
                let _ = new_state.set_string(&AttributePath::new("category"), alert.category);
                let _ = new_state.set_number(&AttributePath::new("score"), alert.score);
                let _ = new_state.set_bool(
                    &AttributePath::new("allow_adjusting_severity"),
                    alert.allow_adjusting_severity,
                );
                if let Some(organization_id) = alert.organization_id {
                    let _ = new_state
                        .set_string(&AttributePath::new("organization_id"), organization_id);
                }
                if let Some(remediation) = alert.remediation_text {
                    set_remediation_text_state(&mut new_state, remediation);
                }
                if let Some(frameworks) = alert.compliance_frameworks {
                    set_compliance_frameworks_state(&mut new_state, frameworks);
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
                    "Failed to read custom discovery alert",
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
                    "Missing custom discovery alert ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_alert(&request.config) {
            Ok(alert) => match provider_data.client.alerts().update(&id, &alert).await {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update custom discovery alert",
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

        match provider_data.client.alerts().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete custom discovery alert",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for CustomDiscoveryAlertResource {
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
impl ResourceWithConfigure for CustomDiscoveryAlertResource {
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
