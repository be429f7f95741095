//! Custom sonar alert resource implementation
//!
//! Sonar rules are written in the platform's query language, so the rule
//! text goes to the API verbatim instead of being parsed as JSON.

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
use tfplug::validator::{NumberRangeValidator, OneOfValidator};

use super::resource_custom_discovery_alert::{
    compliance_frameworks_block, extract_compliance_frameworks, extract_remediation_text,
    remediation_text_block, set_compliance_frameworks_state, set_remediation_text_state,
};
use crate::api::sonar::{CustomSonarAlert, ALERT_CATEGORIES};

#[derive(Default)]
pub struct CustomSonarAlertResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomSonarAlertResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_alert(&self, config: &DynamicValue) -> Result<CustomSonarAlert, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let rule = config
            .get_string(&AttributePath::new("rule"))
            .map_err(|_| Diagnostic::error("Missing rule", "The 'rule' attribute is required"))?;

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
        let context_score = config
            .get_bool(&AttributePath::new("context_score"))
            .unwrap_or(true);

        let remediation_text = extract_remediation_text(config)?;
        let compliance_frameworks = extract_compliance_frameworks(config)?;

        Ok(CustomSonarAlert {
            id: None,
            name,
            description,
            rule,
            category,
            score,
            allow_adjusting_severity,
            context_score,
            remediation_text,
            compliance_frameworks,
            organization_id: None,
        })
    }
}

#[async_trait]
impl Resource for CustomSonarAlertResource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_sonar_alert"
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
            .description("Manages a custom alert rule written in the Sonar query language")
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
                AttributeBuilder::new("rule", AttributeType::String)
                    .description("Sonar query the rule evaluates")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category", AttributeType::String)
                    .description("Alert category")
                    .required()
                    .validator(OneOfValidator::create(ALERT_CATEGORIES))
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
                AttributeBuilder::new("context_score", AttributeType::Bool)
                    .description("Weight the score with attack-path context")
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

        if let Ok(rule) = request.config.get_string(&AttributePath::new("rule")) {
            if rule.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("Empty rule", "The 'rule' attribute cannot be blank")
                        .with_attribute(AttributePath::new("rule")),
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

        match provider_data.client.sonar().create(&alert).await {
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
                    "Failed to create custom sonar alert",
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

        match provider_data.client.sonar().get(&id).await {
            Ok(alert) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), alert.name);
                if let Some(description) = alert.description {
                    let _ = new_state.set_string(&AttributePath::new("description"), description);
                }
                let _ = new_state.set_string(&AttributePath::new("rule"), alert.rule);
                let _ = new_state.set_string(&AttributePath::new("category"), alert.category);
                let _ = new_state.set_number(&AttributePath::new("score"), alert.score);
                let _ = new_state.set_bool(
                    &AttributePath::new("allow_adjusting_severity"),
                    alert.allow_adjusting_severity,
                );
                let _ =
                    new_state.set_bool(&AttributePath::new("context_score"), alert.context_score);
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
                    "Failed to read custom sonar alert",
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
                    "Missing custom sonar alert ID",
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
            Ok(alert) => match provider_data.client.sonar().update(&id, &alert).await {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update custom sonar alert",
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

        match provider_data.client.sonar().delete(&id).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete custom sonar alert",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for CustomSonarAlertResource {
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
impl ResourceWithConfigure for CustomSonarAlertResource {
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
