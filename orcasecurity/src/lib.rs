//! Terraform provider for the Orca Security platform
//!
//! Exposes Orca automations, RBAC, dashboards, discovery views, shift left
//! projects and organization settings as Terraform resources over the plugin
//! protocol. All API access goes through [`api::Client`], which every resource
//! and data source receives via [`OrcaProviderData`] at configure time.

pub mod api;
pub mod data_sources;
mod provider_data;
pub mod resources;

pub use provider_data::OrcaProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue, ServerCapabilities};

/// Public SaaS endpoint used when neither the config nor the environment
/// names one.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.orcasecurity.io";

const ENV_API_ENDPOINT: &str = "ORCASECURITY_API_ENDPOINT";
const ENV_API_TOKEN: &str = "ORCASECURITY_API_TOKEN";

/// Terraform provider exposing Orca Security resources and data sources
#[derive(Default)]
pub struct OrcaProvider;

impl OrcaProvider {
    pub fn new() -> Self {
        Self
    }

    fn provider_schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Interact with the Orca Security platform")
            .attribute(
                AttributeBuilder::new("api_endpoint", AttributeType::String)
                    .description(
                        "Orca API endpoint. Falls back to the ORCASECURITY_API_ENDPOINT \
                         environment variable, then to the public SaaS endpoint.",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_token", AttributeType::String)
                    .description(
                        "Orca API token. Falls back to the ORCASECURITY_API_TOKEN \
                         environment variable.",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build()
    }
}

/// Resolves the endpoint and token with config values winning over the
/// environment. The token stays optional here; configure reports the error.
fn resolve_settings(config: &DynamicValue) -> (String, Option<String>) {
    let endpoint = config
        .get_string(&AttributePath::new("api_endpoint"))
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| std::env::var(ENV_API_ENDPOINT).ok().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

    let token = config
        .get_string(&AttributePath::new("api_token"))
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| std::env::var(ENV_API_TOKEN).ok().filter(|value| !value.is_empty()));

    (endpoint, token)
}

#[async_trait]
impl Provider for OrcaProvider {
    fn type_name(&self) -> &str {
        "orcasecurity"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: false,
                get_provider_schema_optional: false,
                move_resource_state: false,
            },
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: self.provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let (endpoint, token) = resolve_settings(&request.config);

        let token = match token {
            Some(token) => token,
            None => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Missing API token",
                        format!(
                            "Set the 'api_token' provider attribute or the {} \
                             environment variable",
                            ENV_API_TOKEN
                        ),
                    )],
                    provider_data: None,
                }
            }
        };

        match api::Client::new(&endpoint, &token) {
            Ok(client) => {
                tracing::info!(endpoint = %endpoint, "configured Orca Security client");
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(OrcaProviderData::new(client))),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    format!("API error: {}", e),
                )],
                provider_data: None,
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(endpoint) = request.config.get_string(&AttributePath::new("api_endpoint")) {
            if url::Url::parse(&endpoint).is_err() {
                diagnostics.push(Diagnostic::error(
                    "Invalid api_endpoint",
                    format!("'{}' is not a valid URL", endpoint),
                ));
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "orcasecurity_automation".to_string(),
            Box::new(|| Box::new(resources::AutomationResource::new())),
        );
        factories.insert(
            "orcasecurity_automation_v2".to_string(),
            Box::new(|| Box::new(resources::AutomationV2Resource::new())),
        );
        factories.insert(
            "orcasecurity_business_unit".to_string(),
            Box::new(|| Box::new(resources::BusinessUnitResource::new())),
        );
        factories.insert(
            "orcasecurity_custom_dashboard".to_string(),
            Box::new(|| Box::new(resources::CustomDashboardResource::new())),
        );
        factories.insert(
            "orcasecurity_custom_discovery_alert".to_string(),
            Box::new(|| Box::new(resources::CustomDiscoveryAlertResource::new())),
        );
        factories.insert(
            "orcasecurity_custom_role".to_string(),
            Box::new(|| Box::new(resources::CustomRoleResource::new())),
        );
        factories.insert(
            "orcasecurity_custom_sonar_alert".to_string(),
            Box::new(|| Box::new(resources::CustomSonarAlertResource::new())),
        );
        factories.insert(
            "orcasecurity_custom_widget".to_string(),
            Box::new(|| Box::new(resources::CustomWidgetResource::new())),
        );
        factories.insert(
            "orcasecurity_discovery_view".to_string(),
            Box::new(|| Box::new(resources::DiscoveryViewResource::new())),
        );
        factories.insert(
            "orcasecurity_group".to_string(),
            Box::new(|| Box::new(resources::GroupResource::new())),
        );
        factories.insert(
            "orcasecurity_group_permission".to_string(),
            Box::new(|| Box::new(resources::GroupPermissionResource::new())),
        );
        factories.insert(
            "orcasecurity_shift_left_cve_exception_list".to_string(),
            Box::new(|| Box::new(resources::ShiftLeftCveExceptionListResource::new())),
        );
        factories.insert(
            "orcasecurity_shift_left_project".to_string(),
            Box::new(|| Box::new(resources::ShiftLeftProjectResource::new())),
        );
        factories.insert(
            "orcasecurity_trusted_cloud_account".to_string(),
            Box::new(|| Box::new(resources::TrustedCloudAccountResource::new())),
        );
        factories.insert(
            "orcasecurity_webhook".to_string(),
            Box::new(|| Box::new(resources::WebhookResource::new())),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "orcasecurity_custom_role".to_string(),
            Box::new(|| Box::new(data_sources::CustomRoleDataSource::new())),
        );
        factories.insert(
            "orcasecurity_group".to_string(),
            Box::new(|| Box::new(data_sources::GroupDataSource::new())),
        );
        factories.insert(
            "orcasecurity_jira_template".to_string(),
            Box::new(|| Box::new(data_sources::JiraTemplateDataSource::new())),
        );
        factories.insert(
            "orcasecurity_shift_left_project".to_string(),
            Box::new(|| Box::new(data_sources::ShiftLeftProjectDataSource::new())),
        );
        factories.insert(
            "orcasecurity_user".to_string(),
            Box::new(|| Box::new(data_sources::UserDataSource::new())),
        );
        factories
    }
}
