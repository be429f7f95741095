//! Jira template data source implementation
//!
//! The templates endpoint 404s when the organization has no Jira integration
//! configured; that case gets its own explanation instead of a bare API
//! error.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

#[derive(Default)]
pub struct JiraTemplateDataSource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl JiraTemplateDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for JiraTemplateDataSource {
    fn type_name(&self) -> &str {
        "orcasecurity_jira_template"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a Jira issue template by name")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the template to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Template ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template_type", AttributeType::String)
                    .description("Template type")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_key", AttributeType::String)
                    .description("Jira project the template files issues in")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let name = match request.config.get_string(&AttributePath::new("name")) {
            Ok(name) => name,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing name",
                    "The 'name' attribute is required",
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
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
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data.client.integrations().jira().list_templates().await {
            Ok(templates) => {
                match templates
                    .into_iter()
                    .find(|template| template.template_name == name)
                {
                    Some(template) => {
                        let mut state = DynamicValue::null();
                        let _ =
                            state.set_string(&AttributePath::new("name"), template.template_name);
                        let _ = state.set_string(&AttributePath::new("id"), template.id);
                        let _ = state.set_string(
                            &AttributePath::new("template_type"),
                            template.template_type,
                        );
                        let _ = state.set_string(
                            &AttributePath::new("project_key"),
                            template.project_key,
                        );

                        ReadDataSourceResponse {
                            state,
                            diagnostics,
                            deferred: None,
                        }
                    }
                    None => {
                        diagnostics.push(Diagnostic::error(
                            "Jira template not found",
                            format!("No Jira template named '{}' exists", name),
                        ));
                        ReadDataSourceResponse {
                            state: DynamicValue::null(),
                            diagnostics,
                            deferred: None,
                        }
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                diagnostics.push(Diagnostic::error(
                    "Jira integration not configured",
                    "The Jira templates endpoint returned 404, which usually means the \
                     organization has no Jira integration set up. Configure the integration \
                     in the Orca platform before referencing its templates.",
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to list Jira templates",
                    format!("API error: {}", e),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for JiraTemplateDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
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
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::Server;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::{ClientCapabilities, Dynamic};

    fn provider_data_for(url: &str) -> crate::OrcaProviderData {
        let client = Client::new(url, "test-token").unwrap();
        crate::OrcaProviderData {
            client: Arc::new(client),
        }
    }

    fn lookup_config(name: &str) -> DynamicValue {
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String(name.to_string()));
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn read_finds_template_by_name() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/integrations/jira/templates")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": [
                    {"id": "t-1", "template_name": "SECOPS",
                     "template_type": "issue", "project_key": "SEC"}
                ]}"#,
            )
            .create_async()
            .await;

        let mut data_source = JiraTemplateDataSource::new();
        data_source.provider_data = Some(provider_data_for(&server.url()));

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "orcasecurity_jira_template".to_string(),
                    config: lookup_config("SECOPS"),
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("project_key"))
                .unwrap(),
            "SEC"
        );
    }

    #[tokio::test]
    async fn read_explains_unconfigured_integration() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/integrations/jira/templates")
            .with_status(404)
            .with_body(r#"{"error": "not found"}"#)
            .create_async()
            .await;

        let mut data_source = JiraTemplateDataSource::new();
        data_source.provider_data = Some(provider_data_for(&server.url()));

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "orcasecurity_jira_template".to_string(),
                    config: lookup_config("SECOPS"),
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Jira integration not configured"));
    }
}
