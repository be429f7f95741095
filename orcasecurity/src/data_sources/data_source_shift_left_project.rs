//! Shift Left project data source implementation

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
pub struct ShiftLeftProjectDataSource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl ShiftLeftProjectDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ShiftLeftProjectDataSource {
    fn type_name(&self) -> &str {
        "orcasecurity_shift_left_project"
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
            .description("Looks up a Shift Left project by key")
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .description("Key of the project to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Project ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Project name")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Project description")
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

        let key = match request.config.get_string(&AttributePath::new("key")) {
            Ok(key) => key,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing key",
                    "The 'key' attribute is required",
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

        // search narrows server side; the exact key match happens here
        match provider_data
            .client
            .shiftleft()
            .projects()
            .list(Some(&key))
            .await
        {
            Ok(projects) => match projects.into_iter().find(|project| project.key == key) {
                Some(project) => {
                    let mut state = DynamicValue::null();
                    let _ = state.set_string(&AttributePath::new("key"), project.key);
                    if let Some(id) = project.id {
                        let _ = state.set_string(&AttributePath::new("id"), id);
                    }
                    let _ = state.set_string(&AttributePath::new("name"), project.name);
                    if let Some(description) = project.description {
                        let _ =
                            state.set_string(&AttributePath::new("description"), description);
                    }

                    ReadDataSourceResponse {
                        state,
                        diagnostics,
                        deferred: None,
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Shift left project not found",
                        format!("No project with key '{}' exists", key),
                    ));
                    ReadDataSourceResponse {
                        state: DynamicValue::null(),
                        diagnostics,
                        deferred: None,
                    }
                }
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to list shift left projects",
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
impl DataSourceWithConfigure for ShiftLeftProjectDataSource {
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
