//! Group data source implementation

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

use crate::resources::dynamic_string_list;

#[derive(Default)]
pub struct GroupDataSource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl GroupDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &str {
        "orcasecurity_group"
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
            .description("Looks up an access group by name")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the group to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Group ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Group description")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sso_group", AttributeType::Bool)
                    .description("Whether membership is managed by the identity provider")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "users",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("IDs of the group members")
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

        match provider_data.client.rbac().groups().list().await {
            Ok(groups) => match groups.into_iter().find(|group| group.name == name) {
                Some(group) => {
                    let mut state = DynamicValue::null();
                    let _ = state.set_string(&AttributePath::new("name"), group.name);
                    if let Some(id) = group.id {
                        let _ = state.set_string(&AttributePath::new("id"), id);
                    }
                    if let Some(description) = group.description {
                        let _ =
                            state.set_string(&AttributePath::new("description"), description);
                    }
                    let _ = state.set_bool(&AttributePath::new("sso_group"), group.sso_group);
                    let _ = state.set_list(
                        &AttributePath::new("users"),
                        dynamic_string_list(group.users),
                    );

                    ReadDataSourceResponse {
                        state,
                        diagnostics,
                        deferred: None,
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Group not found",
                        format!("No group named '{}' exists in the organization", name),
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
                    "Failed to list groups",
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
impl DataSourceWithConfigure for GroupDataSource {
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
