//! Custom role data source implementation

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
pub struct CustomRoleDataSource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl CustomRoleDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for CustomRoleDataSource {
    fn type_name(&self) -> &str {
        "orcasecurity_custom_role"
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
            .description("Looks up a custom RBAC role by name")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the role to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Role ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Role description")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "permission_groups",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Permission groups the role grants")
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

        match provider_data.client.rbac().roles().list().await {
            Ok(roles) => match roles.into_iter().find(|role| role.name == name) {
                Some(role) => {
                    let mut state = DynamicValue::null();
                    let _ = state.set_string(&AttributePath::new("name"), role.name);
                    if let Some(id) = role.id {
                        let _ = state.set_string(&AttributePath::new("id"), id);
                    }
                    if let Some(description) = role.description {
                        let _ =
                            state.set_string(&AttributePath::new("description"), description);
                    }
                    let _ = state.set_list(
                        &AttributePath::new("permission_groups"),
                        dynamic_string_list(role.permission_groups),
                    );

                    ReadDataSourceResponse {
                        state,
                        diagnostics,
                        deferred: None,
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Custom role not found",
                        format!("No custom role named '{}' exists in the organization", name),
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
                    "Failed to list custom roles",
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
impl DataSourceWithConfigure for CustomRoleDataSource {
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
