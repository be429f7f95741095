//! Shift Left CVE exception list resource implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use tfplug::context::Context;
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

use crate::api::shiftleft::cve_exceptions::{CveException, CveExceptionList};
use crate::resources::{dynamic_string_list, list_block, map_bool, map_string, string_list};

const EXPIRATION_FORMAT: &str = "%Y-%m-%d";

#[derive(Default)]
pub struct ShiftLeftCveExceptionListResource {
    provider_data: Option<crate::OrcaProviderData>,
}

impl ShiftLeftCveExceptionListResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_list(&self, config: &DynamicValue) -> Result<CveExceptionList, Diagnostic> {
        let name = config
            .get_string(&AttributePath::new("name"))
            .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

        let description = config.get_string(&AttributePath::new("description")).ok();

        let shift_left_project_ids = config
            .get_list(&AttributePath::new("shift_left_project_ids"))
            .ok()
            .map(string_list)
            .unwrap_or_default();

        let items = config
            .get_list(&AttributePath::new("cves"))
            .map_err(|_| Diagnostic::error("Missing cves", "The 'cves' block is required"))?;

        let mut cves = Vec::with_capacity(items.len());
        for item in items {
            let map = match item {
                Dynamic::Map(map) => map,
                _ => continue,
            };
            let cve_id = map_string(&map, "cve_id").ok_or_else(|| {
                Diagnostic::error(
                    "Invalid CVE exception",
                    "Each 'cves' block requires 'cve_id'",
                )
            })?;
            let expiration = map_string(&map, "expiration");
            if let Some(raw) = &expiration {
                NaiveDate::parse_from_str(raw, EXPIRATION_FORMAT).map_err(|_| {
                    Diagnostic::error(
                        "Invalid expiration",
                        format!("'{}' is not a YYYY-MM-DD date", raw),
                    )
                })?;
            }
            cves.push(CveException {
                cve_id,
                description: map_string(&map, "description"),
                expiration,
                disable_fix_available_filter: map_bool(&map, "disable_fix_available_filter"),
            });
        }

        Ok(CveExceptionList {
            id: None,
            name,
            description,
            shift_left_project_ids,
            cves,
        })
    }
}

#[async_trait]
impl Resource for ShiftLeftCveExceptionListResource {
    fn type_name(&self) -> &str {
        "orcasecurity_shift_left_cve_exception_list"
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
            .description("Manages a Shift Left CVE exception list")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Exception list ID")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Exception list name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Exception list description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "shift_left_project_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Projects the exceptions apply to; empty means all")
                .optional()
                .build(),
            )
            .block(list_block(
                "cves",
                vec![
                    AttributeBuilder::new("cve_id", AttributeType::String)
                        .description("CVE identifier, e.g. CVE-2021-44228")
                        .required()
                        .build(),
                    AttributeBuilder::new("description", AttributeType::String)
                        .description("Reason the CVE is excepted")
                        .optional()
                        .build(),
                    AttributeBuilder::new("expiration", AttributeType::String)
                        .description("Expiration date (YYYY-MM-DD); absent means never")
                        .optional()
                        .build(),
                    AttributeBuilder::new("disable_fix_available_filter", AttributeType::Bool)
                        .description("Keep the exception even once a fix ships")
                        .optional()
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

        match request.config.get_list(&AttributePath::new("cves")) {
            Ok(items) if items.is_empty() => {
                diagnostics.push(Diagnostic::error(
                    "Empty cves",
                    "An exception list needs at least one 'cves' block",
                ));
            }
            Ok(items) => {
                for item in items {
                    let map = match item {
                        Dynamic::Map(map) => map,
                        _ => continue,
                    };
                    if let Some(raw) = map_string(&map, "expiration") {
                        if NaiveDate::parse_from_str(&raw, EXPIRATION_FORMAT).is_err() {
                            diagnostics.push(Diagnostic::error(
                                "Invalid expiration",
                                format!("'{}' is not a YYYY-MM-DD date", raw),
                            ));
                        }
                    }
                }
            }
            Err(_) => {}
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

        let list = match self.extract_list(&request.config) {
            Ok(list) => list,
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
            .shiftleft()
            .cve_exceptions()
            .create(&list)
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
                    "Failed to create CVE exception list",
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

        match provider_data
            .client
            .shiftleft()
            .cve_exceptions()
            .get(&id)
            .await
        {
            Ok(list) => {
                let mut new_state = request.current_state.clone();
                let _ = new_state.set_string(&AttributePath::new("name"), list.name);
                if let Some(description) = list.description {
                    let _ =
                        new_state.set_string(&AttributePath::new("description"), description);
                }
                if !list.shift_left_project_ids.is_empty() {
                    let _ = new_state.set_list(
                        &AttributePath::new("shift_left_project_ids"),
                        dynamic_string_list(list.shift_left_project_ids),
                    );
                }
                let cves = list
                    .cves
                    .into_iter()
                    .map(|cve| {
                        let mut map = std::collections::HashMap::new();
                        map.insert("cve_id".to_string(), Dynamic::String(cve.cve_id));
                        if let Some(description) = cve.description {
                            map.insert("description".to_string(), Dynamic::String(description));
                        }
                        if let Some(expiration) = cve.expiration {
                            map.insert("expiration".to_string(), Dynamic::String(expiration));
                        }
                        if let Some(disable) = cve.disable_fix_available_filter {
                            map.insert(
                                "disable_fix_available_filter".to_string(),
                                Dynamic::Bool(disable),
                            );
                        }
                        Dynamic::Map(map)
                    })
                    .collect();
                let _ = new_state.set_list(&AttributePath::new("cves"), cves);

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
                    "Failed to read CVE exception list",
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
                    "Missing CVE exception list ID",
                    "State does not contain an 'id' to update",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match self.extract_list(&request.config) {
            Ok(list) => match provider_data
                .client
                .shiftleft()
                .cve_exceptions()
                .update(&id, &list)
                .await
            {
                Ok(_) => UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                },
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update CVE exception list",
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

        match provider_data
            .client
            .shiftleft()
            .cve_exceptions()
            .delete(&id)
            .await
        {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete CVE exception list",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithImportState for ShiftLeftCveExceptionListResource {
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
impl ResourceWithConfigure for ShiftLeftCveExceptionListResource {
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
    use tfplug::types::ClientCapabilities;

    fn provider_data_for(url: &str) -> crate::OrcaProviderData {
        let client = Client::new(url, "test-token").unwrap();
        crate::OrcaProviderData {
            client: Arc::new(client),
        }
    }

    fn exception_config(expiration: &str) -> DynamicValue {
        let mut cve = HashMap::new();
        cve.insert(
            "cve_id".to_string(),
            Dynamic::String("CVE-2021-44228".to_string()),
        );
        cve.insert(
            "description".to_string(),
            Dynamic::String("patched at the gateway".to_string()),
        );
        cve.insert(
            "expiration".to_string(),
            Dynamic::String(expiration.to_string()),
        );

        let mut obj = HashMap::new();
        obj.insert(
            "name".to_string(),
            Dynamic::String("log4shell-exceptions".to_string()),
        );
        obj.insert(
            "shift_left_project_ids".to_string(),
            Dynamic::List(vec![Dynamic::String("slp-1".to_string())]),
        );
        obj.insert("cves".to_string(), Dynamic::List(vec![Dynamic::Map(cve)]));
        DynamicValue::new(Dynamic::Map(obj))
    }

    fn capabilities() -> ClientCapabilities {
        ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }

    #[tokio::test]
    async fn validate_rejects_malformed_expiration() {
        let resource = ShiftLeftCveExceptionListResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_shift_left_cve_exception_list".to_string(),
                    config: exception_config("2026-13-40"),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Invalid expiration"));
    }

    #[tokio::test]
    async fn validate_requires_at_least_one_cve() {
        let resource = ShiftLeftCveExceptionListResource::new();
        let mut obj = HashMap::new();
        obj.insert("name".to_string(), Dynamic::String("empty".to_string()));
        obj.insert("cves".to_string(), Dynamic::List(vec![]));

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "orcasecurity_shift_left_cve_exception_list".to_string(),
                    config: DynamicValue::new(Dynamic::Map(obj)),
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Empty cves"));
    }

    #[tokio::test]
    async fn create_sends_cve_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/shiftleft/cve_exceptions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "log4shell-exceptions",
                "shift_left_project_ids": ["slp-1"],
                "cves": [{
                    "cve_id": "CVE-2021-44228",
                    "description": "patched at the gateway",
                    "expiration": "2026-12-31",
                }],
            })))
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "cel-1",
                    "name": "log4shell-exceptions",
                    "shift_left_project_ids": ["slp-1"],
                    "cves": [{"cve_id": "CVE-2021-44228", "expiration": "2026-12-31"}]
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = ShiftLeftCveExceptionListResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "orcasecurity_shift_left_cve_exception_list".to_string(),
                    planned_state: exception_config("2026-12-31"),
                    config: exception_config("2026-12-31"),
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
            "cel-1"
        );
    }

    #[tokio::test]
    async fn read_refreshes_cve_entries() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/shiftleft/cve_exceptions/cel-1")
            .with_status(200)
            .with_body(
                r#"{"status": "success", "data": {
                    "id": "cel-1",
                    "name": "log4shell-exceptions",
                    "cves": [
                        {"cve_id": "CVE-2021-44228", "expiration": "2026-12-31"},
                        {"cve_id": "CVE-2021-45046", "disable_fix_available_filter": true}
                    ]
                }}"#,
            )
            .create_async()
            .await;

        let mut resource = ShiftLeftCveExceptionListResource::new();
        resource.provider_data = Some(provider_data_for(&server.url()));

        let mut state = exception_config("2026-12-31");
        state
            .set_string(&AttributePath::new("id"), "cel-1".to_string())
            .unwrap();

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "orcasecurity_shift_left_cve_exception_list".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let new_state = response.new_state.unwrap();
        let cves = new_state.get_list(&AttributePath::new("cves")).unwrap();
        assert_eq!(cves.len(), 2);
    }
}
