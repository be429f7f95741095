//! Full lifecycle of a resource through the trait object API

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};
use tokio::sync::RwLock;

/// In-memory store standing in for a remote API
#[derive(Default)]
struct Backend {
    entries: RwLock<HashMap<String, String>>,
}

struct EntryResource {
    backend: Arc<Backend>,
}

#[async_trait]
impl Resource for EntryResource {
    fn type_name(&self) -> &str {
        "backend_entry"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "backend_entry".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("value", AttributeType::String)
                        .required()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let value = request
            .config
            .get_string(&AttributePath::new("value"))
            .unwrap_or_default();

        let id = format!("entry-{}", value);
        self.backend
            .entries
            .write()
            .await
            .insert(id.clone(), value.clone());

        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state.set_string(&AttributePath::new("id"), id).unwrap();
        state
            .set_string(&AttributePath::new("value"), value)
            .unwrap();

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();

        let entries = self.backend.entries.read().await;
        let Some(value) = entries.get(&id) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
                private: vec![],
                deferred: None,
            };
        };

        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state.set_string(&AttributePath::new("id"), id).unwrap();
        state
            .set_string(&AttributePath::new("value"), value.clone())
            .unwrap();

        ReadResourceResponse {
            new_state: Some(state),
            diagnostics: vec![],
            private: request.private,
            deferred: None,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let value = request
            .config
            .get_string(&AttributePath::new("value"))
            .unwrap_or_default();

        self.backend
            .entries
            .write()
            .await
            .insert(id.clone(), value.clone());

        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state.set_string(&AttributePath::new("id"), id).unwrap();
        state
            .set_string(&AttributePath::new("value"), value)
            .unwrap();

        UpdateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        self.backend.entries.write().await.remove(&id);

        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for EntryResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

fn config_with_value(value: &str) -> DynamicValue {
    let mut config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    config
        .set_string(&AttributePath::new("value"), value.to_string())
        .unwrap();
    config
}

fn no_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        deferral_allowed: false,
        write_only_attributes_allowed: false,
    }
}

#[tokio::test]
async fn resource_lifecycle_round_trips_through_backend() {
    let backend = Arc::new(Backend::default());
    let resource: Box<dyn ResourceWithConfigure> = Box::new(EntryResource {
        backend: backend.clone(),
    });

    // Create
    let create_resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "backend_entry".to_string(),
                planned_state: config_with_value("first"),
                config: config_with_value("first"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(create_resp.diagnostics.is_empty());
    let id = create_resp
        .new_state
        .get_string(&AttributePath::new("id"))
        .unwrap();
    assert_eq!(backend.entries.read().await.len(), 1);

    // Read reflects stored value
    let read_resp = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "backend_entry".to_string(),
                current_state: create_resp.new_state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    let read_state = read_resp.new_state.unwrap();
    assert_eq!(
        read_state.get_string(&AttributePath::new("value")).unwrap(),
        "first"
    );

    // Update changes the stored value in place
    let update_resp = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "backend_entry".to_string(),
                prior_state: read_state,
                planned_state: config_with_value("second"),
                config: config_with_value("second"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(
        backend.entries.read().await.get(&id),
        Some(&"second".to_string())
    );

    // Delete removes it
    let delete_resp = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "backend_entry".to_string(),
                prior_state: update_resp.new_state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(delete_resp.diagnostics.is_empty());
    assert!(backend.entries.read().await.is_empty());
}

#[tokio::test]
async fn read_after_external_delete_reports_gone() {
    let backend = Arc::new(Backend::default());
    let resource: Box<dyn ResourceWithConfigure> = Box::new(EntryResource {
        backend: backend.clone(),
    });

    let create_resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "backend_entry".to_string(),
                planned_state: config_with_value("orphan"),
                config: config_with_value("orphan"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    // Remove out from under the resource
    backend.entries.write().await.clear();

    let read_resp = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "backend_entry".to_string(),
                current_state: create_resp.new_state,
                private: vec![],
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;

    assert!(read_resp.new_state.is_none());
    assert!(read_resp.diagnostics.is_empty());
}
