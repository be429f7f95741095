//! Verifies the async provider traits work through trait objects

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue, ServerCapabilities};
use tokio::task;
use tokio::time::sleep;

struct SimpleProvider;

#[async_trait]
impl Provider for SimpleProvider {
    fn type_name(&self) -> &str {
        "simple"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "simple".to_string(),
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
            schema: SchemaBuilder::new().build(),
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
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        // Simulate async setup
        sleep(Duration::from_millis(1)).await;
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: None,
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "simple_item".to_string(),
            Box::new(|| Box::new(ItemResource { delay_ms: 1 }) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            "simple_slow_item".to_string(),
            Box::new(|| Box::new(ItemResource { delay_ms: 100 }) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "simple_echo".to_string(),
            Box::new(|| Box::new(EchoDataSource) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}

struct ItemResource {
    delay_ms: u64,
}

#[async_trait]
impl Resource for ItemResource {
    fn type_name(&self) -> &str {
        "simple_item"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "simple_item".to_string(),
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
        _request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        sleep(Duration::from_millis(self.delay_ms)).await;

        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state
            .set_string(&AttributePath::new("id"), "item-1".to_string())
            .unwrap();

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
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
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ItemResource {
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

struct EchoDataSource;

#[async_trait]
impl DataSource for EchoDataSource {
    fn type_name(&self) -> &str {
        "simple_echo"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "simple_echo".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new().build(),
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
        ReadDataSourceResponse {
            state: request.config,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EchoDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

fn no_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        deferral_allowed: false,
        write_only_attributes_allowed: false,
    }
}

#[tokio::test]
async fn async_trait_methods_work_through_trait_objects() {
    let mut provider = SimpleProvider;

    let configure_resp = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::null(),
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    assert!(configure_resp.diagnostics.is_empty());

    let resources = provider.resources();
    let resource = resources.get("simple_item").unwrap()();

    let create_resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "simple_item".to_string(),
                planned_state: DynamicValue::null(),
                config: DynamicValue::null(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(create_resp.diagnostics.is_empty());
    assert_eq!(
        create_resp
            .new_state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "item-1"
    );

    let data_sources = provider.data_sources();
    let data_source = data_sources.get("simple_echo").unwrap()();

    let mut config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    config
        .set_string(&AttributePath::new("input"), "echo".to_string())
        .unwrap();

    let read_resp = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "simple_echo".to_string(),
                config,
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    assert_eq!(
        read_resp
            .state
            .get_string(&AttributePath::new("input"))
            .unwrap(),
        "echo"
    );
}

#[tokio::test]
async fn concurrent_operations_run_in_parallel() {
    let provider = Arc::new(SimpleProvider);
    let start = Instant::now();

    let mut handles = vec![];
    for _ in 0..5 {
        let provider = provider.clone();
        handles.push(task::spawn(async move {
            let resources = provider.resources();
            let resource = resources.get("simple_slow_item").unwrap()();
            resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "simple_slow_item".to_string(),
                        planned_state: DynamicValue::null(),
                        config: DynamicValue::null(),
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .await
        }));
    }

    for handle in handles {
        let resp = handle.await.unwrap();
        assert!(resp.diagnostics.is_empty());
    }

    // Five serialized 100ms creates would take 500ms
    let elapsed = start.elapsed();
    assert!(
        elapsed.as_millis() < 300,
        "concurrent operations took too long: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn factories_create_independent_instances() {
    let provider = SimpleProvider;
    let resources = provider.resources();
    let factory = resources.get("simple_item").unwrap();

    let first = factory();
    let second = factory();

    let state = DynamicValue::new(Dynamic::Map(HashMap::new()));
    let read_first = first
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "simple_item".to_string(),
                current_state: state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    let read_second = second
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "simple_item".to_string(),
                current_state: state,
                private: vec![],
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;

    assert!(read_first.new_state.is_some());
    assert!(read_second.new_state.is_some());
}

#[tokio::test]
async fn unknown_type_names_are_absent_from_factories() {
    let provider = SimpleProvider;

    assert!(provider.resources().get("simple_nonexistent").is_none());
    assert!(provider.data_sources().get("simple_nonexistent").is_none());
}
