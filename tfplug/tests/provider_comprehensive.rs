//! Comprehensive test suite for the async provider traits
//!
//! Covers concurrency tracking, resource-internal state, and the
//! provider_data handoff from provider configure to resources and
//! data sources.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task;
use tokio::time::sleep;

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
use tfplug::schema::SchemaBuilder;
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue, ServerCapabilities};

/// Data handed from the provider to resources and data sources
struct SharedProviderData {
    environment: String,
}

/// Tracks how many create calls overlap
#[derive(Default)]
struct OperationStats {
    concurrent_creates: AtomicUsize,
    max_concurrent: AtomicUsize,
    total_operations: AtomicUsize,
}

impl OperationStats {
    fn start_operation(&self) -> usize {
        let current = self.concurrent_creates.fetch_add(1, Ordering::SeqCst) + 1;
        let mut max = self.max_concurrent.load(Ordering::SeqCst);
        while current > max {
            match self.max_concurrent.compare_exchange(
                max,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(new_max) => max = new_max,
            }
        }
        self.total_operations.fetch_add(1, Ordering::SeqCst);
        current
    }

    fn end_operation(&self) {
        self.concurrent_creates.fetch_sub(1, Ordering::SeqCst);
    }
}

struct AdvancedProvider {
    stats: Arc<OperationStats>,
}

impl AdvancedProvider {
    fn new() -> Self {
        Self {
            stats: Arc::new(OperationStats::default()),
        }
    }
}

#[async_trait]
impl Provider for AdvancedProvider {
    fn type_name(&self) -> &str {
        "advanced"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "advanced".to_string(),
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
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        // Simulate async configuration work
        sleep(Duration::from_millis(10)).await;

        let environment = request
            .config
            .get_string(&AttributePath::new("environment"))
            .unwrap_or_else(|_| "default".to_string());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(SharedProviderData { environment })
                as Arc<dyn std::any::Any + Send + Sync>),
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
        let stats = self.stats.clone();

        factories.insert(
            "advanced_tracked".to_string(),
            Box::new(move || {
                Box::new(TrackedResource::new(stats.clone())) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "advanced_stateful".to_string(),
            Box::new(|| Box::new(StatefulResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "advanced_environment".to_string(),
            Box::new(|| Box::new(EnvironmentDataSource::new()) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}

/// Records how many creates ran at once into its own state
struct TrackedResource {
    stats: Arc<OperationStats>,
}

impl TrackedResource {
    fn new(stats: Arc<OperationStats>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl Resource for TrackedResource {
    fn type_name(&self) -> &str {
        "advanced_tracked"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "advanced_tracked".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new().build(),
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
        let current = self.stats.start_operation();

        // Hold the slot long enough for other tasks to overlap
        sleep(Duration::from_millis(50)).await;

        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state
            .set_number(&AttributePath::new("concurrent_operations"), current as f64)
            .unwrap();
        state
            .set_number(
                &AttributePath::new("max_concurrent"),
                self.stats.max_concurrent.load(Ordering::SeqCst) as f64,
            )
            .unwrap();

        self.stats.end_operation();

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
            private: vec![],
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
impl ResourceWithConfigure for TrackedResource {
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

/// Keeps config values in an internal map across its CRUD calls
struct StatefulResource {
    items: RwLock<HashMap<String, String>>,
}

impl StatefulResource {
    fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    async fn replace_items(&self, config: &DynamicValue) {
        let mut items = self.items.write().await;
        items.clear();
        if let Ok(config_map) = config.get_map(&AttributePath::root()) {
            for (key, value) in config_map {
                if let Dynamic::String(str_val) = value {
                    items.insert(key, str_val);
                }
            }
        }
    }

    async fn state_snapshot(&self) -> DynamicValue {
        let items = self.items.read().await;
        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        state
            .set_string(&AttributePath::new("id"), "stateful-resource".to_string())
            .unwrap();
        state
            .set_number(&AttributePath::new("item_count"), items.len() as f64)
            .unwrap();
        state
    }
}

#[async_trait]
impl Resource for StatefulResource {
    fn type_name(&self) -> &str {
        "advanced_stateful"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "advanced_stateful".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new().build(),
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
        self.replace_items(&request.config).await;
        CreateResourceResponse {
            new_state: self.state_snapshot().await,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(self.state_snapshot().await),
            diagnostics: vec![],
            private: vec![],
            deferred: None,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        self.replace_items(&request.config).await;
        UpdateResourceResponse {
            new_state: self.state_snapshot().await,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        self.items.write().await.clear();
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for StatefulResource {
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

/// Surfaces the provider_data handed over during configure
struct EnvironmentDataSource {
    environment: Option<String>,
}

impl EnvironmentDataSource {
    fn new() -> Self {
        Self { environment: None }
    }
}

#[async_trait]
impl DataSource for EnvironmentDataSource {
    fn type_name(&self) -> &str {
        "advanced_environment"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "advanced_environment".to_string(),
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

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
        match &self.environment {
            Some(environment) => {
                state
                    .set_bool(&AttributePath::new("has_provider_data"), true)
                    .unwrap();
                state
                    .set_string(&AttributePath::new("environment"), environment.clone())
                    .unwrap();
            }
            None => {
                state
                    .set_bool(&AttributePath::new("has_provider_data"), false)
                    .unwrap();
            }
        }

        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EnvironmentDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        if let Some(data) = request.provider_data {
            if let Some(shared) = data.downcast_ref::<SharedProviderData>() {
                self.environment = Some(shared.environment.clone());
            }
        }
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
async fn provider_configuration_is_async() {
    let mut provider = AdvancedProvider::new();

    let mut config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    config
        .set_string(&AttributePath::new("environment"), "staging".to_string())
        .unwrap();

    let start = Instant::now();
    let resp = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    let elapsed = start.elapsed();

    assert!(resp.diagnostics.is_empty());
    assert!(resp.provider_data.is_some());
    // The simulated setup work sleeps 10ms
    assert!(elapsed.as_millis() >= 10);
}

#[tokio::test]
async fn concurrent_resource_operations_are_tracked() {
    let provider = Arc::new(AdvancedProvider::new());
    let mut handles = vec![];

    for _ in 0..10 {
        let provider = provider.clone();
        handles.push(task::spawn(async move {
            let resources = provider.resources();
            let resource = resources.get("advanced_tracked").unwrap()();
            let resp = resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "advanced_tracked".to_string(),
                        config: DynamicValue::null(),
                        planned_state: DynamicValue::null(),
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .await;

            resp.new_state
                .get_number(&AttributePath::new("max_concurrent"))
                .unwrap()
        }));
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let max_concurrent = results.iter().copied().fold(0.0, f64::max);
    assert!(
        max_concurrent > 1.0,
        "expected overlapping operations, max was {}",
        max_concurrent
    );
    assert_eq!(provider.stats.total_operations.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn stateful_resource_maintains_internal_state() {
    let provider = AdvancedProvider::new();
    let resources = provider.resources();
    let resource = resources.get("advanced_stateful").unwrap()();

    let mut config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    config
        .set_string(&AttributePath::new("key1"), "value1".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("key2"), "value2".to_string())
        .unwrap();

    let create_resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "advanced_stateful".to_string(),
                config,
                planned_state: DynamicValue::null(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(
        create_resp
            .new_state
            .get_number(&AttributePath::new("item_count"))
            .unwrap(),
        2.0
    );

    let read_resp = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "advanced_stateful".to_string(),
                current_state: DynamicValue::null(),
                private: vec![],
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    assert_eq!(
        read_resp
            .new_state
            .unwrap()
            .get_number(&AttributePath::new("item_count"))
            .unwrap(),
        2.0
    );

    let mut new_config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    new_config
        .set_string(&AttributePath::new("key3"), "value3".to_string())
        .unwrap();

    let update_resp = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "advanced_stateful".to_string(),
                prior_state: DynamicValue::null(),
                planned_state: DynamicValue::null(),
                config: new_config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(
        update_resp
            .new_state
            .get_number(&AttributePath::new("item_count"))
            .unwrap(),
        1.0
    );
}

#[tokio::test]
async fn data_source_receives_provider_data_through_configure() {
    let mut provider = AdvancedProvider::new();

    let mut config = DynamicValue::new(Dynamic::Map(HashMap::new()));
    config
        .set_string(&AttributePath::new("environment"), "production".to_string())
        .unwrap();

    let configure_resp = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
                client_capabilities: no_capabilities(),
            },
        )
        .await;
    let provider_data = configure_resp.provider_data;

    let data_sources = provider.data_sources();
    let mut data_source = data_sources.get("advanced_environment").unwrap()();

    data_source
        .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
        .await;

    let resp = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "advanced_environment".to_string(),
                config: DynamicValue::null(),
                provider_meta: None,
                client_capabilities: no_capabilities(),
            },
        )
        .await;

    assert!(resp
        .state
        .get_bool(&AttributePath::new("has_provider_data"))
        .unwrap());
    assert_eq!(
        resp.state
            .get_string(&AttributePath::new("environment"))
            .unwrap(),
        "production"
    );
}

#[tokio::test]
async fn factories_list_registered_types() {
    let provider = AdvancedProvider::new();

    let resources = provider.resources();
    assert!(resources.contains_key("advanced_tracked"));
    assert!(resources.contains_key("advanced_stateful"));

    let data_sources = provider.data_sources();
    assert!(data_sources.contains_key("advanced_environment"));
}
