//! Provider trait and related types
//!
//! The Provider is the entry point of a plugin: it declares its own schema,
//! builds the shared provider data during configure, and hands out factories
//! for every resource and data source it serves.

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory functions create a fresh resource/data source instance per RPC.
/// The framework configures each instance with the provider data before use,
/// so instances never share mutable state.
pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ResourceWithConfigure> + Send + Sync>;
pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSourceWithConfigure> + Send + Sync>;

/// Base trait for providers
/// The provider owns the API client configuration and registers all
/// resources and data sources under their full type names
#[async_trait]
pub trait Provider: Send + Sync {
    /// Type name is the provider prefix (e.g., "orcasecurity")
    fn type_name(&self) -> &str;

    /// Called to get provider metadata
    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    /// Called to get the provider's own configuration schema
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called to get the provider_meta schema (rarely used)
    async fn meta_schema(
        &self,
        ctx: Context,
        request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse;

    /// Called once before any resource/data source operation
    /// Build API clients here and return them as provider_data;
    /// the framework passes that Arc to every configure hook
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Called during plan to validate the provider configuration
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Called when Terraform wants the provider to stop in-flight work
    async fn stop(&self, ctx: Context, request: StopProviderRequest) -> StopProviderResponse;

    /// Resource factories keyed by full type name (e.g., "orcasecurity_automation")
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Data source factories keyed by full type name (e.g., "orcasecurity_user")
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

// Request/Response types for Provider trait

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub server_capabilities: ServerCapabilities,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderMetaSchemaRequest;

pub struct ProviderMetaSchemaResponse {
    pub schema: Option<Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Shared data handed to every resource/data source configure hook.
    /// Typically an Arc around a struct holding the API client.
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct StopProviderRequest;

pub struct StopProviderResponse {
    /// None means the stop was clean; Some carries an error description
    pub error: Option<String>,
}
