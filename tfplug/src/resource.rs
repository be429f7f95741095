//! The [`Resource`] trait and the optional capability traits layered on it.
//!
//! A resource implements the five lifecycle operations Terraform drives:
//! create, read, update, delete, and validate. Everything else is opt-in:
//! [`ResourceWithImportState`] for `terraform import`,
//! [`ResourceWithModifyPlan`] for custom planning, and
//! [`ResourceWithUpgradeState`] for migrating state across schema versions.
//!
//! Handlers report failure through `diagnostics` on their response structs,
//! never by panicking; the server forwards diagnostics to Terraform verbatim.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{AttributePath, ClientCapabilities, Deferred, Diagnostic, DynamicValue, RawState};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Core lifecycle contract for a managed resource.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Terraform type name, e.g. `"orcasecurity_automation"`. Must equal the
    /// key this resource is registered under in `Provider::resources()`.
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse;

    async fn schema(&self, ctx: Context, request: ResourceSchemaRequest) -> ResourceSchemaResponse;

    /// Validate configuration during plan, before any API call is made.
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    /// Create the remote object. `new_state` must come back with every
    /// attribute populated, computed ones included.
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// Refresh state from the remote API. A resource that no longer exists
    /// is reported as `new_state: None` with no error, which tells Terraform
    /// to plan a re-create.
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    /// Apply the planned changes to the remote object.
    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    /// Remove the remote object.
    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

pub struct ResourceMetadataRequest;

pub struct ResourceMetadataResponse {
    pub type_name: String,
}

pub struct ResourceSchemaRequest;

pub struct ResourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
    pub private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
    pub client_capabilities: ClientCapabilities,
}

pub struct ReadResourceResponse {
    /// `None` means the remote object is gone and should be re-created.
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
    pub private: Vec<u8>,
    pub deferred: Option<Deferred>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Every registered resource implements this. `configure` runs right after
/// the factory builds the instance and hands over the provider data set up
/// in `Provider::configure`, typically a shared API client.
///
/// The `as_*` accessors expose the optional traits through the boxed object
/// the factory returns; Rust trait objects cannot be interface-asserted the
/// way Go interfaces can, so resources opt in by overriding the accessor
/// with `Some(self)`.
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;

    /// Override with `Some(self)` if the resource implements ResourceWithImportState
    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        None
    }

    /// Override with `Some(self)` if the resource implements ResourceWithModifyPlan
    fn as_modify_plan(&self) -> Option<&dyn ResourceWithModifyPlan> {
        None
    }

    /// Override with `Some(self)` if the resource implements ResourceWithUpgradeState
    fn as_upgrade_state(&self) -> Option<&dyn ResourceWithUpgradeState> {
        None
    }
}

pub struct ConfigureResourceRequest {
    /// Whatever `ConfigureProviderResponse::provider_data` carried. Downcast
    /// to the provider's concrete type.
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Hook into planning after the framework's own pass.
///
/// By the time this runs the framework has already applied schema defaults,
/// marked computed attributes unknown, and run the per-attribute plan
/// modifiers. Implement it only for cross-attribute logic those hooks cannot
/// express, such as deriving one planned value from another.
#[async_trait]
pub trait ResourceWithModifyPlan: Resource {
    async fn modify_plan(&self, ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse;
}

pub struct ModifyPlanRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub prior_state: DynamicValue,
    pub proposed_new_state: DynamicValue,
    pub prior_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct ModifyPlanResponse {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub planned_private: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Migrate state written under an older schema version.
///
/// Without this trait the framework passes matching-version state through
/// untouched and errors on any other stored version, so it only needs
/// implementing once `schema.version` has been bumped.
#[async_trait]
pub trait ResourceWithUpgradeState: Resource {
    async fn upgrade_state(
        &self,
        ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse;
}

pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    /// Schema version the stored state was written under.
    pub version: i64,
    pub raw_state: RawState,
}

pub struct UpgradeResourceStateResponse {
    pub upgraded_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// Support for `terraform import`: turn a practitioner-supplied ID into
/// full resource state.
#[async_trait]
pub trait ResourceWithImportState: Resource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
    pub client_capabilities: ClientCapabilities,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
    pub deferred: Option<Deferred>,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
    pub private: Vec<u8>,
}
