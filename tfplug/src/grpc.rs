//! gRPC service implementation for the Terraform Plugin Protocol
//!
//! This module bridges the proto service to the Provider, Resource and
//! DataSource traits. Resources and data sources are created on demand
//! through the factories the provider registers, then configured with the
//! provider data captured during ConfigureProvider.
//!
//! Planning is handled here so resources only implement CRUD:
//! 1. Defaults are applied to optional+computed attributes left null
//! 2. Computed attributes still null are marked unknown
//! 3. Attribute plan modifiers run and may flag replacement
//! 4. The resource's modify_plan hook runs last, if implemented

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderMetaSchemaRequest, ProviderMetadataRequest,
    ProviderSchemaRequest, StopProviderRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, UpgradeResourceStateRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{
    Attribute, AttributeType, Block, DefaultRequest, NestedBlock, NestedType, NestingMode,
    ObjectNestingMode, PlanModifierRequest, Schema, StringKind, ValidatorRequest,
};
use crate::types::{
    AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason, Diagnostic,
    DiagnosticSeverity, Dynamic, DynamicValue, RawState,
};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tonic::{Request, Response, Status};

/// Serves a Provider over the plugin protocol
///
/// The provider itself is behind a lock because ConfigureProvider mutates
/// it; every other RPC takes a read lock. Provider data returned from
/// configure is cached and handed to each resource/data source instance.
pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<Option<Arc<dyn Any + Send + Sync>>>>,
    stop_tx: watch::Sender<bool>,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let (stop_tx, _stop_rx) = watch::channel(false);
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            stop_tx,
        }
    }

    /// Receiver that flips to true once Terraform asks the provider to stop
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Creates a resource through its factory and optionally runs its
    /// configure hook with the cached provider data
    async fn instantiate_resource(
        &self,
        type_name: &str,
        configure: bool,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = {
            let provider = self.provider.read().await;
            let mut factories = provider.resources();
            factories.remove(type_name)
        };

        let factory = factory.ok_or_else(|| {
            vec![Diagnostic::error(
                format!("Unknown resource type: {}", type_name),
                format!(
                    "The provider does not define a resource named '{}'",
                    type_name
                ),
            )]
        })?;

        let mut resource = factory();

        if configure {
            let provider_data = self.provider_data.read().await.clone();
            let response = resource
                .configure(Context::new(), ConfigureResourceRequest { provider_data })
                .await;
            if has_error(&response.diagnostics) {
                return Err(response.diagnostics);
            }
        }

        Ok(resource)
    }

    async fn instantiate_data_source(
        &self,
        type_name: &str,
        configure: bool,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = {
            let provider = self.provider.read().await;
            let mut factories = provider.data_sources();
            factories.remove(type_name)
        };

        let factory = factory.ok_or_else(|| {
            vec![Diagnostic::error(
                format!("Unknown data source type: {}", type_name),
                format!(
                    "The provider does not define a data source named '{}'",
                    type_name
                ),
            )]
        })?;

        let mut data_source = factory();

        if configure {
            let provider_data = self.provider_data.read().await.clone();
            let response = data_source
                .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
                .await;
            if has_error(&response.diagnostics) {
                return Err(response.diagnostics);
            }
        }

        Ok(data_source)
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let metadata = provider
            .metadata(Context::new(), ProviderMetadataRequest)
            .await;

        let mut resources: Vec<String> = provider.resources().into_keys().collect();
        resources.sort();
        let mut data_sources: Vec<String> = provider.data_sources().into_keys().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(&metadata.server_capabilities)),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let provider = self.provider.read().await;
        let mut diagnostics = Vec::new();

        let metadata = provider
            .metadata(Context::new(), ProviderMetadataRequest)
            .await;

        let schema_response = provider.schema(Context::new(), ProviderSchemaRequest).await;
        diagnostics.extend(schema_response.diagnostics);
        let provider_schema = schema_to_proto(&schema_response.schema);

        let meta_schema_response = provider
            .meta_schema(Context::new(), ProviderMetaSchemaRequest)
            .await;
        diagnostics.extend(meta_schema_response.diagnostics);
        let provider_meta = meta_schema_response.schema.as_ref().map(schema_to_proto);

        let mut resource_schemas = HashMap::new();
        for (type_name, factory) in provider.resources() {
            let resource = factory();
            let response = resource.schema(Context::new(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (type_name, factory) in provider.data_sources() {
            let data_source = factory();
            let response = data_source
                .schema(Context::new(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(provider_schema),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(&diagnostics),
            provider_meta,
            server_capabilities: Some(server_capabilities_to_proto(&metadata.server_capabilities)),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();

        let config = match decode_dynamic(&req.config) {
            Ok(config) => config,
            // Configs holding values Terraform has not resolved yet cannot
            // be validated; plan will call again once they are known
            Err(_) => {
                return Ok(Response::new(proto::validate_provider_config::Response {
                    diagnostics: vec![],
                }))
            }
        };

        let provider = self.provider.read().await;
        let response = provider
            .validate(Context::new(), ValidateProviderConfigRequest { config })
            .await;

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic(&req.config)?;

        tracing::debug!(
            terraform_version = %req.terraform_version,
            "configuring provider"
        );

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: client_capabilities_from_proto(&req.client_capabilities),
                },
            )
            .await;

        *self.provider_data.write().await = response.provider_data;

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();

        let resource = match self.instantiate_resource(&req.type_name, false).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::validate_resource_config::Response {
                    diagnostics: diagnostics_to_proto(&diagnostics),
                }))
            }
        };

        let config = match decode_dynamic(&req.config) {
            Ok(config) => config,
            Err(_) => {
                return Ok(Response::new(proto::validate_resource_config::Response {
                    diagnostics: vec![],
                }))
            }
        };

        let schema_response = resource.schema(Context::new(), ResourceSchemaRequest).await;
        let mut diagnostics = check_config_against_schema(&config, &schema_response.schema);

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities_from_proto(&req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status>
    {
        let req = request.into_inner();

        let data_source = match self.instantiate_data_source(&req.type_name, false).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return Ok(Response::new(
                    proto::validate_data_resource_config::Response {
                        diagnostics: diagnostics_to_proto(&diagnostics),
                    },
                ))
            }
        };

        let config = match decode_dynamic(&req.config) {
            Ok(config) => config,
            Err(_) => {
                return Ok(Response::new(
                    proto::validate_data_resource_config::Response {
                        diagnostics: vec![],
                    },
                ))
            }
        };

        let schema_response = data_source
            .schema(Context::new(), DataSourceSchemaRequest)
            .await;
        let mut diagnostics = check_config_against_schema(&config, &schema_response.schema);

        let response = data_source
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(
            proto::validate_data_resource_config::Response {
                diagnostics: diagnostics_to_proto(&diagnostics),
            },
        ))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();

        let resource = match self.instantiate_resource(&req.type_name, true).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: diagnostics_to_proto(&diagnostics),
                }))
            }
        };

        let schema_response = resource.schema(Context::new(), ResourceSchemaRequest).await;
        let current_version = schema_response.schema.version;
        let raw_state = req.raw_state.unwrap_or_default();

        // Matching versions need no migration; hand the stored JSON back
        if req.version == current_version {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: Some(proto::DynamicValue {
                    msgpack: vec![],
                    json: raw_state.json,
                }),
                diagnostics: vec![],
            }));
        }

        let Some(upgrader) = resource.as_upgrade_state() else {
            let diagnostic = Diagnostic::error(
                "Unable to upgrade resource state",
                format!(
                    "State was saved with schema version {} but the current version is {}, \
                     and the resource does not implement state upgrade",
                    req.version, current_version
                ),
            );
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: diagnostics_to_proto(&[diagnostic]),
            }));
        };

        let response = upgrader
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: req.type_name,
                    version: req.version,
                    raw_state: RawState {
                        json: if raw_state.json.is_empty() {
                            None
                        } else {
                            Some(raw_state.json)
                        },
                        flatmap: if raw_state.flatmap.is_empty() {
                            None
                        } else {
                            Some(raw_state.flatmap)
                        },
                    },
                },
            )
            .await;

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic(&response.upgraded_state)?),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "reading resource");

        let resource = match self.instantiate_resource(&req.type_name, true).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::read_resource::Response {
                    new_state: None,
                    diagnostics: diagnostics_to_proto(&diagnostics),
                    private: vec![],
                    deferred: None,
                }))
            }
        };

        let current_state = decode_dynamic(&req.current_state)?;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state,
                    private: req.private,
                    provider_meta: decode_optional_dynamic(&req.provider_meta)?,
                    client_capabilities: client_capabilities_from_proto(&req.client_capabilities),
                },
            )
            .await;

        // A None state means the remote object no longer exists; a null
        // value tells Terraform to remove it from state
        let new_state = match response.new_state {
            Some(state) => encode_dynamic(&state)?,
            None => encode_dynamic(&DynamicValue::null())?,
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(new_state),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
            private: response.private,
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "planning resource change");

        let resource = match self.instantiate_resource(&req.type_name, true).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::plan_resource_change::Response {
                    planned_state: None,
                    requires_replace: vec![],
                    planned_private: vec![],
                    diagnostics: diagnostics_to_proto(&diagnostics),
                    legacy_type_system: false,
                    deferred: None,
                }))
            }
        };

        let prior_state = decode_dynamic(&req.prior_state)?;
        let config = decode_dynamic(&req.config)?;
        let proposed_new_state = decode_dynamic(&req.proposed_new_state)?;

        // Destroy plans carry a null proposed state and skip the pipeline
        if proposed_new_state.is_null() {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: Some(encode_dynamic(&proposed_new_state)?),
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
                deferred: None,
            }));
        }

        let schema_response = resource.schema(Context::new(), ResourceSchemaRequest).await;
        let mut diagnostics = schema_response.diagnostics;
        let schema = schema_response.schema;

        let mut planned = proposed_new_state;

        // Defaults fill optional+computed attributes the config left null
        for attr in &schema.block.attributes {
            if let Some(default) = &attr.default {
                if attr.optional
                    && attr.computed
                    && matches!(attribute_value(&config, &attr.name), Dynamic::Null)
                {
                    let response = default.default_value(DefaultRequest {
                        path: AttributePath::new(&attr.name),
                    });
                    set_attribute_value(&mut planned, &attr.name, response.value.value);
                }
            }
        }

        // Computed attributes with no config or prior value become unknown
        for attr in &schema.block.attributes {
            if attr.computed
                && matches!(attribute_value(&planned, &attr.name), Dynamic::Null)
                && matches!(attribute_value(&config, &attr.name), Dynamic::Null)
            {
                set_attribute_value(&mut planned, &attr.name, Dynamic::Unknown);
            }
        }

        let mut requires_replace: Vec<AttributePath> = Vec::new();
        for attr in &schema.block.attributes {
            if attr.plan_modifiers.is_empty() {
                continue;
            }

            let path = AttributePath::new(&attr.name);
            let state_value = DynamicValue::new(attribute_value(&prior_state, &attr.name));
            let config_value = DynamicValue::new(attribute_value(&config, &attr.name));
            let mut plan_value = DynamicValue::new(attribute_value(&planned, &attr.name));

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: config_value.clone(),
                    state_value: state_value.clone(),
                    plan_value: plan_value.clone(),
                    path: path.clone(),
                });

                plan_value = response.plan_value;
                if response.requires_replace {
                    requires_replace.push(path.clone());
                }
                diagnostics.extend(response.diagnostics);
            }

            set_attribute_value(&mut planned, &attr.name, plan_value.value);
        }

        let mut planned_private = req.prior_private.clone();
        if let Some(hook) = resource.as_modify_plan() {
            let response = hook
                .modify_plan(
                    Context::new(),
                    ModifyPlanRequest {
                        type_name: req.type_name.clone(),
                        config: config.clone(),
                        prior_state: prior_state.clone(),
                        proposed_new_state: planned.clone(),
                        prior_private: req.prior_private.clone(),
                        provider_meta: decode_optional_dynamic(&req.provider_meta)?,
                    },
                )
                .await;

            planned = response.planned_state;
            requires_replace.extend(response.requires_replace);
            planned_private = response.planned_private;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic(&planned)?),
            requires_replace: requires_replace
                .iter()
                .map(attribute_path_to_proto)
                .collect(),
            planned_private,
            diagnostics: diagnostics_to_proto(&diagnostics),
            legacy_type_system: false,
            deferred: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "applying resource change");

        let resource = match self.instantiate_resource(&req.type_name, true).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::apply_resource_change::Response {
                    new_state: None,
                    private: vec![],
                    diagnostics: diagnostics_to_proto(&diagnostics),
                    legacy_type_system: false,
                }))
            }
        };

        let prior_state = decode_dynamic(&req.prior_state)?;
        let planned_state = decode_dynamic(&req.planned_state)?;
        let config = decode_dynamic(&req.config)?;
        let provider_meta = decode_optional_dynamic(&req.provider_meta)?;

        let is_create = prior_state.is_null() && !planned_state.is_null();
        let is_delete = !prior_state.is_null() && planned_state.is_null();

        let (new_state, private, diagnostics) = if is_create {
            let response = resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        } else if is_delete {
            let response = resource
                .delete(
                    Context::new(),
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            // A failed destroy keeps the prior state so Terraform can retry
            let state = if has_error(&response.diagnostics) {
                prior_state
            } else {
                DynamicValue::null()
            };
            (state, vec![], response.diagnostics)
        } else if !planned_state.is_null() {
            let response = resource
                .update(
                    Context::new(),
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        } else {
            (DynamicValue::null(), vec![], vec![])
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(&diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, id = %req.id, "importing resource");

        let resource = match self.instantiate_resource(&req.type_name, true).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::import_resource_state::Response {
                    imported_resources: vec![],
                    diagnostics: diagnostics_to_proto(&diagnostics),
                    deferred: None,
                }))
            }
        };

        let Some(importer) = resource.as_import_state() else {
            let diagnostic = Diagnostic::error(
                format!("Resource '{}' does not support import", req.type_name),
                "The resource does not implement import; it must be created by Terraform",
            );
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(&[diagnostic]),
                deferred: None,
            }));
        };

        let response = importer
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities_from_proto(&req.client_capabilities),
                },
            )
            .await;

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in &response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name.clone(),
                state: Some(encode_dynamic(&imported.state)?),
                private: imported.private.clone(),
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(&response.diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn move_resource_state(
        &self,
        _request: Request<proto::move_resource_state::Request>,
    ) -> std::result::Result<Response<proto::move_resource_state::Response>, Status> {
        // Not advertised in server capabilities, so Terraform will not call this
        Err(Status::unimplemented(
            "moving resource state between types is not supported",
        ))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "reading data source");

        let data_source = match self.instantiate_data_source(&req.type_name, true).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return Ok(Response::new(proto::read_data_source::Response {
                    state: None,
                    diagnostics: diagnostics_to_proto(&diagnostics),
                    deferred: None,
                }))
            }
        };

        let config = decode_dynamic(&req.config)?;

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta: decode_optional_dynamic(&req.provider_meta)?,
                    client_capabilities: client_capabilities_from_proto(&req.client_capabilities),
                },
            )
            .await;

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic(&response.state)?),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
            deferred: response.deferred.as_ref().map(deferred_to_proto),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        let response = {
            let provider = self.provider.read().await;
            provider.stop(Context::new(), StopProviderRequest).await
        };

        let _ = self.stop_tx.send(true);

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

// Conversion helpers between framework types and proto types

fn has_error(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error))
}

fn decode_dynamic(value: &Option<proto::DynamicValue>) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
            .map_err(|e| Status::invalid_argument(format!("failed to decode msgpack: {}", e)))
    } else if !value.json.is_empty() {
        DynamicValue::decode_json(&value.json)
            .map_err(|e| Status::invalid_argument(format!("failed to decode json: {}", e)))
    } else {
        Ok(DynamicValue::null())
    }
}

fn decode_optional_dynamic(
    value: &Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    match value {
        Some(_) => decode_dynamic(value).map(Some),
        None => Ok(None),
    }
}

fn encode_dynamic(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    // Terraform expects an explicit msgpack nil for null values
    let msgpack = if value.is_null() {
        vec![0xc0]
    } else {
        value
            .encode_msgpack()
            .map_err(|e| Status::internal(format!("failed to encode msgpack: {}", e)))?
    };

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

/// Top-level attribute lookup; anything but a map yields null
fn attribute_value(value: &DynamicValue, name: &str) -> Dynamic {
    match &value.value {
        Dynamic::Map(map) => map.get(name).cloned().unwrap_or(Dynamic::Null),
        _ => Dynamic::Null,
    }
}

fn set_attribute_value(value: &mut DynamicValue, name: &str, new_value: Dynamic) {
    if let Dynamic::Map(map) = &mut value.value {
        map.insert(name.to_string(), new_value);
    }
}

/// Structural checks the framework applies before the resource's own
/// validate hook: required attributes, undeclared attributes, value types
/// and any validators declared on the schema
fn check_config_against_schema(config: &DynamicValue, schema: &Schema) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let Dynamic::Map(values) = &config.value else {
        return diagnostics;
    };

    for attr in &schema.block.attributes {
        let value = values.get(&attr.name);

        if attr.required && value.is_none_or(|v| matches!(v, Dynamic::Null)) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Missing required attribute: {}", attr.name),
                    format!(
                        "The attribute '{}' is required but was not set",
                        attr.name
                    ),
                )
                .with_attribute(AttributePath::new(&attr.name)),
            );
        }

        let Some(value) = value else { continue };

        if attr.nested_type.is_none() && !validate_dynamic_type(value, &attr.r#type) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Type mismatch for attribute: {}", attr.name),
                    format!(
                        "Attribute '{}' expects type {:?} but got {}",
                        attr.name,
                        attr.r#type,
                        dynamic_type_name(value)
                    ),
                )
                .with_attribute(AttributePath::new(&attr.name)),
            );
        }

        if !matches!(value, Dynamic::Null | Dynamic::Unknown) {
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: AttributePath::new(&attr.name),
                });
                diagnostics.extend(response.diagnostics);
            }
        }
    }

    let known: HashSet<&str> = schema
        .block
        .attributes
        .iter()
        .map(|a| a.name.as_str())
        .chain(schema.block.block_types.iter().map(|b| b.type_name.as_str()))
        .collect();

    for name in values.keys() {
        if !known.contains(name.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Unknown attribute: {}", name),
                    format!("The attribute '{}' is not defined in the schema", name),
                )
                .with_attribute(AttributePath::new(name)),
            );
        }
    }

    diagnostics
}

fn validate_dynamic_type(value: &Dynamic, expected: &AttributeType) -> bool {
    match (value, expected) {
        // Null and unknown fit any type; resolution happens later
        (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(elem))
        | (Dynamic::List(items), AttributeType::Set(elem)) => {
            items.iter().all(|item| validate_dynamic_type(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Map(elem)) => {
            map.values().all(|item| validate_dynamic_type(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Object(attrs)) => attrs.iter().all(|(name, t)| {
            map.get(name)
                .is_none_or(|item| validate_dynamic_type(item, t))
        }),
        _ => false,
    }
}

fn dynamic_type_name(value: &Dynamic) -> &'static str {
    match value {
        Dynamic::Null => "null",
        Dynamic::Bool(_) => "bool",
        Dynamic::Number(_) => "number",
        Dynamic::String(_) => "string",
        Dynamic::List(_) => "list",
        Dynamic::Map(_) => "map",
        Dynamic::Unknown => "unknown",
    }
}

fn diagnostics_to_proto(diagnostics: &[Diagnostic]) -> Vec<proto::Diagnostic> {
    diagnostics
        .iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            } as i32,
            summary: d.summary.clone(),
            detail: d.detail.clone(),
            attribute: d.attribute.as_ref().map(attribute_path_to_proto),
        })
        .collect()
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => {
                        proto::attribute_path::step::Selector::AttributeName(name.clone())
                    }
                    AttributePathStep::ElementKeyString(key) => {
                        proto::attribute_path::step::Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => {
                        proto::attribute_path::step::Selector::ElementKeyInt(*idx)
                    }
                }),
            })
            .collect(),
    }
}

fn client_capabilities_from_proto(caps: &Option<proto::ClientCapabilities>) -> ClientCapabilities {
    match caps {
        Some(caps) => ClientCapabilities {
            deferral_allowed: caps.deferral_allowed,
            write_only_attributes_allowed: caps.write_only_attributes_allowed,
        },
        None => ClientCapabilities {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        },
    }
}

fn server_capabilities_to_proto(
    caps: &crate::types::ServerCapabilities,
) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: caps.plan_destroy,
        get_provider_schema_optional: caps.get_provider_schema_optional,
        move_resource_state: caps.move_resource_state,
    }
}

fn deferred_to_proto(deferred: &Deferred) -> proto::Deferred {
    proto::Deferred {
        reason: match deferred.reason {
            DeferredReason::Unknown => proto::deferred::Reason::Unknown,
            DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
            DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
            DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
        } as i32,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block.attributes.iter().map(attribute_to_proto).collect(),
        block_types: block
            .block_types
            .iter()
            .map(nested_block_to_proto)
            .collect(),
        description: block.description.clone(),
        description_kind: string_kind_to_proto(block.description_kind) as i32,
        deprecated: block.deprecated,
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        // An attribute carries either a flat type or a nested object type
        r#type: if attr.nested_type.is_some() {
            vec![]
        } else {
            attribute_type_to_bytes(&attr.r#type)
        },
        nested_type: attr.nested_type.as_ref().map(nested_type_to_proto),
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
    }
}

fn nested_block_to_proto(nested: &NestedBlock) -> proto::schema::NestedBlock {
    proto::schema::NestedBlock {
        type_name: nested.type_name.clone(),
        block: Some(block_to_proto(&nested.block)),
        nesting: match nested.nesting {
            NestingMode::Invalid => proto::schema::nested_block::NestingMode::Invalid,
            NestingMode::Single => proto::schema::nested_block::NestingMode::Single,
            NestingMode::List => proto::schema::nested_block::NestingMode::List,
            NestingMode::Set => proto::schema::nested_block::NestingMode::Set,
            NestingMode::Map => proto::schema::nested_block::NestingMode::Map,
            NestingMode::Group => proto::schema::nested_block::NestingMode::Group,
        } as i32,
        min_items: nested.min_items,
        max_items: nested.max_items,
    }
}

fn nested_type_to_proto(nested: &NestedType) -> proto::schema::Object {
    proto::schema::Object {
        attributes: nested.attributes.iter().map(attribute_to_proto).collect(),
        nesting: match nested.nesting {
            ObjectNestingMode::Invalid => proto::schema::object::NestingMode::Invalid,
            ObjectNestingMode::Single => proto::schema::object::NestingMode::Single,
            ObjectNestingMode::List => proto::schema::object::NestingMode::List,
            ObjectNestingMode::Set => proto::schema::object::NestingMode::Set,
            ObjectNestingMode::Map => proto::schema::object::NestingMode::Map,
        } as i32,
    }
}

fn string_kind_to_proto(kind: StringKind) -> proto::StringKind {
    match kind {
        StringKind::Plain => proto::StringKind::Plain,
        StringKind::Markdown => proto::StringKind::Markdown,
    }
}

/// Encodes an attribute type as the JSON type constraint Terraform expects
/// in the schema wire format; object attribute order is sorted so the
/// encoding is deterministic
fn attribute_type_to_bytes(attr_type: &AttributeType) -> Vec<u8> {
    match attr_type {
        AttributeType::String => b"\"string\"".to_vec(),
        AttributeType::Number => b"\"number\"".to_vec(),
        AttributeType::Bool => b"\"bool\"".to_vec(),
        AttributeType::List(elem) => format!(
            "[\"list\", {}]",
            String::from_utf8_lossy(&attribute_type_to_bytes(elem))
        )
        .into_bytes(),
        AttributeType::Set(elem) => format!(
            "[\"set\", {}]",
            String::from_utf8_lossy(&attribute_type_to_bytes(elem))
        )
        .into_bytes(),
        AttributeType::Map(elem) => format!(
            "[\"map\", {}]",
            String::from_utf8_lossy(&attribute_type_to_bytes(elem))
        )
        .into_bytes(),
        AttributeType::Object(attrs) => {
            let mut names: Vec<&String> = attrs.keys().collect();
            names.sort();
            let fields: Vec<String> = names
                .iter()
                .map(|name| {
                    format!(
                        "\"{}\": {}",
                        name,
                        String::from_utf8_lossy(&attribute_type_to_bytes(&attrs[*name]))
                    )
                })
                .collect();
            format!("[\"object\", {{{}}}]", fields.join(", ")).into_bytes()
        }
    }
}
