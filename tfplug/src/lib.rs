//! Terraform Plugin Framework for Rust
//!
//! Implements the provider side of the Terraform Plugin Protocol v6: a
//! tonic gRPC server behind `serve`, msgpack value codecs, and async traits
//! for providers, resources and data sources. A provider binary builds its
//! `Provider` impl and hands it to [`serve`]; everything else (handshake,
//! TLS, schema wiring, plan defaults) is framework concern.

pub mod context;
pub mod error;
pub mod schema;
pub mod types;

pub mod data_source;
pub mod provider;
pub mod resource;

pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

pub mod grpc;
pub mod proto;
pub mod server;

pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithModifyPlan};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, serve_default, LogLevel, ServerConfig};
pub use types::{Dynamic, DynamicValue, PrivateStateData};

/// Expands to a `main` that serves the provider, for binaries with no setup
/// of their own
#[macro_export]
macro_rules! serve_provider {
    ($provider:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve($provider, $crate::ServerConfig::default()).await
        }
    };
    ($provider:expr, $config:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve($provider, $config).await
        }
    };
}
