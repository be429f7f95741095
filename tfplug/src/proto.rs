//! Generated protocol types for the Terraform Plugin Protocol v6
//!
//! tonic-build compiles `proto/tfplugin6.proto` at build time; this module
//! includes the output and re-exports the service trait. Several generated
//! names collide with framework types (`DynamicValue`, `Diagnostic`,
//! `AttributePath`, `Schema`), so call sites keep the `proto::` prefix.
//!
//! Generated layout: top-level messages become structs, each RPC gets a
//! snake_case module with nested `Request`/`Response` types
//! (`read_resource::Response`), and nested enums live in sub-modules
//! (`diagnostic::Severity`).

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
