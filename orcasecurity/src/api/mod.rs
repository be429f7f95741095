//! Orca Security REST API client
//!
//! `Client` owns the HTTP connection pool and auth header; typed endpoint
//! wrappers hang off accessor methods (`client.automations()`,
//! `client.rbac().roles()`, ...). All calls go through the retry layer in
//! `client.rs`.

pub mod alerts;
pub mod automations;
pub mod business_units;
pub mod client;
pub mod common;
pub mod dashboards;
pub mod discovery;
pub mod error;
pub mod integrations;
pub mod pool;
pub mod rbac;
pub mod shiftleft;
pub mod sonar;
pub mod trusted_accounts;
pub mod users;
pub mod webhooks;
pub mod widgets;

pub use client::{Client, RetryConfig};
pub use common::{ApiQueryParams, ApiResponse};
pub use error::ApiError;
