//! Organization settings resources

pub mod resource_business_unit;
pub mod resource_trusted_cloud_account;
pub mod resource_webhook;

pub use resource_business_unit::BusinessUnitResource;
pub use resource_trusted_cloud_account::TrustedCloudAccountResource;
pub use resource_webhook::WebhookResource;
