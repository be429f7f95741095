//! Custom alert rule resources

pub mod resource_custom_discovery_alert;
pub mod resource_custom_sonar_alert;

pub use resource_custom_discovery_alert::CustomDiscoveryAlertResource;
pub use resource_custom_sonar_alert::CustomSonarAlertResource;
