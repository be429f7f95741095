//! Discovery resources

pub mod resource_discovery_view;

pub use resource_discovery_view::DiscoveryViewResource;
