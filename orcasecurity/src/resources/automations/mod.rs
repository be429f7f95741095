//! Automation resources

pub mod actions;
pub mod resource_automation;
pub mod resource_automation_v2;

pub use resource_automation::AutomationResource;
pub use resource_automation_v2::AutomationV2Resource;
