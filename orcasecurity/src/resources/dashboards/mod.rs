//! Dashboard and widget resources

pub mod resource_custom_dashboard;
pub mod resource_custom_widget;

pub use resource_custom_dashboard::CustomDashboardResource;
pub use resource_custom_widget::CustomWidgetResource;
