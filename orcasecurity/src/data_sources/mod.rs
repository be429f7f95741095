//! Data source implementations

pub mod data_source_custom_role;
pub mod data_source_group;
pub mod data_source_jira_template;
pub mod data_source_shift_left_project;
pub mod data_source_user;

pub use data_source_custom_role::CustomRoleDataSource;
pub use data_source_group::GroupDataSource;
pub use data_source_jira_template::JiraTemplateDataSource;
pub use data_source_shift_left_project::ShiftLeftProjectDataSource;
pub use data_source_user::UserDataSource;
