//! RBAC resources: custom roles, groups and group permissions

pub mod resource_custom_role;
pub mod resource_group;
pub mod resource_group_permission;

pub use resource_custom_role::CustomRoleResource;
pub use resource_group::GroupResource;
pub use resource_group_permission::GroupPermissionResource;
