//! Resource implementations

use tfplug::schema::{Attribute, Block, NestedBlock, NestingMode, StringKind};
use tfplug::types::Dynamic;

pub mod alerts;
pub mod automations;
pub mod dashboards;
pub mod discovery;
pub mod organization;
pub mod rbac;
pub mod shiftleft;

pub use alerts::{CustomDiscoveryAlertResource, CustomSonarAlertResource};
pub use automations::{AutomationResource, AutomationV2Resource};
pub use dashboards::{CustomDashboardResource, CustomWidgetResource};
pub use discovery::DiscoveryViewResource;
pub use organization::{BusinessUnitResource, TrustedCloudAccountResource, WebhookResource};
pub use rbac::{CustomRoleResource, GroupPermissionResource, GroupResource};
pub use shiftleft::{ShiftLeftCveExceptionListResource, ShiftLeftProjectResource};

/// Optional block that appears at most once
pub(crate) fn single_block(type_name: &str, attributes: Vec<Attribute>) -> NestedBlock {
    NestedBlock {
        type_name: type_name.to_string(),
        block: Block {
            version: 0,
            attributes,
            block_types: vec![],
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        },
        nesting: NestingMode::Single,
        min_items: 0,
        max_items: 1,
    }
}

/// Repeated block; `min_items` of zero means the block is optional
pub(crate) fn list_block(type_name: &str, attributes: Vec<Attribute>, min_items: i64) -> NestedBlock {
    NestedBlock {
        type_name: type_name.to_string(),
        block: Block {
            version: 0,
            attributes,
            block_types: vec![],
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        },
        nesting: NestingMode::List,
        min_items,
        max_items: 0,
    }
}

/// Collects the string elements of a decoded list, skipping anything else
pub(crate) fn string_list(values: Vec<Dynamic>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Dynamic::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

pub(crate) fn dynamic_string_list(values: Vec<String>) -> Vec<Dynamic> {
    values.into_iter().map(Dynamic::String).collect()
}

/// String entry of a decoded block element
pub(crate) fn map_string(map: &std::collections::HashMap<String, Dynamic>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Dynamic::String(s)) => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn map_bool(map: &std::collections::HashMap<String, Dynamic>, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(Dynamic::Bool(b)) => Some(*b),
        _ => None,
    }
}
