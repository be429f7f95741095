//! Action payload assembly shared by the v1 and v2 automation resources
//!
//! Each action type has its own optional config block. Blocks are visited in
//! a fixed order, so a given configuration always produces the same action
//! list. The v2 API additionally scopes every action with
//! `organization_level`.

use serde_json::json;
use std::collections::HashMap;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedBlock};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::automations::{
    AutomationAction, ACTION_TYPE_AZURE_DEVOPS, ACTION_TYPE_EMAIL, ACTION_TYPE_JIRA_ISSUE,
    ACTION_TYPE_OPSGENIE, ACTION_TYPE_PAGER_DUTY, ACTION_TYPE_SERVICENOW, ACTION_TYPE_SLACK,
    ACTION_TYPE_SPLUNK, ACTION_TYPE_SUMOLOGIC, ACTION_TYPE_WEBHOOK,
};
use crate::resources::{single_block, string_list};

/// Schema blocks for every supported action type, in dispatch order.
///
/// `organization_level` adds the per-action scoping attribute the v2 API
/// understands.
pub(crate) fn action_blocks(organization_level: bool) -> Vec<NestedBlock> {
    let extend = |mut attrs: Vec<Attribute>| {
        if organization_level {
            attrs.push(
                AttributeBuilder::new("organization_level", AttributeType::Bool)
                    .description("Run the action at the organization level")
                    .optional()
                    .build(),
            );
        }
        attrs
    };

    vec![
        single_block(
            "jira_issue",
            extend(vec![
                AttributeBuilder::new("template_name", AttributeType::String)
                    .description("Jira template used to open the issue")
                    .required()
                    .build(),
                AttributeBuilder::new("parent_issue", AttributeType::String)
                    .description("Issue key the new issue is filed under")
                    .optional()
                    .build(),
            ]),
        ),
        single_block(
            "email",
            extend(vec![
                AttributeBuilder::new(
                    "recipients",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Addresses the notification goes to")
                .required()
                .build(),
                AttributeBuilder::new("include_details", AttributeType::Bool)
                    .description("Attach the full alert details")
                    .optional()
                    .build(),
            ]),
        ),
        single_block(
            "slack",
            extend(vec![AttributeBuilder::new("channel", AttributeType::String)
                .description("Slack channel the notification posts to")
                .required()
                .build()]),
        ),
        single_block(
            "pager_duty",
            extend(vec![AttributeBuilder::new(
                "service_name",
                AttributeType::String,
            )
            .description("PagerDuty service the incident opens on")
            .required()
            .build()]),
        ),
        single_block(
            "opsgenie",
            extend(vec![AttributeBuilder::new("team_name", AttributeType::String)
                .description("Opsgenie team the alert routes to")
                .required()
                .build()]),
        ),
        single_block("sumologic", extend(vec![])),
        single_block("splunk", extend(vec![])),
        single_block(
            "webhook",
            extend(vec![AttributeBuilder::new("name", AttributeType::String)
                .description("Name of a configured webhook")
                .required()
                .build()]),
        ),
        single_block(
            "azure_devops",
            extend(vec![
                AttributeBuilder::new("template_name", AttributeType::String)
                    .description("Azure DevOps template used to open the work item")
                    .required()
                    .build(),
                AttributeBuilder::new("parent_item", AttributeType::String)
                    .description("Work item the new item is filed under")
                    .optional()
                    .build(),
            ]),
        ),
        single_block(
            "servicenow",
            extend(vec![AttributeBuilder::new(
                "template_name",
                AttributeType::String,
            )
            .description("ServiceNow template used to open the ticket")
            .required()
            .build()]),
        ),
    ]
}

/// Builds the action list from whichever blocks are present in the config.
///
/// Visits blocks in the same order as [`action_blocks`]; absent blocks
/// contribute nothing.
pub(crate) fn generate_actions(
    config: &DynamicValue,
    organization_level: bool,
) -> Result<Vec<AutomationAction>, Diagnostic> {
    let mut actions = vec![];

    if block_present(config, "jira_issue") {
        let mut data = json!({
            "template_name": require(config, "jira_issue", "template_name")?,
        });
        if let Some(parent) = optional(config, "jira_issue", "parent_issue") {
            data["parent_issue"] = json!(parent);
        }
        actions.push(action(
            ACTION_TYPE_JIRA_ISSUE,
            data,
            config,
            "jira_issue",
            organization_level,
        ));
    }

    if block_present(config, "email") {
        let recipients = config
            .get_list(&AttributePath::new("email").attribute("recipients"))
            .map(string_list)
            .map_err(|_| {
                Diagnostic::error(
                    "Invalid action",
                    "The 'email' block requires 'recipients'",
                )
            })?;
        let mut data = json!({ "recipients": recipients });
        if let Some(include) = optional_bool(config, "email", "include_details") {
            data["include_details"] = json!(include);
        }
        actions.push(action(
            ACTION_TYPE_EMAIL,
            data,
            config,
            "email",
            organization_level,
        ));
    }

    if block_present(config, "slack") {
        let data = json!({ "channel": require(config, "slack", "channel")? });
        actions.push(action(
            ACTION_TYPE_SLACK,
            data,
            config,
            "slack",
            organization_level,
        ));
    }

    if block_present(config, "pager_duty") {
        let data = json!({ "service_name": require(config, "pager_duty", "service_name")? });
        actions.push(action(
            ACTION_TYPE_PAGER_DUTY,
            data,
            config,
            "pager_duty",
            organization_level,
        ));
    }

    if block_present(config, "opsgenie") {
        let data = json!({ "team_name": require(config, "opsgenie", "team_name")? });
        actions.push(action(
            ACTION_TYPE_OPSGENIE,
            data,
            config,
            "opsgenie",
            organization_level,
        ));
    }

    if block_present(config, "sumologic") {
        actions.push(action(
            ACTION_TYPE_SUMOLOGIC,
            json!({}),
            config,
            "sumologic",
            organization_level,
        ));
    }

    if block_present(config, "splunk") {
        actions.push(action(
            ACTION_TYPE_SPLUNK,
            json!({}),
            config,
            "splunk",
            organization_level,
        ));
    }

    if block_present(config, "webhook") {
        let data = json!({ "name": require(config, "webhook", "name")? });
        actions.push(action(
            ACTION_TYPE_WEBHOOK,
            data,
            config,
            "webhook",
            organization_level,
        ));
    }

    if block_present(config, "azure_devops") {
        let mut data = json!({
            "template_name": require(config, "azure_devops", "template_name")?,
        });
        if let Some(parent) = optional(config, "azure_devops", "parent_item") {
            data["parent_item"] = json!(parent);
        }
        actions.push(action(
            ACTION_TYPE_AZURE_DEVOPS,
            data,
            config,
            "azure_devops",
            organization_level,
        ));
    }

    if block_present(config, "servicenow") {
        let data = json!({ "template_name": require(config, "servicenow", "template_name")? });
        actions.push(action(
            ACTION_TYPE_SERVICENOW,
            data,
            config,
            "servicenow",
            organization_level,
        ));
    }

    Ok(actions)
}

/// Maps API actions back into per-type block state.
///
/// Action types without a matching block surface a warning and stay managed
/// through the API only.
pub(crate) fn set_action_state(
    state: &mut DynamicValue,
    actions: Vec<AutomationAction>,
    organization_level: bool,
) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    for action in actions {
        let block = match action.action_type {
            ACTION_TYPE_JIRA_ISSUE => "jira_issue",
            ACTION_TYPE_EMAIL => "email",
            ACTION_TYPE_SLACK => "slack",
            ACTION_TYPE_PAGER_DUTY => "pager_duty",
            ACTION_TYPE_OPSGENIE => "opsgenie",
            ACTION_TYPE_SUMOLOGIC => "sumologic",
            ACTION_TYPE_SPLUNK => "splunk",
            ACTION_TYPE_WEBHOOK => "webhook",
            ACTION_TYPE_AZURE_DEVOPS => "azure_devops",
            ACTION_TYPE_SERVICENOW => "servicenow",
            other => {
                diagnostics.push(Diagnostic::warning(
                    "Unknown action type",
                    format!(
                        "Action type {} has no matching block and stays API-managed",
                        other
                    ),
                ));
                continue;
            }
        };

        let _ = state.set_map(&AttributePath::new(block), HashMap::new());
        match action.action_type {
            ACTION_TYPE_JIRA_ISSUE => {
                copy_string(state, &action.data, block, "template_name");
                copy_string(state, &action.data, block, "parent_issue");
            }
            ACTION_TYPE_EMAIL => {
                copy_string_list(state, &action.data, block, "recipients");
                copy_bool(state, &action.data, block, "include_details");
            }
            ACTION_TYPE_SLACK => copy_string(state, &action.data, block, "channel"),
            ACTION_TYPE_PAGER_DUTY => copy_string(state, &action.data, block, "service_name"),
            ACTION_TYPE_OPSGENIE => copy_string(state, &action.data, block, "team_name"),
            ACTION_TYPE_WEBHOOK => copy_string(state, &action.data, block, "name"),
            ACTION_TYPE_AZURE_DEVOPS => {
                copy_string(state, &action.data, block, "template_name");
                copy_string(state, &action.data, block, "parent_item");
            }
            ACTION_TYPE_SERVICENOW => copy_string(state, &action.data, block, "template_name"),
            // sumologic and splunk carry no data
            _ => {}
        }

        if organization_level {
            let _ = state.set_bool(
                &AttributePath::new(block).attribute("organization_level"),
                action.organization_level.unwrap_or(false),
            );
        }
    }

    diagnostics
}

fn block_present(config: &DynamicValue, block: &str) -> bool {
    config.get_map(&AttributePath::new(block)).is_ok()
}

fn require(config: &DynamicValue, block: &str, attr: &str) -> Result<String, Diagnostic> {
    config
        .get_string(&AttributePath::new(block).attribute(attr))
        .map_err(|_| {
            Diagnostic::error(
                "Invalid action",
                format!("The '{}' block requires '{}'", block, attr),
            )
        })
}

fn optional(config: &DynamicValue, block: &str, attr: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(block).attribute(attr))
        .ok()
}

fn optional_bool(config: &DynamicValue, block: &str, attr: &str) -> Option<bool> {
    config
        .get_bool(&AttributePath::new(block).attribute(attr))
        .ok()
}

fn action(
    action_type: i64,
    data: serde_json::Value,
    config: &DynamicValue,
    block: &str,
    organization_level: bool,
) -> AutomationAction {
    AutomationAction {
        action_type,
        data,
        organization_level: organization_level
            .then(|| optional_bool(config, block, "organization_level").unwrap_or(false)),
    }
}

fn copy_string(state: &mut DynamicValue, data: &serde_json::Value, block: &str, key: &str) {
    if let Some(value) = data.get(key).and_then(|v| v.as_str()) {
        let _ = state.set_string(
            &AttributePath::new(block).attribute(key),
            value.to_string(),
        );
    }
}

fn copy_bool(state: &mut DynamicValue, data: &serde_json::Value, block: &str, key: &str) {
    if let Some(value) = data.get(key).and_then(|v| v.as_bool()) {
        let _ = state.set_bool(&AttributePath::new(block).attribute(key), value);
    }
}

fn copy_string_list(state: &mut DynamicValue, data: &serde_json::Value, block: &str, key: &str) {
    if let Some(items) = data.get(key).and_then(|v| v.as_array()) {
        let list = items
            .iter()
            .filter_map(|v| v.as_str().map(|s| Dynamic::String(s.to_string())))
            .collect();
        let _ = state.set_list(&AttributePath::new(block).attribute(key), list);
    }
}
