//! Helpers for `terraform import` handlers.

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Seed imported state with the practitioner-supplied ID at `attr_path`.
///
/// Covers the common case where the import ID is the resource's own ID.
/// Terraform follows the import with a read, which fills in the rest of
/// the attributes.
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{:?}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    #[test]
    fn passthrough_sets_id_attribute() {
        let ctx = Context::new();
        let request = ImportResourceStateRequest {
            type_name: "orcasecurity_automation".to_string(),
            id: "d290f1ee-6c54-4b01-90e6-d701748f0851".to_string(),
            client_capabilities: ClientCapabilities {
                deferral_allowed: false,
                write_only_attributes_allowed: false,
            },
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let imported = &response.imported_resources[0];
        assert_eq!(imported.type_name, "orcasecurity_automation");
        assert_eq!(
            imported
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "d290f1ee-6c54-4b01-90e6-d701748f0851"
        );
    }
}
