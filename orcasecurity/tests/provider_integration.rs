//! Provider lifecycle tests driven through the factory maps, the same way
//! the plugin server wires requests to resources at runtime.

use futures::future::join_all;
use mockito::{Matcher, Server};
use orcasecurity::OrcaProvider;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, ClientCapabilities, DynamicValue};

fn capabilities() -> ClientCapabilities {
    ClientCapabilities {
        deferral_allowed: false,
        write_only_attributes_allowed: false,
    }
}

fn configure_request(endpoint: String, token: &str) -> ConfigureProviderRequest {
    let mut config = DynamicValue::null();
    let _ = config.set_string(&AttributePath::new("api_endpoint"), endpoint);
    let _ = config.set_string(&AttributePath::new("api_token"), token.to_string());

    ConfigureProviderRequest {
        terraform_version: "1.9.0".to_string(),
        config,
        client_capabilities: capabilities(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_configures_and_reads_user_data_source() {
    let mut server = Server::new_async().await;

    let users_mock = server
        .mock("GET", "/api/users")
        .match_header("authorization", "Token secret-token")
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {"users": [
                {"id": "usr-1", "email": "alice@example.com",
                 "first_name": "Alice", "last_name": "Rivera"},
                {"id": "usr-2", "email": "bob@example.com",
                 "first_name": "Bob", "last_name": "Chen"}
            ]}}"#,
        )
        .create_async()
        .await;

    let mut provider = OrcaProvider::new();
    let configure_response = provider
        .configure(Context::new(), configure_request(server.url(), "secret-token"))
        .await;
    assert!(configure_response.diagnostics.is_empty());
    assert!(configure_response.provider_data.is_some());

    let factories = provider.data_sources();
    let factory = factories.get("orcasecurity_user").unwrap();
    let mut user_ds = factory();

    let configure_ds_response = user_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;
    assert!(configure_ds_response.diagnostics.is_empty());

    let mut ds_config = DynamicValue::null();
    ds_config
        .set_string(&AttributePath::new("email"), "bob@example.com".to_string())
        .unwrap();

    let read_response = user_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "orcasecurity_user".to_string(),
                config: ds_config,
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    users_mock.assert_async().await;
    assert!(read_response.diagnostics.is_empty());
    let state = read_response.state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "usr-2");
    assert_eq!(
        state.get_string(&AttributePath::new("first_name")).unwrap(),
        "Bob"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn group_resource_create_read_update_delete() {
    let mut server = Server::new_async().await;

    let create_mock = server
        .mock("POST", "/api/rbac/groups")
        .match_header("authorization", "Token secret-token")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "platform-team",
            "sso_group": false,
        })))
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {
                "id": "grp-9",
                "name": "platform-team",
                "sso_group": false,
                "users": []
            }}"#,
        )
        .create_async()
        .await;

    let read_mock = server
        .mock("GET", "/api/rbac/groups/grp-9")
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {
                "id": "grp-9",
                "name": "platform-team",
                "sso_group": false,
                "users": ["usr-1"]
            }}"#,
        )
        .create_async()
        .await;

    let update_mock = server
        .mock("PUT", "/api/rbac/groups/grp-9")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "platform-team",
            "description": "Owns shared infrastructure",
        })))
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {
                "id": "grp-9",
                "name": "platform-team",
                "description": "Owns shared infrastructure",
                "sso_group": false,
                "users": ["usr-1"]
            }}"#,
        )
        .create_async()
        .await;

    let delete_mock = server
        .mock("DELETE", "/api/rbac/groups/grp-9")
        .with_status(200)
        .with_body(r#"{"status": "success"}"#)
        .create_async()
        .await;

    let mut provider = OrcaProvider::new();
    let configure_response = provider
        .configure(Context::new(), configure_request(server.url(), "secret-token"))
        .await;
    assert!(configure_response.diagnostics.is_empty());

    let factories = provider.resources();
    let factory = factories.get("orcasecurity_group").unwrap();
    let mut group = factory();

    let configure_res_response = group
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;
    assert!(configure_res_response.diagnostics.is_empty());

    let mut config = DynamicValue::null();
    config
        .set_string(&AttributePath::new("name"), "platform-team".to_string())
        .unwrap();
    config
        .set_bool(&AttributePath::new("sso_group"), false)
        .unwrap();

    let create_response = group
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "orcasecurity_group".to_string(),
                planned_state: config.clone(),
                config: config.clone(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    create_mock.assert_async().await;
    assert!(create_response.diagnostics.is_empty());
    let created = create_response.new_state;
    assert_eq!(
        created.get_string(&AttributePath::new("id")).unwrap(),
        "grp-9"
    );

    let read_response = group
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "orcasecurity_group".to_string(),
                current_state: created.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    read_mock.assert_async().await;
    assert!(read_response.diagnostics.is_empty());
    let refreshed = read_response.new_state.unwrap();
    assert_eq!(
        refreshed.get_list(&AttributePath::new("users")).unwrap().len(),
        1
    );

    let mut planned = refreshed.clone();
    planned
        .set_string(
            &AttributePath::new("description"),
            "Owns shared infrastructure".to_string(),
        )
        .unwrap();

    let update_response = group
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "orcasecurity_group".to_string(),
                prior_state: refreshed.clone(),
                planned_state: planned.clone(),
                config: planned,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    update_mock.assert_async().await;
    assert!(update_response.diagnostics.is_empty());
    assert_eq!(
        update_response
            .new_state
            .get_string(&AttributePath::new("description"))
            .unwrap(),
        "Owns shared infrastructure"
    );

    let delete_response = group
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "orcasecurity_group".to_string(),
                prior_state: update_response.new_state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    delete_mock.assert_async().await;
    assert!(delete_response.diagnostics.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn import_feeds_state_into_the_next_read() {
    let mut server = Server::new_async().await;

    let get_mock = server
        .mock("GET", "/api/shiftleft/projects/slp-3")
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {
                "id": "slp-3",
                "name": "Backend",
                "key": "backend",
                "default_policies": true
            }}"#,
        )
        .create_async()
        .await;

    let mut provider = OrcaProvider::new();
    let configure_response = provider
        .configure(Context::new(), configure_request(server.url(), "secret-token"))
        .await;
    assert!(configure_response.diagnostics.is_empty());

    let factories = provider.resources();
    let factory = factories.get("orcasecurity_shift_left_project").unwrap();
    let mut project = factory();

    let configure_res_response = project
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;
    assert!(configure_res_response.diagnostics.is_empty());

    let importer = project.as_import_state().unwrap();
    let import_response = importer
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "orcasecurity_shift_left_project".to_string(),
                id: "slp-3".to_string(),
                client_capabilities: capabilities(),
            },
        )
        .await;

    assert!(import_response.diagnostics.is_empty());
    assert_eq!(import_response.imported_resources.len(), 1);
    let imported = &import_response.imported_resources[0];
    assert_eq!(
        imported.state.get_string(&AttributePath::new("id")).unwrap(),
        "slp-3"
    );

    // Terraform refreshes imported state with a read before showing it
    let read_response = project
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "orcasecurity_shift_left_project".to_string(),
                current_state: imported.state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    get_mock.assert_async().await;
    assert!(read_response.diagnostics.is_empty());
    let state = read_response.new_state.unwrap();
    assert_eq!(
        state.get_string(&AttributePath::new("key")).unwrap(),
        "backend"
    );
    assert!(state.get_bool(&AttributePath::new("default_policies")).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn data_source_rejects_missing_provider_data() {
    let provider = OrcaProvider::new();
    let factories = provider.data_sources();
    let factory = factories.get("orcasecurity_user").unwrap();
    let mut user_ds = factory();

    let configure_response = user_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: None,
            },
        )
        .await;
    assert_eq!(configure_response.diagnostics.len(), 1);
    assert_eq!(configure_response.diagnostics[0].summary, "No provider data");

    let mut ds_config = DynamicValue::null();
    ds_config
        .set_string(&AttributePath::new("email"), "alice@example.com".to_string())
        .unwrap();

    let read_response = user_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "orcasecurity_user".to_string(),
                config: ds_config,
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    assert!(!read_response.diagnostics.is_empty());
    assert_eq!(
        read_response.diagnostics[0].summary,
        "Provider not configured"
    );
    assert!(read_response.state.is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_lookups_share_one_client() {
    let mut server = Server::new_async().await;

    let users_mock = server
        .mock("GET", "/api/users")
        .with_status(200)
        .with_body(
            r#"{"status": "success", "data": {"users": [
                {"id": "usr-1", "email": "alice@example.com",
                 "first_name": "Alice", "last_name": "Rivera"}
            ]}}"#,
        )
        .expect(3)
        .create_async()
        .await;

    let mut provider = OrcaProvider::new();
    let configure_response = provider
        .configure(Context::new(), configure_request(server.url(), "secret-token"))
        .await;
    assert!(configure_response.diagnostics.is_empty());

    let factories = provider.data_sources();
    let factory = factories.get("orcasecurity_user").unwrap();

    let mut reads = vec![];
    for _ in 0..3 {
        let mut user_ds = factory();
        let provider_data = configure_response.provider_data.clone();
        reads.push(async move {
            user_ds
                .configure(
                    Context::new(),
                    ConfigureDataSourceRequest { provider_data },
                )
                .await;

            let mut ds_config = DynamicValue::null();
            ds_config
                .set_string(&AttributePath::new("email"), "alice@example.com".to_string())
                .unwrap();

            user_ds
                .read(
                    Context::new(),
                    ReadDataSourceRequest {
                        type_name: "orcasecurity_user".to_string(),
                        config: ds_config,
                        provider_meta: None,
                        client_capabilities: capabilities(),
                    },
                )
                .await
        });
    }

    let responses = join_all(reads).await;

    users_mock.assert_async().await;
    for response in responses {
        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.get_string(&AttributePath::new("id")).unwrap(),
            "usr-1"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn auth_failure_surfaces_as_diagnostic() {
    let mut server = Server::new_async().await;

    let _users_mock = server
        .mock("GET", "/api/users")
        .with_status(401)
        .with_body(r#"{"error": "invalid token"}"#)
        .create_async()
        .await;

    let mut provider = OrcaProvider::new();
    let configure_response = provider
        .configure(Context::new(), configure_request(server.url(), "bad-token"))
        .await;
    // Configure only builds the client; the API rejects the token on first use
    assert!(configure_response.diagnostics.is_empty());

    let factories = provider.data_sources();
    let factory = factories.get("orcasecurity_user").unwrap();
    let mut user_ds = factory();

    user_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;

    let mut ds_config = DynamicValue::null();
    ds_config
        .set_string(&AttributePath::new("email"), "alice@example.com".to_string())
        .unwrap();

    let read_response = user_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "orcasecurity_user".to_string(),
                config: ds_config,
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    assert!(!read_response.diagnostics.is_empty());
    assert_eq!(read_response.diagnostics[0].summary, "Failed to list users");
    assert!(read_response.state.is_null());
}
