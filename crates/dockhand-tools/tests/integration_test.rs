//! Integration tests for tool dispatch against a mock registry.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dockhand_registry::{
    CredentialVault, HubConfig, RegistryClient, SecretCipher, SqliteCredentialStore, VaultKey,
};
use dockhand_tools::{definitions, HubTools, ToolServer, CREDENTIALS_VERIFIED};

async fn tools() -> (MockServer, HubTools) {
    let server = MockServer::start().await;
    let store = Arc::new(SqliteCredentialStore::in_memory().unwrap());
    let vault = CredentialVault::new(store, SecretCipher::new(&VaultKey::generate()).unwrap());
    let config = HubConfig::new()
        .with_hub_url(server.uri())
        .with_auth_url(server.uri())
        .with_registry_url(server.uri());
    let client = RegistryClient::new(config, vault).unwrap();
    (server, HubTools::new(client))
}

#[tokio::test]
async fn test_verify_credentials_tool() {
    let (_server, tools) = tools().await;
    tools
        .client()
        .broker()
        .vault()
        .save("alice", "dckr_pat_1")
        .await
        .unwrap();

    let ok = tools
        .call("verify_credentials", json!({ "username": " alice ", "pat": "dckr_pat_1" }))
        .await;
    assert!(!ok.is_error);
    assert_eq!(ok.text, CREDENTIALS_VERIFIED);

    let rejected = tools
        .call("verify_credentials", json!({ "username": "alice", "pat": "wrong" }))
        .await;
    assert!(rejected.is_error);
    assert!(rejected.text.starts_with("Error: Authentication failed"));

    let empty = tools
        .call("verify_credentials", json!({ "username": "", "pat": "x" }))
        .await;
    assert!(empty.text.starts_with("Error: Invalid input"));
}

#[tokio::test]
async fn test_search_images_text() {
    let (server, tools) = tools().await;
    Mock::given(method("GET"))
        .and(path("/v2/search/repositories/"))
        .and(query_param("query", "redis"))
        .and(query_param("page_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "repo_name": "redis" }, { "repo_name": "bitnami/redis" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools
        .call("search_images", json!({ "query": "redis", "limit": 2 }))
        .await;
    assert!(!output.is_error);
    assert_eq!(
        output.text,
        r#"Found 2 images: {"repo_name":"redis"}, {"repo_name":"bitnami/redis"}"#
    );
}

#[tokio::test]
async fn test_list_tags_with_legacy_field_names() {
    let (server, tools) = tools().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/redis/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "name": "latest" }, { "name": "7.2-alpine" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools
        .call(
            "list_tags",
            json!({ "imageName": "redis", "isOffical": true, "pat": "session" }),
        )
        .await;
    assert_eq!(output.text, "Found 2 tags: latest, 7.2-alpine");
}

#[tokio::test]
async fn test_get_manifest_summarizes() {
    let (server, tools) = tools().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "pull" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/library/alpine/manifests/3.20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "manifests": [{
                "digest": "sha256:aaa",
                "size": 528,
                "platform": { "architecture": "amd64", "os": "linux" }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools
        .call(
            "get_manifest",
            json!({ "imageName": "alpine", "isOfficial": true, "tag": "3.20", "username": "alice" }),
        )
        .await;
    assert!(!output.is_error, "{}", output.text);

    let parsed: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(
        parsed,
        json!([{
            "digest": "sha256:aaa",
            "architecture": "amd64",
            "os": "linux",
            "variant": "",
            "size": 528,
            "version": "N/A"
        }])
    );
}

#[tokio::test]
async fn test_analyze_layers_requires_digest() {
    let (_server, tools) = tools().await;
    let output = tools
        .call(
            "analyze_layers",
            json!({ "imageName": "alpine", "isOfficial": true, "digest": "latest", "username": "alice" }),
        )
        .await;
    assert!(output.is_error);
    assert!(output.text.starts_with("Error: Invalid input"));
}

#[tokio::test]
async fn test_upstream_error_rendered() {
    let (server, tools) = tools().await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/library/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("object not found"))
        .mount(&server)
        .await;

    let output = tools
        .call("get_image_details", json!({ "imageName": "ghost", "isOfficial": true }))
        .await;
    assert!(output.is_error);
    assert_eq!(
        output.text,
        "Error: Upstream error from registry: 404 - object not found"
    );
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let (_server, tools) = tools().await;

    let unknown = tools.call("docker_pull", json!({})).await;
    assert_eq!(unknown.text, "Error: Unknown tool: docker_pull");

    let bad = tools.call("list_tags", json!({ "isOfficial": true })).await;
    assert!(bad.is_error);
    assert!(bad.text.contains("Invalid arguments for list_tags"));
}

#[test]
fn test_every_definition_dispatches() {
    let names: Vec<_> = definitions().iter().map(|d| d.name).collect();
    assert_eq!(
        names,
        [
            "verify_credentials",
            "search_images",
            "get_image_details",
            "list_tags",
            "get_manifest",
            "analyze_layers",
            "list_repositories",
        ]
    );
}

#[tokio::test]
async fn test_server_reuses_cache_across_calls() {
    let (server, tools) = tools().await;
    Mock::given(method("GET"))
        .and(path("/v2/search/repositories/"))
        .and(query_param("query", "redis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "repo_name": "redis" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let call = json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": { "name": "search_images", "arguments": { "query": "redis" } }
    });
    let mut input = String::new();
    for id in 1..=2 {
        let mut request = call.clone();
        request["id"] = json!(id);
        input.push_str(&request.to_string());
        input.push('\n');
    }

    let mut output = Vec::new();
    ToolServer::new(tools)
        .serve(tokio::io::BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    for (response, id) in responses.iter().zip(1..) {
        assert_eq!(response["id"], id);
        assert_eq!(response["result"]["isError"], false);
        assert_eq!(
            response["result"]["content"][0]["text"],
            r#"Found 1 images: {"repo_name":"redis"}"#
        );
    }
}
