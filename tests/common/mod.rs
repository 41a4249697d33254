//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::Value;
use useradmin::config::AdminConfig;
use useradmin::server::{EntityStores, ServerBuilder};

/// Server over fresh in-memory collections with the default configuration
pub async fn server() -> TestServer {
    let router = ServerBuilder::new().build().await.unwrap();
    TestServer::new(router)
}

/// Server over the given collections and configuration
pub async fn server_with(config: AdminConfig, stores: EntityStores) -> TestServer {
    let router = ServerBuilder::new()
        .with_config(config)
        .with_stores(stores)
        .build()
        .await
        .unwrap();
    TestServer::new(router)
}

/// POST `body` and return the rendered document
pub async fn create(server: &TestServer, path: &str, body: Value) -> Value {
    let response = server.post(path).json(&body).await;
    response.assert_status_ok();
    response.json()
}

/// The root role as rendered by `GET /roles/{id}`
pub async fn root_role(server: &TestServer) -> Value {
    let list: Value = server
        .get("/roles")
        .add_query_param("filters", "kind==root")
        .await
        .json();
    let id = list[0]["id"].as_str().unwrap().to_string();
    server.get(&format!("/roles/{}", id)).await.json()
}

/// Names of the embedded permissions of a rendered role
pub fn permission_names(role: &Value) -> Vec<String> {
    role["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}
