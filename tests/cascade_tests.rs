//! Permission cascade behavior observed through the REST surface and the host

mod common;

use axum::http::StatusCode;
use common::{create, permission_names, root_role, server, server_with};
use serde_json::{Value, json};
use std::sync::Arc;
use useradmin::config::AdminConfig;
use useradmin::entities::Role;
use useradmin::server::{EntityStores, ServerBuilder};

#[tokio::test]
async fn test_root_role_exists_at_startup() {
    let server = server().await;
    let root = root_role(&server).await;
    assert_eq!(root["name"], "root");
    assert_eq!(root["kind"], "root");
    assert_eq!(root["permissions"], json!([]));
}

#[tokio::test]
async fn test_assignment_propagates_to_root() {
    let server = server().await;
    create(
        &server,
        "/roles",
        json!({ "name": "editor", "permissions": ["posts.read", "posts.write"] }),
    )
    .await;

    let root = root_role(&server).await;
    assert_eq!(permission_names(&root), vec!["posts.read", "posts.write"]);
}

#[tokio::test]
async fn test_permission_created_once_on_demand() {
    let server = server().await;
    create(&server, "/roles", json!({ "name": "a", "permissions": ["shared"] })).await;
    create(&server, "/roles", json!({ "name": "b", "permissions": ["shared"] })).await;

    let items: Vec<Value> = server
        .get("/permissions")
        .add_query_param("filters", "name==shared")
        .await
        .json();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_existing_permission_is_reused() {
    let server = server().await;
    let permission = create(&server, "/permissions", json!({ "name": "reports" })).await;
    let role = create(&server, "/roles", json!({ "name": "a", "permissions": ["reports"] })).await;

    let read: Value = server
        .get(&format!("/roles/{}", role["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(read["permissions"][0]["id"], permission["id"]);
}

#[tokio::test]
async fn test_revoke_keeps_root_monotonic() {
    let server = server().await;
    let role = create(
        &server,
        "/roles",
        json!({ "name": "editor", "permissions": ["posts.read", "posts.write"] }),
    )
    .await;
    let path = format!("/roles/{}", role["id"].as_str().unwrap());

    let updated: Value = server
        .put(&path)
        .json(&json!({ "permissions": ["posts.read"] }))
        .await
        .json();
    assert_eq!(permission_names(&updated), vec!["posts.read"]);

    let root = root_role(&server).await;
    assert_eq!(permission_names(&root), vec!["posts.read", "posts.write"]);
}

#[tokio::test]
async fn test_revoking_from_root_is_ignored() {
    let server = server().await;
    create(&server, "/roles", json!({ "name": "editor", "permissions": ["a"] })).await;

    let root = root_role(&server).await;
    let path = format!("/roles/{}", root["id"].as_str().unwrap());
    server
        .put(&path)
        .json(&json!({ "permissions": [] }))
        .await
        .assert_status_ok();

    assert_eq!(permission_names(&root_role(&server).await), vec!["a"]);
}

#[tokio::test]
async fn test_role_update_without_permissions_keeps_them() {
    let server = server().await;
    let role = create(&server, "/roles", json!({ "name": "editor", "permissions": ["a"] })).await;
    let path = format!("/roles/{}", role["id"].as_str().unwrap());

    let updated: Value = server
        .put(&path)
        .json(&json!({ "description": "edits things" }))
        .await
        .json();
    assert_eq!(updated["description"], "edits things");
    assert_eq!(permission_names(&updated), vec!["a"]);
}

#[tokio::test]
async fn test_new_user_gets_default_role() {
    let stores = EntityStores::in_memory();
    stores.roles.save(Role::named("member")).await.unwrap();
    let config = AdminConfig {
        default_role: Some("member".to_string()),
        ..AdminConfig::default()
    };
    let server = server_with(config, stores).await;

    let user = create(
        &server,
        "/users",
        json!({ "username": "jdoe", "email": "jdoe@example.com", "password": "s3cret-pass" }),
    )
    .await;
    assert_eq!(user["role"]["name"], "member");
}

#[tokio::test]
async fn test_user_without_default_role_has_none() {
    let server = server().await;
    let user = create(
        &server,
        "/users",
        json!({ "username": "jdoe", "email": "jdoe@example.com", "password": "s3cret-pass" }),
    )
    .await;
    assert_eq!(user["role"], Value::Null);
}

#[tokio::test]
async fn test_user_with_unknown_role_is_rejected() {
    let server = server().await;
    let response = server
        .post("/users")
        .json(&json!({
            "username": "jdoe",
            "email": "jdoe@example.com",
            "password": "s3cret-pass",
            "role": "507f1f77bcf86cd799439011"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "role");
    assert_eq!(body["errors"][0]["type"], "reference");
}

#[tokio::test]
async fn test_concurrent_assignments_all_reach_root() {
    let host = Arc::new(ServerBuilder::new().build_host().await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let host = host.clone();
        tasks.push(tokio::spawn(async move {
            let role = host
                .stores
                .roles
                .save(Role::named(format!("role-{}", i)))
                .await
                .unwrap();
            host.cascade
                .assign_permission(&role, &format!("perm-{}", i))
                .await
                .unwrap();
            host.cascade.assign_permission(&role, "shared").await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let root = host.cascade.root_role().await.unwrap();
    let mut names = host.cascade.permission_names(&root).await.unwrap();
    names.sort();

    let mut expected: Vec<String> = (0..8).map(|i| format!("perm-{}", i)).collect();
    expected.push("shared".to_string());
    expected.sort();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_root_role_cannot_be_deleted() {
    let server = server().await;
    create(&server, "/roles", json!({ "name": "editor", "permissions": ["a", "b"] })).await;
    let root = root_role(&server).await;

    let response = server
        .delete(&format!("/roles/{}", root["id"].as_str().unwrap()))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["type"], "builtIn");

    create(&server, "/roles", json!({ "name": "viewer", "permissions": ["c"] })).await;
    let after = root_role(&server).await;
    assert_eq!(after["id"], root["id"]);
    assert_eq!(permission_names(&after), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_root_name_is_reserved_for_other_roles() {
    let server = server().await;

    let response = server.post("/roles").json(&json!({ "name": "root" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["type"], "reserved");

    let editor = create(&server, "/roles", json!({ "name": "editor" })).await;
    server
        .put(&format!("/roles/{}", editor["id"].as_str().unwrap()))
        .json(&json!({ "name": "root" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    create(&server, "/roles", json!({ "name": "viewer", "permissions": ["a"] })).await;
    assert_eq!(permission_names(&root_role(&server).await), vec!["a"]);
}

#[tokio::test]
async fn test_existing_role_with_root_name_is_promoted() {
    let stores = EntityStores::in_memory();
    let imported = stores.roles.save(Role::named("root")).await.unwrap();
    let server = server_with(AdminConfig::default(), stores).await;

    create(&server, "/roles", json!({ "name": "editor", "permissions": ["a"] })).await;

    let root = root_role(&server).await;
    assert_eq!(root["id"], imported.id.to_hex());
    assert_eq!(root["builtIn"], true);
    assert_eq!(permission_names(&root), vec!["a"]);
}

#[tokio::test]
async fn test_user_update_with_unknown_role_is_rejected() {
    let server = server().await;
    let user = create(
        &server,
        "/users",
        json!({ "username": "jdoe", "email": "jdoe@example.com", "password": "s3cret-pass" }),
    )
    .await;

    let response = server
        .put(&format!("/users/{}", user["id"].as_str().unwrap()))
        .json(&json!({ "role": "0123456789abcdef01234567" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["field"], "role");
    assert_eq!(body["errors"][0]["type"], "reference");
}
