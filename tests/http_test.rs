//! REST routes over the in-memory store.

use appcatalog_sdk::{app, builtin, AppState, CrudGateway, MemoryStore};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let catalog = Arc::new(builtin().expect("builtin catalog"));
    app(AppState::new(CrudGateway::new(MemoryStore::new(), catalog)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn host_body() -> Value {
    json!({
        "resourceID": "host-1",
        "hostName": "cluster.example.edu",
        "description": "test",
        "preferredJobSubmissionProtocol": "SSH",
        "cpusPerNode": 16
    })
}

#[tokio::test]
async fn health_ready_version() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "ok");

    let (status, body) = send(&app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "appcatalog-sdk");
}

#[tokio::test]
async fn save_read_delete_by_path_id() {
    let app = test_app();
    let (status, body) = send(&app, "PUT", "/api/v1/entities/ComputeResource", Some(host_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fields"]["hostName"], "cluster.example.edu");

    let (status, body) = send(&app, "GET", "/api/v1/entities/compute_resource/host-1", None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["fields"]["cpusPerNode"], 16);

    let (status, body) = send(&app, "GET", "/api/v1/entities/ComputeResource/host-1/exists", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exists"], true);

    let (status, _) = send(&app, "DELETE", "/api/v1/entities/ComputeResource/host-1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/api/v1/entities/ComputeResource/host-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (_, body) = send(&app, "GET", "/api/v1/entities/ComputeResource/host-1/exists", None).await;
    assert_eq!(body["data"]["exists"], false);
}

#[tokio::test]
async fn list_filter_and_ids() {
    let app = test_app();
    send(&app, "PUT", "/api/v1/entities/ComputeResource", Some(host_body())).await;

    let (status, body) = send(&app, "GET", "/api/v1/entities/ComputeResource?field=cpusPerNode&value=16", None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["meta"]["count"], 1);

    let (_, body) = send(&app, "GET", "/api/v1/entities/ComputeResource?field=cpusPerNode&value=8", None).await;
    assert_eq!(body["meta"]["count"], 0);

    let (_, body) = send(&app, "GET", "/api/v1/ids/ComputeResource", None).await;
    assert_eq!(body["data"], json!(["host-1"]));

    let (status, body) = send(&app, "GET", "/api/v1/entities/ComputeResource?field=not_a_real_field&value=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "unsupported_field");

    let (status, _) = send(&app, "GET", "/api/v1/entities/ComputeResource?field=hostName", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn composite_keys_via_query() {
    let app = test_app();
    let body = json!({"gatewayId": "gw-1", "resourceId": "host-1", "loginUserName": "alice"});
    let (status, _) = send(&app, "PUT", "/api/v1/entities/ComputeResourcePreference", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let uri = "/api/v1/keys/ComputeResourcePreference?gatewayId=gw-1&resourceId=host-1";
    let (status, body) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["fields"]["loginUserName"], "alice");

    let (_, body) = send(&app, "GET", "/api/v1/ids/ComputeResourcePreference", None).await;
    assert_eq!(body["data"], json!([{"gatewayId": "gw-1", "resourceId": "host-1"}]));

    let (status, body) = send(&app, "GET", "/api/v1/entities/ComputeResourcePreference/gw-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_identifier");

    let (status, _) = send(&app, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", "/api/v1/keys/ComputeResourcePreference/exists?gatewayId=gw-1&resourceId=host-1", None).await;
    assert_eq!(body["data"]["exists"], false);
}

#[tokio::test]
async fn error_statuses() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/v1/entities/NoSuchKind", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "unknown_kind");

    let (status, body) = send(&app, "PUT", "/api/v1/entities/ComputeResource", Some(json!(["not", "an", "object"]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "mapping_error");

    let (status, _) = send(&app, "PUT", "/api/v1/entities/ComputeResource", Some(json!({"hostName": "h"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
