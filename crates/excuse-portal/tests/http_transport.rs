use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use excuse_portal::api::{ApiError, GetFormData, GetTerms, HttpTransport, PortalClient};
use excuse_portal::config::{BackendConfig, ConfigError};
use serde_json::{json, Value};

async fn envelope(Json(body): Json<Value>) -> impl IntoResponse {
    match body["action"].as_str() {
        Some("get_form_data") => Json(json!({
            "status": "success",
            "courses": [{ "id": 1, "name": "Anatomy" }],
            "reasons": [],
            "hospitals": []
        }))
        .into_response(),
        Some("get_terms") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "Terms unavailable" })),
        )
            .into_response(),
        _ => (StatusCode::OK, "<html>login required</html>").into_response(),
    }
}

async fn crash() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/", post(envelope))
        .route("/broken", post(crash));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    addr
}

fn client_for(endpoint: String) -> PortalClient {
    let transport = HttpTransport::new(BackendConfig::for_endpoint(endpoint)).expect("client builds");
    PortalClient::new(Arc::new(transport))
}

#[tokio::test]
async fn decodes_success_envelope() {
    let addr = spawn_backend().await;
    let client = client_for(format!("http://{addr}/"));

    let data = client.send(GetFormData {}).await.expect("form data");
    assert_eq!(data.courses[0].id, "1");
    assert_eq!(data.courses[0].name, "Anatomy");
}

#[tokio::test]
async fn error_envelope_on_non_2xx_keeps_backend_message() {
    let addr = spawn_backend().await;
    let client = client_for(format!("http://{addr}/"));

    let err = client.send(GetTerms {}).await.expect_err("rejected");
    assert!(matches!(err, ApiError::Application { .. }));
    assert_eq!(err.user_message(), "Terms unavailable");
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let addr = spawn_backend().await;
    let client = client_for(format!("http://{addr}/"));

    let err = client
        .send(excuse_portal::api::GetSignatures {})
        .await
        .expect_err("html body");
    match err {
        ApiError::MalformedResponse { action, snippet } => {
            assert_eq!(action, "get_signatures");
            assert!(snippet.starts_with("<html>"));
        }
        other => panic!("expected malformed response, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_is_a_transport_failure() {
    let addr = spawn_backend().await;
    let client = client_for(format!("http://{addr}/broken"));

    let err = client.send(GetFormData {}).await.expect_err("500");
    assert!(err.is_transport());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client_for(format!("http://{addr}/"))
        .send(GetFormData {})
        .await
        .expect_err("nothing listening");
    assert!(err.is_transport());
    assert_eq!(
        err.user_message(),
        "Could not reach the server. Check your connection and try again."
    );
}

#[tokio::test]
async fn missing_endpoint_surfaces_on_first_call() {
    let transport = HttpTransport::new(BackendConfig::default()).expect("client builds");
    let client = PortalClient::new(Arc::new(transport));

    let err = client.send(GetFormData {}).await.expect_err("no endpoint");
    assert!(matches!(err, ApiError::Config(ConfigError::MissingEndpoint)));
    assert_eq!(
        err.user_message(),
        "System error: the portal endpoint is not configured."
    );
}
