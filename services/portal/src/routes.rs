use crate::infra::{failure, AppState, SharedStore, StubError};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use excuse_portal::api::ApiRequest;
use serde_json::{json, Value};

pub(crate) fn portal_router(store: SharedStore) -> Router {
    Router::new()
        .route("/", post(action_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(store))
}

/// Single action endpoint. Every answer is HTTP 200 with a status envelope,
/// the way the hosted backend replies.
pub(crate) async fn action_endpoint(
    Extension(store): Extension<SharedStore>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let request = match serde_json::from_value::<ApiRequest>(body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(%action, error = %err, "stub backend could not decode action");
            let message = if action.is_empty() {
                "Missing action".to_string()
            } else {
                format!("Invalid request for action '{action}'")
            };
            return Json(failure(&StubError(message)));
        }
    };

    let reply = store.lock().handle(request, Utc::now().naive_utc());
    Json(reply)
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{StubStore, DEMO_STUDENT_EMAIL, DEMO_STUDENT_ID};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_json(router: Router, body: Value) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");

        let response = router.oneshot(request).await.expect("router answers");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn router() -> Router {
        portal_router(SharedStore::new(StubStore::seeded()))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router answers");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_actions_get_an_error_envelope() {
        let reply = post_json(router(), json!({ "action": "launch_rockets" })).await;
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["message"], "Invalid request for action 'launch_rockets'");

        let reply = post_json(router(), json!({})).await;
        assert_eq!(reply["message"], "Missing action");
    }

    #[tokio::test]
    async fn seeded_student_can_sign_in() {
        let reply = post_json(
            router(),
            json!({ "action": "login", "email": DEMO_STUDENT_EMAIL, "password": DEMO_STUDENT_ID }),
        )
        .await;
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["student"]["id"], DEMO_STUDENT_ID);

        let reply = post_json(
            router(),
            json!({ "action": "login", "email": DEMO_STUDENT_EMAIL, "password": 1 }),
        )
        .await;
        assert_eq!(reply["status"], "error");
    }

    #[tokio::test]
    async fn form_data_lists_seeded_lookups() {
        let reply = post_json(router(), json!({ "action": "get_form_data" })).await;
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["courses"][0]["name"], "Anatomy");
        assert!(reply["hospitals"].as_array().is_some_and(|rows| rows.len() == 2));
    }

    #[tokio::test]
    async fn session_check_uses_valid_marker() {
        let router = router();
        let reply = post_json(
            router.clone(),
            json!({ "action": "verify_session", "student_id": DEMO_STUDENT_ID }),
        )
        .await;
        assert_eq!(reply["status"], "valid");

        let reply = post_json(router, json!({ "action": "verify_session", "student_id": "1" })).await;
        assert_eq!(reply["status"], "invalid");
    }
}
