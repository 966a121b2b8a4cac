use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use atrium_api::auth::{generate_jwt, Claims};
use atrium_api::server::{app, AppState};
use atrium_api::store::{MemoryStore, RecordStore};

pub struct TestBackend {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// Router over a fresh in-memory store. Each test gets its own backend, so
/// there is no cross-test state.
pub fn backend() -> TestBackend {
    let store = Arc::new(MemoryStore::new());
    let router = app(AppState {
        store: store.clone() as Arc<dyn RecordStore>,
    });
    TestBackend { router, store }
}

pub fn bearer(user_id: Uuid) -> String {
    let claims = Claims::new(user_id, "jo@example.com".to_string());
    let token = generate_jwt(claims).expect("failed to mint test token");
    format!("Bearer {}", token)
}

#[allow(dead_code)]
pub async fn seed_member(
    store: &MemoryStore,
    organisation_id: Uuid,
    user_id: Uuid,
    is_owner: bool,
    permissions: &[&str],
) -> Value {
    store
        .insert(
            "members",
            json!({
                "organisation_id": organisation_id.to_string(),
                "user_id": user_id.to_string(),
                "name": "Jo Example",
                "email": "jo@example.com",
                "is_owner": is_owner,
                "role": {
                    "id": Uuid::new_v4().to_string(),
                    "name": "Recruiter",
                    "slug": "recruiter"
                },
                "permissions": permissions,
                "extra_permissions": [],
            }),
        )
        .await
        .expect("failed to seed member")
}

/// Drive one request through the router and decode the JSON body.
pub async fn request_json(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[allow(dead_code)]
pub async fn get_json(router: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    request_json(router, Method::GET, uri, token, None).await
}
