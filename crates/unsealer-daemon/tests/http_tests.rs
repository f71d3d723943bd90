//! HTTP endpoint tests for key submission and readiness

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use unsealer_core::UnsealContext;
use unsealer_daemon::router;

fn app(threshold: usize) -> Router {
    router(UnsealContext::new(threshold).unwrap().api())
}

async fn call(app: &Router, method: Method, uri: &str, body: &'static [u8]) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn add_key(app: &Router, key: &'static [u8]) -> (StatusCode, String) {
    call(app, Method::POST, "/add-key", key).await
}

async fn status(app: &Router) -> (StatusCode, String) {
    call(app, Method::GET, "/status", b"").await
}

#[tokio::test]
async fn test_threshold_three_scenario() {
    let app = app(3);

    assert_eq!(
        add_key(&app, b"keyA").await,
        (StatusCode::OK, "1 of 3 required unseal keys".to_string())
    );
    assert_eq!(
        add_key(&app, b"keyB\n").await,
        (StatusCode::OK, "2 of 3 required unseal keys".to_string())
    );

    assert_eq!(
        status(&app).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "2 of 3 required unseal keys. Requirement not met".to_string()
        )
    );

    assert_eq!(
        add_key(&app, b"keyB").await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unseal key already submitted".to_string()
        )
    );

    assert_eq!(
        add_key(&app, b"keyC").await,
        (StatusCode::OK, "3 of 3 required unseal keys".to_string())
    );
    assert_eq!(
        status(&app).await,
        (
            StatusCode::OK,
            "3 of 3 required unseal keys. Ready to unseal!".to_string()
        )
    );
}

#[tokio::test]
async fn test_add_key_after_threshold() {
    let app = app(1);
    add_key(&app, b"keyA").await;

    assert_eq!(
        add_key(&app, b"keyZ").await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unseal key threshold of 1 already met".to_string()
        )
    );
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let app = app(2);

    let (code, message) = add_key(&app, b"  \n").await;
    assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(message, "unseal key is empty");
}

#[tokio::test]
async fn test_wrong_method_not_allowed() {
    let app = app(2);

    let (code, _) = call(&app, Method::GET, "/add-key", b"").await;
    assert_eq!(code, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_concurrent_submissions_respect_threshold() {
    let app = app(3);
    let keys: [&'static [u8]; 6] = [b"k1", b"k2", b"k3", b"k4", b"k5", b"k6"];

    let handles: Vec<_> = keys
        .into_iter()
        .map(|key| {
            let app = app.clone();
            tokio::spawn(async move { add_key(&app, key).await.0 })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::OK {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(status(&app).await.0, StatusCode::OK);
}
