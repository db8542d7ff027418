use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use blog_api::{
    App,
    config::{Env, ServerConfig},
    db_pool, router,
    storage::ImageStore,
};
use serde_json::Value;
use tower::ServiceExt;

const FRONTEND: &str = "http://localhost:5173";

// None of the requests below get far enough to open a database connection
fn app() -> Router {
    let config = ServerConfig {
        env: Env::Dev,
        database_url: "postgres://nobody@127.0.0.1:1/nothing".into(),
        database_max_connections: 1,
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origins: vec![FRONTEND.into()],
        session_ttl_days: 30,
        storage: None,
    };

    router(App {
        diesel: db_pool(&config).unwrap(),
        config: Arc::new(config),
        images: ImageStore::in_memory(),
    })
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_is_auth_without_cookie() {
    let (status, body) = send(Request::get("/auth/is_auth").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_auth"], false);
}

#[tokio::test]
async fn test_me_requires_session() {
    let (status, body) = send(Request::get("/auth/me").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_writes_require_session() {
    let requests = [
        json_request(Method::POST, "/posts", r#"{"title":"t","content":"c"}"#),
        json_request(Method::PATCH, "/posts/1", r#"{"title":"t"}"#),
        json_request(Method::POST, "/posts/1/comments", r#"{"content":"hi"}"#),
        json_request(Method::PATCH, "/posts/1/comments/2", r#"{"content":"hi"}"#),
        Request::delete("/posts/1/comments/2")
            .body(Body::empty())
            .unwrap(),
        Request::post("/posts/1/comments/2/like")
            .body(Body::empty())
            .unwrap(),
        Request::post("/posts/1/like").body(Body::empty()).unwrap(),
        Request::get("/dashboard").body(Body::empty()).unwrap(),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_signup_validates_before_touching_the_database() {
    let (status, body) = send(json_request(
        Method::POST,
        "/auth/signup",
        r#"{"email":"not-an-email","username":"jane","password":"long enough"}"#,
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid email");

    let (status, _) = send(json_request(
        Method::POST,
        "/auth/signup",
        r#"{"email":"jane@example.com","username":"jane","password":"short"}"#,
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_unprocessable() {
    let (status, body) = send(json_request(Method::POST, "/auth/login", "{\"email\":")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNPROCESSABLE");
}

#[tokio::test]
async fn test_search_needs_criteria() {
    let (status, _) = send(
        Request::get("/posts/search?q=%20%20")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_post_id_is_rejected() {
    let (status, _) = send(
        Request::get("/posts/not-a-number/comments")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let response = app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/posts")
                .header(header::ORIGIN, FRONTEND)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(FRONTEND)
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}
