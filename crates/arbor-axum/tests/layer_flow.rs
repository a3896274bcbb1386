//! Full middleware flow: router + session layer + mock auth service.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use tower::ServiceExt;

use arbor_axum::{CurrentUser, SessionLayer, SessionLayerConfig};
use arbor_session::{
    AuthApi, DefaultPolicy, ProtectedRoutes, Role, RouteRule, SessionConfig, SessionError,
    SessionGatekeeper, TokenPair,
};

#[derive(Serialize)]
struct TestClaims<'a> {
    exp: i64,
    sub: i64,
    roles: Vec<&'a str>,
}

fn mint_token(exp: i64, sub: i64, roles: Vec<&str>) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &TestClaims { exp, sub, roles },
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("test token encodes")
}

struct StubAuthApi;

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
        Err(SessionError::RefreshFailed("stub".into()))
    }

    async fn invalidate(&self, _refresh_token: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

async fn whoami(user: CurrentUser) -> String {
    format!("subject:{}", user.subject_id)
}

async fn health() -> &'static str {
    "OK"
}

fn app() -> Router {
    let routes = ProtectedRoutes::new(
        vec![RouteRule::new("/admin/*", vec![Role::Admin])],
        DefaultPolicy::Open,
    );
    let gatekeeper = Arc::new(SessionGatekeeper::new(
        SessionConfig::new("http://auth.test"),
        StubAuthApi,
        routes,
    ));
    let layer = SessionLayer::with_config(
        gatekeeper,
        SessionLayerConfig::new().fallback_path("/denied"),
    );

    Router::new()
        .route("/health", get(health))
        .route("/admin/overview", get(whoami))
        .layer(layer)
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64
}

#[tokio::test]
async fn anonymous_request_redirects_to_sign_in_and_clears_cookies() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/admin/overview")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/signin");

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 3);
    for cookie in &cookies {
        assert!(cookie.contains("Max-Age=0"), "not a removal cookie: {cookie}");
    }
}

#[tokio::test]
async fn authenticated_admin_is_admitted_with_identity() {
    let token = mint_token(now() + 600, 42, vec!["admin"]);

    let response = app()
        .oneshot(
            Request::builder()
                .uri("/admin/overview")
                .header(header::COOKIE, format!("accessToken={token}; refreshToken=rt"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // first sight of this session: the metadata cookie gets written
    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("sessionMetadata=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
}

#[tokio::test]
async fn wrong_role_redirects_to_fallback_without_clearing() {
    let token = mint_token(now() + 600, 7, vec!["viewer"]);

    let response = app()
        .oneshot(
            Request::builder()
                .uri("/admin/overview")
                .header(header::COOKIE, format!("accessToken={token}; refreshToken=rt"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/denied");
    // authorization failure leaves the session cookies alone
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn skip_prefixes_bypass_the_gatekeeper() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn expired_session_with_refused_refresh_redirects_to_sign_in() {
    let token = mint_token(now() - 10, 7, vec!["admin"]);

    let response = app()
        .oneshot(
            Request::builder()
                .uri("/admin/overview")
                .header(header::COOKIE, format!("accessToken={token}; refreshToken=rt"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/signin");
}
