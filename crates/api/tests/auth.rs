mod support;

use axum::http::{header, StatusCode};
use support::*;

#[tokio::test]
async fn root_and_health_respond() {
    let app = TestApp::new().await;

    let res = app.send(get("/", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Hello World");
    assert_eq!(body["status"], "API is running");

    let res = app.send(get("/healthz", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_bytes(res).await, b"OK");
}

#[tokio::test]
async fn login_issues_a_bearer_token() {
    let app = TestApp::new().await;

    let res = app.send(login_form(ADMIN, ADMIN_PASSWORD)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let res = app.send(get("/verify", Some(&token))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["user"], ADMIN);
    assert_eq!(body["status"], "valid");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;

    let res = app.send(login_form(ADMIN, "nope")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["detail"], "Bad creds");

    let res = app.send(login_form("ghost", "whatever")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["detail"], "Bad creds");
}

#[tokio::test]
async fn verify_requires_a_valid_token() {
    let app = TestApp::new().await;

    let res = app.send(get("/verify", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    assert_eq!(body_json(res).await["detail"], "Not authenticated");

    let res = app.send(get("/verify", Some("not-a-jwt"))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["detail"], "Invalid token");
}

#[tokio::test]
async fn token_of_deleted_user_stops_working() {
    let app = TestApp::new().await;
    app.add_user("alice", "alice-pass").await;
    let token = app.token_for("alice");

    let res = app.send(get("/verify", Some(&token))).await;
    assert_eq!(res.status(), StatusCode::OK);

    app.state.registry().delete_user("alice").await.unwrap();

    let res = app.send(get("/verify", Some(&token))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["detail"], "User no longer exists");
}

#[tokio::test]
async fn version_serves_fallback_then_manifest() {
    let app = TestApp::new().await;

    let res = app.send(get("/version", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["version"], "0.1.65");
    assert_eq!(
        body["download_url"],
        "https://github.com/seyaul/Scrapling/releases/download/v0.1.65/HanaTool-0.1.65.zip"
    );
    assert_eq!(body["required"], false);

    let mut manifest = app.state.config.fallback_release();
    manifest.version = "0.1.66".to_string();
    manifest.changelog = "Faster scraping".to_string();
    std::fs::write(
        app.data_dir.path().join("release.toml"),
        manifest.to_toml().unwrap(),
    )
    .unwrap();

    let body = body_json(app.send(get("/version", None)).await).await;
    assert_eq!(body["version"], "0.1.66");
    assert_eq!(body["changelog"], "Faster scraping");
    assert_eq!(
        body["download_url"],
        "https://github.com/seyaul/Scrapling/releases/download/v0.1.66/HanaTool-0.1.66.zip"
    );
}

#[tokio::test]
async fn metrics_count_logins() {
    let app = TestApp::new().await;
    app.send(login_form(ADMIN, ADMIN_PASSWORD)).await;
    app.send(login_form(ADMIN, "wrong")).await;

    let res = app.send(get("/metrics", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(res).await).unwrap();
    assert!(text.contains("hana_logins_total 1"));
    assert!(text.contains("hana_login_failures_total 1"));
}

#[tokio::test]
async fn login_missing_password_gets_json_detail() {
    let app = TestApp::new().await;

    let req = axum::http::Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("username=admin"))
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(res).await["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("password"), "{detail}");
}
