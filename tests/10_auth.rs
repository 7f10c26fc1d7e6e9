mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "memory");

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn register_login_profile_logout() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register_and_login("Head@School.test", "admin", None).await?;

    let res = server.get(&token, "/api/auth/profile").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["user"]["email"], "head@school.test");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let res = server.post(&token, "/api/auth/logout", json!({})).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&token, "/api/auth/profile").await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Token has been revoked");
    Ok(())
}

#[tokio::test]
async fn missing_and_bad_tokens_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/students")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.get("not-a-jwt", "/api/students").await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn malformed_authorization_header_is_invalid_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    for header in ["Token abc", "Bearer ", "Basic dXNlcjpwYXNz"] {
        let res = server
            .client
            .get(server.url("/api/students"))
            .header("Authorization", header)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "header {:?}", header);
        let body: Value = res.json().await?;
        assert_eq!(body["message"], "Invalid token");
    }

    let res = server.client.get(server.url("/api/students")).send().await?;
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Access denied");
    Ok(())
}

#[tokio::test]
async fn serves_without_request_logging() -> Result<()> {
    let mut config = school_admin_api::config::AppConfig::memory();
    config.api.enable_request_logging = false;
    let server = TestServer::spawn_with(config).await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_errors() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register_and_login("teacher@school.test", "staff", Some("teacher")).await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "teacher@school.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "teacher@school.test", "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.admin().await?;

    let res = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({
            "name": "Again",
            "email": "ADMIN@school.test",
            "password": "secret123",
            "role": "admin"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn closed_registration_requires_admin() -> Result<()> {
    let mut config = school_admin_api::config::AppConfig::memory();
    config.security.allow_public_registration = false;
    let server = TestServer::spawn_with(config).await?;

    let res = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "X", "email": "x@school.test", "password": "secret123", "role": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn users_cannot_escalate_their_own_role() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let staff = server.register_and_login("staff@school.test", "staff", Some("teacher")).await?;

    let res = server.get(&staff, "/api/auth/profile").await?;
    let body: Value = res.json().await?;
    let staff_id = body["data"]["userId"].as_str().unwrap_or_default().to_string();

    let res = server
        .put(&staff, &format!("/api/users/{}", staff_id), json!({ "role": "admin" }))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .put(&staff, &format!("/api/users/{}", staff_id), json!({ "name": "Renamed" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&staff, "/api/users").await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = server.get(&admin, "/api/users").await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}
