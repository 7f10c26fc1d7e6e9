#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use school_admin_api::config::AppConfig;
use school_admin_api::database::memory::MemoryStore;
use school_admin_api::{app, AppState};

/// One in-process server per test, backed by a fresh memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppConfig::memory()).await
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config, Arc::new(MemoryStore::new()))?;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register through the public endpoint and log in, returning the token.
    pub async fn register_and_login(&self, email: &str, role: &str, subrole: Option<&str>) -> Result<String> {
        let mut body = json!({
            "name": format!("{} user", role),
            "email": email,
            "password": "secret123",
            "role": role,
        });
        if let Some(subrole) = subrole {
            body["subrole"] = json!(subrole);
        }
        let res = self.client.post(self.url("/auth/register")).json(&body).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        self.login(email, "secret123").await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    pub async fn admin(&self) -> Result<String> {
        self.register_and_login("admin@school.test", "admin", None).await
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(token).send().await?)
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> Result<Response> {
        Ok(self.client.post(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> Result<Response> {
        Ok(self.client.put(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> Result<Response> {
        Ok(self.client.patch(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn delete(&self, token: &str, path: &str) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).bearer_auth(token).send().await?)
    }

    /// POST and return the created record's `data`, asserting 201.
    pub async fn create(&self, token: &str, path: &str, body: Value) -> Result<Value> {
        let res = self.post(token, path, body).await?;
        let status = res.status();
        let body: Value = res.json().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} answered {}: {}", path, status, body);
        Ok(body["data"].clone())
    }
}

pub fn id_of(record: &Value) -> String {
    record["id"].as_str().unwrap_or_default().to_string()
}

/// Year, term and class shared by most scenarios.
pub struct Calendar {
    pub year: String,
    pub term: String,
    pub class: String,
}

pub async fn seed_calendar(server: &TestServer, token: &str) -> Result<Calendar> {
    let year = server
        .create(
            token,
            "/api/academic-years",
            json!({ "name": "2025", "startDate": "2025-01-01", "endDate": "2025-12-31" }),
        )
        .await?;
    let term = server
        .create(
            token,
            "/api/academic-terms",
            json!({
                "academicYear": id_of(&year),
                "name": "Term 1",
                "startDate": "2025-02-01",
                "endDate": "2025-04-30"
            }),
        )
        .await?;
    let class = server
        .create(token, "/api/classes", json!({ "name": "Primary One", "shortName": "P1" }))
        .await?;

    Ok(Calendar {
        year: id_of(&year),
        term: id_of(&term),
        class: id_of(&class),
    })
}

pub async fn create_student(server: &TestServer, token: &str, class: &str, first: &str) -> Result<Value> {
    server
        .create(
            token,
            "/api/students",
            json!({ "firstName": first, "lastName": "Okello", "currentClass": class }),
        )
        .await
}
