//! In-memory store doubles and helpers shared by unit and router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::ai::AiProviders;
use crate::auth::jwt::tests::test_config;
use crate::auth::repo::{RevocationRepository, UserRepository};
use crate::auth::repo_types::{RevokedToken, User};
use crate::state::AppState;
use crate::visualizations::repo::VisualizationRepository;
use crate::visualizations::repo_types::{NewVisualization, Visualization};

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.email == email).cloned())
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(Some(user))
    }
}

#[derive(Default)]
pub struct InMemoryRevocations {
    rows: Mutex<Vec<RevokedToken>>,
}

impl InMemoryRevocations {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl RevocationRepository for InMemoryRevocations {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.iter().any(|r| r.jti == jti) {
            rows.push(RevokedToken {
                jti,
                revoked_at: OffsetDateTime::now_utc(),
                expires_at,
            });
        }
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| r.jti == jti))
    }

    async fn prune_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }
}

/// Rows are kept in insertion order, so "newest first" is reverse order even
/// when two saves share a timestamp.
#[derive(Default)]
pub struct InMemoryVisualizations {
    rows: Mutex<Vec<Visualization>>,
}

impl InMemoryVisualizations {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl VisualizationRepository for InMemoryVisualizations {
    async fn save(&self, new: NewVisualization) -> anyhow::Result<Visualization> {
        let row = Visualization {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            prompt: new.prompt,
            component_code: new.result.component_code,
            html_snippet: new.result.html_snippet,
            explanation: new.result.explanation,
            provider: new.provider.as_str().into(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Visualization>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Visualization>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|v| v.id == id).cloned())
    }
}

/// Migrated pool on `TEST_DATABASE_URL`. `None` when the variable is unset,
/// in which case the Postgres store tests return early.
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping Postgres test");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

/// Email no other test run will have used.
pub fn unique_email() -> String {
    format!("{}@test.vlearn", Uuid::new_v4())
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Drive `app` with one request; returns the status and JSON body (`Null` if
/// the body is not JSON).
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Application state backed entirely by in-memory stores.
pub fn test_state(ai: AiProviders) -> (AppState, Arc<InMemoryVisualizations>) {
    let visualizations = Arc::new(InMemoryVisualizations::default());
    let state = AppState::from_parts(
        &test_config("router-secret", "vlearn", "vlearn-users"),
        Arc::new(InMemoryUsers::default()),
        Arc::new(InMemoryRevocations::default()),
        visualizations.clone(),
        ai,
    );
    (state, visualizations)
}
