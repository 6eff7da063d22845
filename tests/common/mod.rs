#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use tournament_api::identity::{grant_roles, sync_profile};
use tournament_api::models::user::{UpstreamProfile, User};
use tournament_api::{create_router, AppState};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    // Keeps the database file alive for the duration of the test.
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let state = AppState::from_env(pool.clone()).await?;
    let router = create_router(state.clone());

    Ok(TestApp {
        router,
        state,
        pool,
        _dir: dir,
    })
}

impl TestApp {
    /// Signs a user in through the profile sync path and grants `roles`.
    pub async fn user_with_roles(&self, login: &str, roles: &[&str]) -> Result<User> {
        let profile = UpstreamProfile {
            provider_name: "google".to_string(),
            provider_id: format!("id-{login}"),
            email: format!("{login}@example.com"),
            photo: None,
            display_name: login.to_string(),
        };
        let assignments = self.state.authz.assignments();
        let user = sync_profile(&self.pool, assignments, &profile).await?;
        if roles.is_empty() {
            return Ok(user);
        }

        let roles: Vec<String> = roles.iter().map(|role| role.to_string()).collect();
        Ok(grant_roles(&self.pool, self.state.authz.policy(), assignments, user.id, &roles).await?)
    }

    pub async fn token_with_roles(&self, login: &str, roles: &[&str]) -> Result<String> {
        let user = self.user_with_roles(login, roles).await?;
        Ok(self.state.jwt.encode(&user)?)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let req = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send("DELETE", uri, token, None).await
    }
}

/// Body for a group game between `home` and `away`.
pub fn fixture_body(tag: &str, home: &str, away: &str) -> Value {
    serde_json::json!({
        "competition": {"name": "U11", "section": "A", "group": 2},
        "tag": tag,
        "day": 1,
        "dateTime": 1_719_826_200_000i64,
        "pitch": "3",
        "homeTeam": home,
        "awayTeam": away
    })
}
