mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let app = common::setup().await?;

    let (status, body) = app.get("/api/health", None).await?;
    assert_eq!(status, StatusCode::OK, "health endpoint did not return 200");
    let db_ok = body.get("db_ok").and_then(|b| b.as_bool()).unwrap_or(false);
    assert!(db_ok, "expected db_ok: true, got: {}", body);

    Ok(())
}

#[tokio::test]
async fn root_and_auth_banners_are_public() -> Result<()> {
    let app = common::setup().await?;

    let (status, body) = app.get("/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Tournament API");

    let (status, body) = app.get("/auth", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"], "auth-api");

    Ok(())
}
