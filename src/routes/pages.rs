use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::page::{DbPage, Page, PageCreateRequest, PageUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/tournament/pages",
    tag = "Pages",
    responses((status = 200, description = "List pages", body = [Page]))
)]
pub async fn list_pages(State(state): State<AppState>) -> AppResult<Json<Vec<Page>>> {
    let pages = sqlx::query_as::<_, DbPage>("SELECT id, title, body, created FROM pages ORDER BY title")
        .fetch_all(&state.pool)
        .await?;

    let pages: Vec<Page> = pages.into_iter().map(Page::try_from).collect::<Result<_, _>>()?;
    Ok(Json(pages))
}

#[utoipa::path(
    get,
    path = "/tournament/pages/{id}",
    tag = "Pages",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 200, description = "Page", body = Page))
)]
pub async fn get_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Page>> {
    Ok(Json(fetch_page(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/tournament/pages",
    tag = "Pages",
    request_body = PageCreateRequest,
    responses((status = 201, description = "Page created", body = Page))
)]
pub async fn create_page(
    State(state): State<AppState>,
    Json(payload): Json<PageCreateRequest>,
) -> AppResult<(StatusCode, Json<Page>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO pages (id, title, body, created) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(&payload.title)
        .bind(&payload.body)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(fetch_page(&state.pool, id).await?)))
}

#[utoipa::path(
    put,
    path = "/tournament/pages/{id}",
    tag = "Pages",
    params(("id" = Uuid, Path, description = "Page id")),
    request_body = PageUpdateRequest,
    responses((status = 200, description = "Page updated", body = Page))
)]
pub async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PageUpdateRequest>,
) -> AppResult<Json<Page>> {
    let existing = fetch_page(&state.pool, id).await?;
    let title = payload.title.unwrap_or(existing.title);
    let body = payload.body.unwrap_or(existing.body);

    sqlx::query("UPDATE pages SET title = ?, body = ? WHERE id = ?")
        .bind(&title)
        .bind(&body)
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    Ok(Json(fetch_page(&state.pool, id).await?))
}

#[utoipa::path(
    delete,
    path = "/tournament/pages/{id}",
    tag = "Pages",
    params(("id" = Uuid, Path, description = "Page id")),
    responses((status = 204, description = "Page deleted"))
)]
pub async fn delete_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    let affected = sqlx::query("DELETE FROM pages WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("page not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_page(pool: &SqlitePool, id: Uuid) -> AppResult<Page> {
    sqlx::query_as::<_, DbPage>("SELECT id, title, body, created FROM pages WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("page not found"))?
        .try_into()
}
