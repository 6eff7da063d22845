use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::events::{publish, LiveEvent};
use crate::models::news::{DbNewsItem, NewsCreateRequest, NewsItem, NewsUpdateRequest};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/tournament/news",
    tag = "News",
    responses((status = 200, description = "News, newest first", body = [NewsItem]))
)]
pub async fn list_news(State(state): State<AppState>) -> AppResult<Json<Vec<NewsItem>>> {
    let items = sqlx::query_as::<_, DbNewsItem>("SELECT id, title, body, created FROM news ORDER BY created DESC")
        .fetch_all(&state.pool)
        .await?;

    let items: Vec<NewsItem> = items
        .into_iter()
        .map(NewsItem::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/tournament/news/{id}",
    tag = "News",
    params(("id" = Uuid, Path, description = "News id")),
    responses((status = 200, description = "News item", body = NewsItem))
)]
pub async fn get_news(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<NewsItem>> {
    Ok(Json(fetch_news(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/tournament/news",
    tag = "News",
    request_body = NewsCreateRequest,
    responses((status = 201, description = "News published", body = NewsItem))
)]
pub async fn create_news(
    State(state): State<AppState>,
    Json(payload): Json<NewsCreateRequest>,
) -> AppResult<(StatusCode, Json<NewsItem>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO news (id, title, body, created) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(&payload.title)
        .bind(&payload.body)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let item = fetch_news(&state.pool, id).await?;
    publish(&state.live, LiveEvent::News(item.clone()));

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/tournament/news/{id}",
    tag = "News",
    params(("id" = Uuid, Path, description = "News id")),
    request_body = NewsUpdateRequest,
    responses((status = 200, description = "News updated", body = NewsItem))
)]
pub async fn update_news(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewsUpdateRequest>,
) -> AppResult<Json<NewsItem>> {
    let existing = fetch_news(&state.pool, id).await?;
    let title = payload.title.unwrap_or(existing.title);
    let body = payload.body.unwrap_or(existing.body);
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    sqlx::query("UPDATE news SET title = ?, body = ? WHERE id = ?")
        .bind(&title)
        .bind(&body)
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    let item = fetch_news(&state.pool, id).await?;
    publish(&state.live, LiveEvent::News(item.clone()));

    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/tournament/news/{id}",
    tag = "News",
    params(("id" = Uuid, Path, description = "News id")),
    responses((status = 204, description = "News deleted"))
)]
pub async fn delete_news(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    let affected = sqlx::query("DELETE FROM news WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("news not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_news(pool: &SqlitePool, id: Uuid) -> AppResult<NewsItem> {
    sqlx::query_as::<_, DbNewsItem>("SELECT id, title, body, created FROM news WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("news not found"))?
        .try_into()
}
