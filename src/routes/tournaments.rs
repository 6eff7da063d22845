use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::tournament::{
    validate_competitions, DbTournament, Tournament, TournamentCreateRequest, TournamentUpdateRequest,
};
use crate::utils::utc_now;

const TOURNAMENT_COLUMNS: &str = "id, name, description, club, site_url, competitions, version, created_at, updated_at";

#[utoipa::path(
    get,
    path = "/tournament/tournaments",
    tag = "Tournaments",
    responses((status = 200, description = "List tournaments", body = [Tournament]))
)]
pub async fn list_tournaments(State(state): State<AppState>) -> AppResult<Json<Vec<Tournament>>> {
    let tournaments = sqlx::query_as::<_, DbTournament>(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments ORDER BY created_at"
    ))
    .fetch_all(&state.pool)
    .await?;

    let tournaments: Vec<Tournament> = tournaments
        .into_iter()
        .map(Tournament::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(tournaments))
}

#[utoipa::path(
    get,
    path = "/tournament/tournaments/{id}",
    tag = "Tournaments",
    params(("id" = Uuid, Path, description = "Tournament id")),
    responses((status = 200, description = "Tournament detail", body = Tournament))
)]
pub async fn get_tournament(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Tournament>> {
    Ok(Json(fetch_tournament(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/tournament/tournaments",
    tag = "Tournaments",
    request_body = TournamentCreateRequest,
    responses((status = 201, description = "Tournament created", body = Tournament))
)]
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(payload): Json<TournamentCreateRequest>,
) -> AppResult<(StatusCode, Json<Tournament>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    validate_competitions(&payload.competitions)?;

    let now = utc_now();
    let id = Uuid::new_v4();

    sqlx::query(&format!(
        "INSERT INTO tournaments ({TOURNAMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)"
    ))
    .bind(id.to_string())
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.club)
    .bind(&payload.site_url)
    .bind(serde_json::to_string(&payload.competitions)?)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let tournament = fetch_tournament(&state.pool, id).await?;
    tracing::info!(tournament_id = %id, name = %tournament.name, "tournament created");

    Ok((StatusCode::CREATED, Json(tournament)))
}

#[utoipa::path(
    put,
    path = "/tournament/tournaments/{id}",
    tag = "Tournaments",
    params(("id" = Uuid, Path, description = "Tournament id")),
    request_body = TournamentUpdateRequest,
    responses(
        (status = 200, description = "Tournament updated", body = Tournament),
        (status = 409, description = "Stale version")
    )
)]
pub async fn update_tournament(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TournamentUpdateRequest>,
) -> AppResult<Json<Tournament>> {
    let mut tournament = fetch_tournament(&state.pool, id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
        tournament.name = name;
    }
    if payload.description.is_some() {
        tournament.description = payload.description;
    }
    if payload.club.is_some() {
        tournament.club = payload.club;
    }
    if payload.site_url.is_some() {
        tournament.site_url = payload.site_url;
    }
    if let Some(competitions) = payload.competitions {
        validate_competitions(&competitions)?;
        tournament.competitions = competitions;
    }

    let affected = sqlx::query(
        "UPDATE tournaments SET name = ?, description = ?, club = ?, site_url = ?, competitions = ?, \
         version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
    )
    .bind(&tournament.name)
    .bind(&tournament.description)
    .bind(&tournament.club)
    .bind(&tournament.site_url)
    .bind(serde_json::to_string(&tournament.competitions)?)
    .bind(utc_now())
    .bind(id.to_string())
    .bind(payload.version)
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::conflict(format!(
            "tournament {id} was modified concurrently (expected version {})",
            payload.version
        )));
    }

    Ok(Json(fetch_tournament(&state.pool, id).await?))
}

/// Tournaments are never deleted through the API; callers who pass the ACL
/// get 405.
#[utoipa::path(
    delete,
    path = "/tournament/tournaments/{id}",
    tag = "Tournaments",
    params(("id" = Uuid, Path, description = "Tournament id")),
    responses(
        (status = 403, description = "Caller may not delete tournaments"),
        (status = 405, description = "Deleting tournaments is disabled")
    )
)]
pub async fn delete_tournament(Path(id): Path<String>) -> AppResult<StatusCode> {
    tracing::debug!(tournament_id = %id, "rejected tournament delete");
    Err(AppError::method_not_allowed("tournaments cannot be deleted"))
}

async fn fetch_tournament(pool: &SqlitePool, id: Uuid) -> AppResult<Tournament> {
    sqlx::query_as::<_, DbTournament>(&format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("tournament not found"))?
        .try_into()
}
