use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::db::results as store;
use crate::errors::AppResult;
use crate::events::{publish, publish_results, LiveEvent};
use crate::models::fixture::{Fixture, FixtureCreateRequest, FixtureQuery, FixtureUpdateRequest};

#[utoipa::path(
    get,
    path = "/tournament/results",
    tag = "Results",
    params(
        ("competition" = Option<String>, Query, description = "Competition name"),
        ("section" = Option<String>, Query, description = "Competition section"),
        ("group" = Option<i64>, Query, description = "Group number"),
        ("tag" = Option<String>, Query, description = "Fixture tag"),
        ("day" = Option<i64>, Query, description = "Tournament day"),
        ("pitch" = Option<String>, Query, description = "Pitch")
    ),
    responses((status = 200, description = "List results", body = [Fixture]))
)]
pub async fn list_results(
    State(state): State<AppState>,
    Query(query): Query<FixtureQuery>,
) -> AppResult<Json<Vec<Fixture>>> {
    Ok(Json(store::list(&state.pool, &query).await?))
}

#[utoipa::path(
    get,
    path = "/tournament/results/{id}",
    tag = "Results",
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "Result detail", body = Fixture),
        (status = 404, description = "Result not found")
    )
)]
pub async fn get_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Fixture>> {
    Ok(Json(store::fetch(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/tournament/results",
    tag = "Results",
    request_body = FixtureCreateRequest,
    responses(
        (status = 201, description = "Result created", body = Fixture),
        (status = 400, description = "Invalid result")
    )
)]
pub async fn create_result(
    State(state): State<AppState>,
    Json(payload): Json<FixtureCreateRequest>,
) -> AppResult<(StatusCode, Json<Fixture>)> {
    payload.validate()?;

    let fixture = store::insert(&state.pool, payload).await?;
    tracing::info!(result_id = %fixture.id, tag = %fixture.tag, "result created");
    publish(&state.live, LiveEvent::Result(fixture.clone()));
    advance_winner(&state, &fixture).await;

    Ok((StatusCode::CREATED, Json(fixture)))
}

#[utoipa::path(
    put,
    path = "/tournament/results/{id}",
    tag = "Results",
    params(("id" = Uuid, Path, description = "Result id")),
    request_body = FixtureUpdateRequest,
    responses(
        (status = 200, description = "Result updated", body = Fixture),
        (status = 404, description = "Result not found"),
        (status = 409, description = "Stale version")
    )
)]
pub async fn update_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FixtureUpdateRequest>,
) -> AppResult<Json<Fixture>> {
    let mut fixture = store::fetch(&state.pool, id).await?;
    fixture.version = payload.version;
    payload.apply(&mut fixture)?;

    let fixture = store::update(&state.pool, &fixture).await?;
    tracing::info!(result_id = %fixture.id, version = fixture.version, "result updated");
    publish(&state.live, LiveEvent::Result(fixture.clone()));
    advance_winner(&state, &fixture).await;

    Ok(Json(fixture))
}

#[utoipa::path(
    delete,
    path = "/tournament/results/{id}",
    tag = "Results",
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "Deleted result", body = Fixture),
        (status = 404, description = "Result not found")
    )
)]
pub async fn delete_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Fixture>> {
    let fixture = store::delete(&state.pool, id).await?;
    tracing::info!(result_id = %id, "result deleted");
    publish(&state.live, LiveEvent::Remove(fixture.clone()));
    Ok(Json(fixture))
}

/// The saved fixture is already committed, so a failed substitution is logged
/// rather than failing the request.
async fn advance_winner(state: &AppState, fixture: &Fixture) {
    match state.stage_two.advance_winner(fixture).await {
        Ok(touched) => publish_results(&state.live, &touched),
        Err(err) => tracing::error!(
            result_id = %fixture.id,
            stage2_tag = ?fixture.stage2_tag,
            error = %err,
            "failed to advance winner"
        ),
    }
}
