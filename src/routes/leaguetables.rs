use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::events::publish_results;
use crate::stage_two::{parse_submission, LeagueTable, TableReport};

/// Publishes a final group table. Every fixture waiting on one of the group's
/// positions gets its team filled in; the response lists what each position
/// changed once all of them have been processed.
#[utoipa::path(
    post,
    path = "/tournament/leaguetables/{competition}/{section}/{group}",
    tag = "League tables",
    params(
        ("competition" = String, Path, description = "Competition name, e.g. U11"),
        ("section" = String, Path, description = "Competition section, e.g. A"),
        ("group" = String, Path, description = "Group number")
    ),
    request_body(
        content = Object,
        description = "Team names in finishing order, as an array or an object keyed by zero-based position"
    ),
    responses(
        (status = 200, description = "Per-position outcome", body = TableReport),
        (status = 400, description = "Body is neither an array nor an object")
    )
)]
pub async fn submit_league_table(
    State(state): State<AppState>,
    Path((competition, section, group)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> AppResult<Json<TableReport>> {
    let table = LeagueTable::new(competition, section, group);
    let placements = parse_submission(&body)?;
    tracing::info!(prefix = %table.prefix(), positions = placements.len(), "league table submitted");

    let report = state.stage_two.resolve_table(&table, placements).await;
    publish_results(&state.live, report.updated());

    Ok(Json(report))
}
