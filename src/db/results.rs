use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::fixture::{DbFixture, Fixture, FixtureCreateRequest, FixtureQuery};
use crate::stage_two::{FixtureStore, Slot};
use crate::utils::utc_now;

const COLUMNS: &str = "id, competition_name, competition_section, competition_group, tag, day, date_time, pitch, \
     home_team, away_team, home_goals, away_goals, home_pens, away_pens, stage2_tag, home_team_from, away_team_from, \
     version, created_at, updated_at";

const ORDERING: &str = " ORDER BY day, date_time, created_at";

pub async fn fetch(pool: &SqlitePool, id: Uuid) -> AppResult<Fixture> {
    sqlx::query_as::<_, DbFixture>(&format!("SELECT {COLUMNS} FROM results WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("result not found"))?
        .try_into()
}

pub async fn list(pool: &SqlitePool, query: &FixtureQuery) -> AppResult<Vec<Fixture>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {COLUMNS} FROM results WHERE 1 = 1"));

    if let Some(competition) = &query.competition {
        builder.push(" AND competition_name = ").push_bind(competition.clone());
    }
    if let Some(section) = &query.section {
        builder.push(" AND competition_section = ").push_bind(section.clone());
    }
    if let Some(group) = query.group {
        builder.push(" AND competition_group = ").push_bind(group);
    }
    if let Some(tag) = &query.tag {
        builder.push(" AND tag = ").push_bind(tag.clone());
    }
    if let Some(day) = query.day {
        builder.push(" AND day = ").push_bind(day);
    }
    if let Some(pitch) = &query.pitch {
        builder.push(" AND pitch = ").push_bind(pitch.clone());
    }
    builder.push(ORDERING);

    builder
        .build_query_as::<DbFixture>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(Fixture::try_from)
        .collect()
}

pub async fn insert(pool: &SqlitePool, request: FixtureCreateRequest) -> AppResult<Fixture> {
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(&format!(
        "INSERT INTO results ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)"
    ))
    .bind(id.to_string())
    .bind(&request.competition.name)
    .bind(&request.competition.section)
    .bind(request.competition.group)
    .bind(&request.tag)
    .bind(request.day)
    .bind(request.date_time)
    .bind(&request.pitch)
    .bind(&request.home_team)
    .bind(&request.away_team)
    .bind(request.home_goals)
    .bind(request.away_goals)
    .bind(request.home_pens)
    .bind(request.away_pens)
    .bind(&request.stage2_tag)
    .bind(&request.home_team_from)
    .bind(&request.away_team_from)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    fetch(pool, id).await
}

/// Writes `fixture` if the stored version still equals `fixture.version`.
/// A concurrent writer that got there first turns this into a conflict.
pub async fn update(pool: &SqlitePool, fixture: &Fixture) -> AppResult<Fixture> {
    let affected = sqlx::query(
        "UPDATE results SET competition_name = ?, competition_section = ?, competition_group = ?, tag = ?, day = ?, \
         date_time = ?, pitch = ?, home_team = ?, away_team = ?, home_goals = ?, away_goals = ?, home_pens = ?, \
         away_pens = ?, stage2_tag = ?, home_team_from = ?, away_team_from = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(&fixture.competition.name)
    .bind(&fixture.competition.section)
    .bind(fixture.competition.group)
    .bind(&fixture.tag)
    .bind(fixture.day)
    .bind(fixture.date_time)
    .bind(&fixture.pitch)
    .bind(&fixture.home_team)
    .bind(&fixture.away_team)
    .bind(fixture.home_goals)
    .bind(fixture.away_goals)
    .bind(fixture.home_pens)
    .bind(fixture.away_pens)
    .bind(&fixture.stage2_tag)
    .bind(&fixture.home_team_from)
    .bind(&fixture.away_team_from)
    .bind(utc_now())
    .bind(fixture.id.to_string())
    .bind(fixture.version)
    .execute(pool)
    .await?;

    if affected.rows_affected() == 0 {
        // Distinguish a vanished record from a lost race.
        fetch(pool, fixture.id).await?;
        return Err(AppError::conflict(format!(
            "result {} was modified concurrently (expected version {})",
            fixture.id, fixture.version
        )));
    }

    fetch(pool, fixture.id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> AppResult<Fixture> {
    let existing = fetch(pool, id).await?;

    let affected = sqlx::query("DELETE FROM results WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("result not found"));
    }

    Ok(existing)
}

/// Sets the team in `slot` on every fixture whose placeholder for that slot is `source`.
pub async fn fill_placeholder(pool: &SqlitePool, slot: Slot, source: &str, team: &str) -> AppResult<u64> {
    let (team_column, from_column) = match slot {
        Slot::Home => ("home_team", "home_team_from"),
        Slot::Away => ("away_team", "away_team_from"),
    };

    let affected = sqlx::query(&format!(
        "UPDATE results SET {team_column} = ?, version = version + 1, updated_at = ? WHERE {from_column} = ?"
    ))
    .bind(team)
    .bind(utc_now())
    .bind(source)
    .execute(pool)
    .await?;

    Ok(affected.rows_affected())
}

pub async fn find_by_placeholder(pool: &SqlitePool, source: &str) -> AppResult<Vec<Fixture>> {
    sqlx::query_as::<_, DbFixture>(&format!(
        "SELECT {COLUMNS} FROM results WHERE home_team_from = ? OR away_team_from = ?{ORDERING}"
    ))
    .bind(source)
    .bind(source)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Fixture::try_from)
    .collect()
}

/// [`FixtureStore`] over the `results` table.
#[derive(Debug, Clone)]
pub struct SqliteFixtureStore {
    pool: SqlitePool,
}

impl SqliteFixtureStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FixtureStore for SqliteFixtureStore {
    async fn fill_placeholder(&self, slot: Slot, source: &str, team: &str) -> AppResult<u64> {
        fill_placeholder(&self.pool, slot, source, team).await
    }

    async fn find_by_placeholder(&self, source: &str) -> AppResult<Vec<Fixture>> {
        find_by_placeholder(&self.pool, source).await
    }
}
