//! Stage-2 placeholder substitution
//!
//! Knockout fixtures are published before their teams are known. Their slots
//! carry a placeholder (`homeTeamFrom` / `awayTeamFrom`) naming either a
//! league-table position (`U11_A_G2_P1`) or the winner of an earlier fixture
//! (that fixture's `stage2Tag`). Once the position or winner is known every
//! slot waiting on it is filled with the concrete team name.

mod table;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::fixture::Fixture;

pub use table::{parse_submission, LeagueTable, Placement, PlacementOutcome, TableReport};

/// Which side of a fixture a placeholder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Home,
    Away,
}

/// Persistence operations the resolver needs.
#[async_trait]
pub trait FixtureStore: Send + Sync {
    /// Sets the `slot` team of every fixture whose `slot` placeholder equals
    /// `source`; returns the number of fixtures changed.
    async fn fill_placeholder(&self, slot: Slot, source: &str, team: &str) -> AppResult<u64>;

    /// Every fixture with `source` as home or away placeholder.
    async fn find_by_placeholder(&self, source: &str) -> AppResult<Vec<Fixture>>;
}

/// The team that advances from a played fixture.
///
/// The away side wins when it scored more penalties *or* more goals;
/// otherwise the home side is chosen. A comparison only holds when both of its
/// values are recorded. This means a home win on penalties after a level game
/// is only detected because the away side did not out-score it, and a drawn
/// game without penalties elects the home side.
pub fn winner_of(fixture: &Fixture) -> &str {
    let greater = |away: Option<i64>, home: Option<i64>| matches!((away, home), (Some(a), Some(h)) if a > h);

    if greater(fixture.away_pens, fixture.home_pens) || greater(fixture.away_goals, fixture.home_goals) {
        &fixture.away_team
    } else {
        &fixture.home_team
    }
}

/// The (placeholder, team) substitution a saved fixture triggers, if any.
/// Only completed fixtures with a non-empty `stage2Tag` advance a team.
pub fn advancement(fixture: &Fixture) -> Option<(&str, &str)> {
    let tag = fixture.stage2_tag.as_deref().map(str::trim).filter(|tag| !tag.is_empty())?;
    if !fixture.is_completed() {
        return None;
    }
    Some((tag, winner_of(fixture)))
}

/// Applies placeholder substitutions through a [`FixtureStore`].
///
/// The resolver only returns the fixtures it touched; publishing them is the
/// caller's job.
#[derive(Debug, Clone)]
pub struct StageTwoResolver<S> {
    store: S,
}

impl<S: FixtureStore> StageTwoResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fills every home slot and every away slot waiting on `source` with
    /// `team`, returning the touched fixtures in their updated state.
    pub async fn resolve_stage_two(&self, source: &str, team: &str) -> AppResult<Vec<Fixture>> {
        tracing::debug!(source = %source, team = %team, "resolving stage 2 placeholder");

        let home = self.store.fill_placeholder(Slot::Home, source, team).await?;
        let away = self.store.fill_placeholder(Slot::Away, source, team).await?;
        if home == 0 && away == 0 {
            return Ok(Vec::new());
        }

        let touched = self.store.find_by_placeholder(source).await?;
        tracing::debug!(source = %source, home, away, touched = touched.len(), "stage 2 placeholder resolved");
        Ok(touched)
    }

    /// Advances the winner of a just-saved fixture, if it carries a `stage2Tag`
    /// and has been played.
    pub async fn advance_winner(&self, fixture: &Fixture) -> AppResult<Vec<Fixture>> {
        match advancement(fixture) {
            Some((tag, winner)) => {
                tracing::debug!(result_id = %fixture.id, tag = %tag, winner = %winner, "advancing winner");
                self.resolve_stage_two(tag, winner).await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Resolves every position of a submitted league table in ascending
    /// position order. Each position is independent: a failure is logged and
    /// reported for that position while the rest carry on.
    pub async fn resolve_table(&self, table: &LeagueTable, placements: Vec<Placement>) -> TableReport {
        let mut outcomes = Vec::with_capacity(placements.len());

        for placement in placements {
            let Some(source) = table.source_tag(placement.index) else {
                tracing::warn!(index = placement.index, "league table position out of range");
                let reason = format!("position {} is out of range", placement.index);
                outcomes.push(PlacementOutcome::failed(table.prefix(), placement.team.ok(), reason));
                continue;
            };
            let outcome = match placement.team {
                Ok(team) => match self.resolve_stage_two(&source, &team).await {
                    Ok(updated) => PlacementOutcome::resolved(source, team, updated),
                    Err(err) => {
                        tracing::error!(source = %source, team = %team, error = %err, "stage 2 resolution failed");
                        PlacementOutcome::failed(source, Some(team), err.to_string())
                    }
                },
                Err(reason) => {
                    tracing::warn!(source = %source, reason = %reason, "skipping league table position");
                    PlacementOutcome::failed(source, None, reason)
                }
            };
            outcomes.push(outcome);
        }

        TableReport {
            prefix: table.prefix(),
            placements: outcomes,
        }
    }
}
