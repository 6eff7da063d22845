use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Competition {
    #[schema(example = "U11")]
    pub name: String,
    #[schema(example = "A")]
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 2)]
    pub group: Option<i64>,
}

/// A single match ("result").
///
/// `home_team_from` / `away_team_from` name the table position or knockout
/// winner a slot is waiting on; they stay set after the slot is filled.
/// `stage2_tag` names the placeholder this fixture's own winner fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: Uuid,
    pub competition: Competition,
    pub tag: String,
    pub day: i64,
    /// Kick-off, epoch milliseconds.
    pub date_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_pens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_pens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage2_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team_from: Option<String>,
    pub version: i64,
    /// Kick-off as `HH:mm` in the display time zone.
    pub time: String,
    pub home_score: String,
    pub away_score: String,
}

impl Fixture {
    /// Recomputes the display fields from the stored ones.
    pub fn with_display(mut self) -> Self {
        self.time = display_time(self.date_time);
        let (home, away) = score_lines(self.home_goals, self.away_goals, self.home_pens, self.away_pens);
        self.home_score = home;
        self.away_score = away;
        self
    }

    /// A fixture counts as played once both regular scores are recorded.
    pub fn is_completed(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }
}

/// Display time zone, read once from `TIME_ZONE` (default `Europe/London`).
pub fn display_zone() -> Tz {
    static ZONE: OnceLock<Tz> = OnceLock::new();
    *ZONE.get_or_init(|| {
        std::env::var("TIME_ZONE")
            .ok()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::Europe::London)
    })
}

fn display_time(date_time: i64) -> String {
    Utc.timestamp_millis_opt(date_time)
        .single()
        .map(|at| at.with_timezone(&display_zone()).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Score strings as shown on the results board, e.g. `1(4)` vs `(3)1`.
/// Penalties are shown when either side has a non-zero penalty score.
fn score_lines(
    home_goals: Option<i64>,
    away_goals: Option<i64>,
    home_pens: Option<i64>,
    away_pens: Option<i64>,
) -> (String, String) {
    let shootout = home_pens.unwrap_or(0) != 0 || away_pens.unwrap_or(0) != 0;

    let home = match home_goals {
        Some(goals) if goals >= 0 && shootout => format!("{goals}({})", home_pens.unwrap_or(0)),
        Some(goals) if goals >= 0 => goals.to_string(),
        _ => String::new(),
    };
    let away = match away_goals {
        Some(goals) if goals >= 0 && shootout => format!("({}){goals}", away_pens.unwrap_or(0)),
        Some(goals) if goals >= 0 => goals.to_string(),
        _ => String::new(),
    };

    (home, away)
}

#[derive(Debug, Clone, FromRow)]
pub struct DbFixture {
    pub id: String,
    pub competition_name: String,
    pub competition_section: String,
    pub competition_group: Option<i64>,
    pub tag: String,
    pub day: i64,
    pub date_time: i64,
    pub pitch: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
    pub home_pens: Option<i64>,
    pub away_pens: Option<i64>,
    pub stage2_tag: Option<String>,
    pub home_team_from: Option<String>,
    pub away_team_from: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbFixture> for Fixture {
    type Error = AppError;

    fn try_from(value: DbFixture) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid result id '{}': {err}", value.id)))?;

        Ok(Fixture {
            id,
            competition: Competition {
                name: value.competition_name,
                section: value.competition_section,
                group: value.competition_group,
            },
            tag: value.tag,
            day: value.day,
            date_time: value.date_time,
            pitch: value.pitch,
            home_team: value.home_team,
            away_team: value.away_team,
            home_goals: value.home_goals,
            away_goals: value.away_goals,
            home_pens: value.home_pens,
            away_pens: value.away_pens,
            stage2_tag: value.stage2_tag,
            home_team_from: value.home_team_from,
            away_team_from: value.away_team_from,
            version: value.version,
            time: String::new(),
            home_score: String::new(),
            away_score: String::new(),
        }
        .with_display())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixtureCreateRequest {
    pub competition: Competition,
    #[schema(example = "A1")]
    pub tag: String,
    #[schema(example = 1)]
    pub day: i64,
    #[schema(example = 45100000)]
    pub date_time: i64,
    #[schema(example = "11")]
    pub pitch: Option<String>,
    #[schema(example = "Sheff. Wed.")]
    pub home_team: String,
    #[schema(example = "Ipswich")]
    pub away_team: String,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
    pub home_pens: Option<i64>,
    pub away_pens: Option<i64>,
    #[schema(example = "U11_A_KO1")]
    pub stage2_tag: Option<String>,
    #[schema(example = "U11_A_G2_P1")]
    pub home_team_from: Option<String>,
    #[schema(example = "U11_A_G1_P2")]
    pub away_team_from: Option<String>,
}

impl FixtureCreateRequest {
    pub fn validate(&self) -> AppResult<()> {
        require_text("competition.name", &self.competition.name)?;
        require_text("competition.section", &self.competition.section)?;
        if matches!(self.competition.group, Some(group) if group < 1) {
            return Err(AppError::bad_request("competition.group must be at least 1"));
        }
        require_text("tag", &self.tag)?;
        require_text("homeTeam", &self.home_team)?;
        require_text("awayTeam", &self.away_team)?;
        validate_scores(self.home_goals, self.away_goals, self.home_pens, self.away_pens)
    }
}

/// Partial update. `version` must match the stored version.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixtureUpdateRequest {
    pub version: i64,
    pub competition: Option<Competition>,
    pub tag: Option<String>,
    pub day: Option<i64>,
    pub date_time: Option<i64>,
    pub pitch: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    #[schema(example = 1)]
    pub home_goals: Option<i64>,
    #[schema(example = 3)]
    pub away_goals: Option<i64>,
    pub home_pens: Option<i64>,
    pub away_pens: Option<i64>,
    pub stage2_tag: Option<String>,
    pub home_team_from: Option<String>,
    pub away_team_from: Option<String>,
}

impl FixtureUpdateRequest {
    /// Applies the provided fields onto `fixture` and validates the outcome.
    pub fn apply(self, fixture: &mut Fixture) -> AppResult<()> {
        if let Some(competition) = self.competition {
            fixture.competition = competition;
        }
        if let Some(tag) = self.tag {
            fixture.tag = tag;
        }
        if let Some(day) = self.day {
            fixture.day = day;
        }
        if let Some(date_time) = self.date_time {
            fixture.date_time = date_time;
        }
        if self.pitch.is_some() {
            fixture.pitch = self.pitch;
        }
        if let Some(home_team) = self.home_team {
            fixture.home_team = home_team;
        }
        if let Some(away_team) = self.away_team {
            fixture.away_team = away_team;
        }
        if self.home_goals.is_some() {
            fixture.home_goals = self.home_goals;
        }
        if self.away_goals.is_some() {
            fixture.away_goals = self.away_goals;
        }
        if self.home_pens.is_some() {
            fixture.home_pens = self.home_pens;
        }
        if self.away_pens.is_some() {
            fixture.away_pens = self.away_pens;
        }
        if self.stage2_tag.is_some() {
            fixture.stage2_tag = self.stage2_tag;
        }
        if self.home_team_from.is_some() {
            fixture.home_team_from = self.home_team_from;
        }
        if self.away_team_from.is_some() {
            fixture.away_team_from = self.away_team_from;
        }

        require_text("competition.name", &fixture.competition.name)?;
        require_text("competition.section", &fixture.competition.section)?;
        if matches!(fixture.competition.group, Some(group) if group < 1) {
            return Err(AppError::bad_request("competition.group must be at least 1"));
        }
        require_text("tag", &fixture.tag)?;
        require_text("homeTeam", &fixture.home_team)?;
        require_text("awayTeam", &fixture.away_team)?;
        validate_scores(fixture.home_goals, fixture.away_goals, fixture.home_pens, fixture.away_pens)
    }
}

/// Query filters for listing results.
#[derive(Debug, Default, Deserialize)]
pub struct FixtureQuery {
    pub competition: Option<String>,
    pub section: Option<String>,
    pub group: Option<i64>,
    pub tag: Option<String>,
    pub day: Option<i64>,
    pub pitch: Option<String>,
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn validate_scores(
    home_goals: Option<i64>,
    away_goals: Option<i64>,
    home_pens: Option<i64>,
    away_pens: Option<i64>,
) -> AppResult<()> {
    for (field, value) in [
        ("homeGoals", home_goals),
        ("awayGoals", away_goals),
        ("homePens", home_pens),
        ("awayPens", away_pens),
    ] {
        if matches!(value, Some(score) if score < 0) {
            return Err(AppError::bad_request(format!("{field} must not be negative")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_lines_without_penalties() {
        assert_eq!(score_lines(Some(2), Some(1), None, None), ("2".into(), "1".into()));
        assert_eq!(score_lines(Some(2), Some(1), Some(0), Some(0)), ("2".into(), "1".into()));
        assert_eq!(score_lines(None, None, None, None), (String::new(), String::new()));
    }

    #[test]
    fn test_score_lines_with_penalties() {
        assert_eq!(score_lines(Some(1), Some(1), Some(4), Some(3)), ("1(4)".into(), "(3)1".into()));
        assert_eq!(score_lines(Some(0), Some(0), None, Some(2)), ("0(0)".into(), "(2)0".into()));
    }

    #[test]
    fn test_display_time_uses_zone() {
        // 2024-07-01T09:30:00Z, London is on BST.
        assert_eq!(display_time(1_719_826_200_000), "10:30");
    }

    #[test]
    fn test_update_rejects_negative_scores() {
        let mut fixture = Fixture {
            id: Uuid::new_v4(),
            competition: Competition {
                name: "U11".into(),
                section: "A".into(),
                group: Some(1),
            },
            tag: "A1".into(),
            day: 1,
            date_time: 0,
            pitch: None,
            home_team: "Foo".into(),
            away_team: "Bar".into(),
            home_goals: None,
            away_goals: None,
            home_pens: None,
            away_pens: None,
            stage2_tag: None,
            home_team_from: None,
            away_team_from: None,
            version: 0,
            time: String::new(),
            home_score: String::new(),
            away_score: String::new(),
        };

        let update: FixtureUpdateRequest =
            serde_json::from_value(serde_json::json!({"version": 0, "homeGoals": -1})).unwrap();
        assert!(update.apply(&mut fixture).is_err());

        let update: FixtureUpdateRequest =
            serde_json::from_value(serde_json::json!({"version": 0, "homeGoals": 2, "awayGoals": 0})).unwrap();
        update.apply(&mut fixture).unwrap();
        assert!(fixture.is_completed());
    }
}
