use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// A competition played within a tournament, e.g. U11 section A with 3 groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompetitionEntry {
    #[schema(example = "U11")]
    pub name: String,
    #[schema(example = "A")]
    pub section: String,
    #[serde(default)]
    #[schema(example = 3)]
    pub groups: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    pub competitions: Vec<CompetitionEntry>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTournament {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub club: Option<String>,
    pub site_url: Option<String>,
    /// JSON array of [`CompetitionEntry`].
    pub competitions: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTournament> for Tournament {
    type Error = AppError;

    fn try_from(value: DbTournament) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid tournament id '{}': {err}", value.id)))?;

        Ok(Tournament {
            id,
            name: value.name,
            description: value.description,
            club: value.club,
            site_url: value.site_url,
            competitions: serde_json::from_str(&value.competitions)?,
            version: value.version,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentCreateRequest {
    #[schema(example = "Summer Festival")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Stocksbridge Juniors")]
    pub club: Option<String>,
    pub site_url: Option<String>,
    #[serde(default)]
    pub competitions: Vec<CompetitionEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentUpdateRequest {
    pub version: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub club: Option<String>,
    pub site_url: Option<String>,
    pub competitions: Option<Vec<CompetitionEntry>>,
}

pub fn validate_competitions(competitions: &[CompetitionEntry]) -> AppResult<()> {
    for competition in competitions {
        if competition.name.trim().is_empty() || competition.section.trim().is_empty() {
            return Err(AppError::bad_request("competition name and section are required"));
        }
        if competition.groups < 0 {
            return Err(AppError::bad_request("competition groups must not be negative"));
        }
    }
    Ok(())
}
