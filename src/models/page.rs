use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// A static information page (directions, rules, contacts).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPage {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl TryFrom<DbPage> for Page {
    type Error = AppError;

    fn try_from(value: DbPage) -> Result<Self, Self::Error> {
        Ok(Page {
            id: Uuid::parse_str(&value.id)
                .map_err(|err| AppError::internal(format!("invalid page id '{}': {err}", value.id)))?,
            title: value.title,
            body: value.body,
            created: value.created,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageCreateRequest {
    #[schema(example = "Getting here")]
    pub title: String,
    #[schema(example = "Parking is available at the north entrance.")]
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageUpdateRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}
