use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewsItem {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbNewsItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl TryFrom<DbNewsItem> for NewsItem {
    type Error = AppError;

    fn try_from(value: DbNewsItem) -> Result<Self, Self::Error> {
        Ok(NewsItem {
            id: Uuid::parse_str(&value.id)
                .map_err(|err| AppError::internal(format!("invalid news id '{}': {err}", value.id)))?,
            title: value.title,
            body: value.body,
            created: value.created,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewsCreateRequest {
    #[schema(example = "Pitch 4 closed")]
    pub title: String,
    #[schema(example = "Games on pitch 4 move to pitch 6.")]
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewsUpdateRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}
