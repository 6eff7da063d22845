use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub provider_id: String,
    pub provider_name: String,
    pub email: String,
    pub photo: Option<String>,
    pub display_name: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub provider_id: String,
    pub provider_name: String,
    pub email: String,
    pub photo: Option<String>,
    pub display_name: String,
    /// JSON array of role names.
    pub roles: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&value.id)
                .map_err(|err| AppError::internal(format!("invalid user id '{}': {err}", value.id)))?,
            provider_id: value.provider_id,
            provider_name: value.provider_name,
            email: value.email,
            photo: value.photo,
            display_name: value.display_name,
            roles: serde_json::from_str(&value.roles)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Profile handed over by the upstream identity provider after sign-in.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamProfile {
    #[schema(example = "google")]
    pub provider_name: String,
    #[schema(example = "108234567890")]
    pub provider_id: String,
    #[schema(example = "anne@example.org")]
    pub email: String,
    pub photo: Option<String>,
    #[schema(example = "Anne Admin")]
    pub display_name: String,
}
