use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::identity::fetch_user;
use crate::jwt::Identity;
use crate::models::user::User;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    get,
    path = "/auth",
    tag = "Auth",
    responses((status = 200, description = "Auth service banner"))
)]
pub async fn banner() -> Json<Value> {
    Json(json!({ "application": "auth-api" }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "No valid token")
    )
)]
pub async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<User>> {
    if identity.is_anonymous() {
        return Err(AppError::unauthorized("sign in required"));
    }

    let user_id = Uuid::parse_str(&identity.user_id)
        .map_err(|_| AppError::unauthorized("token subject is not a user id"))?;
    let user = fetch_user(&state.pool, user_id).await?;
    Ok(Json(user))
}

/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    get,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged", body = MessageResponse))
)]
pub async fn logout(identity: Identity) -> Json<MessageResponse> {
    tracing::debug!(user_id = %identity.user_id, "logout");
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}
