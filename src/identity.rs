//! Local user records for externally authenticated callers.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{roles, Policy, RoleAssignments};
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, UpstreamProfile, User};
use crate::utils::utc_now;

const USER_COLUMNS: &str = "id, provider_id, provider_name, email, photo, display_name, roles, created_at, updated_at";

pub async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?
        .try_into()
}

async fn find_by_provider(pool: &SqlitePool, provider_name: &str, provider_id: &str) -> AppResult<Option<User>> {
    sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE provider_name = ? AND provider_id = ?"
    ))
    .bind(provider_name)
    .bind(provider_id)
    .fetch_optional(pool)
    .await?
    .map(User::try_from)
    .transpose()
}

pub async fn list_users(pool: &SqlitePool) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at"))
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}

/// Upserts the local record for an upstream profile.
///
/// First sign-in creates the user holding only `guest`; later sign-ins refresh
/// the profile fields and keep the stored roles. The stored roles are then
/// merged into `assignments`.
pub async fn sync_profile(pool: &SqlitePool, assignments: &RoleAssignments, profile: &UpstreamProfile) -> AppResult<User> {
    if profile.provider_name.trim().is_empty() || profile.provider_id.trim().is_empty() {
        return Err(AppError::bad_request("providerName and providerId are required"));
    }

    let now = utc_now();
    let user = match find_by_provider(pool, &profile.provider_name, &profile.provider_id).await? {
        Some(existing) => {
            sqlx::query("UPDATE users SET email = ?, photo = ?, display_name = ?, updated_at = ? WHERE id = ?")
                .bind(&profile.email)
                .bind(&profile.photo)
                .bind(&profile.display_name)
                .bind(now)
                .bind(existing.id.to_string())
                .execute(pool)
                .await?;
            fetch_user(pool, existing.id).await?
        }
        None => {
            let id = Uuid::new_v4();
            let initial = serde_json::to_string(&[roles::GUEST])?;
            sqlx::query(&format!(
                "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(id.to_string())
            .bind(&profile.provider_id)
            .bind(&profile.provider_name)
            .bind(&profile.email)
            .bind(&profile.photo)
            .bind(&profile.display_name)
            .bind(initial)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
            tracing::info!(user_id = %id, provider = %profile.provider_name, "registered new user");
            fetch_user(pool, id).await?
        }
    };

    assignments.add_roles(&user.id.to_string(), &user.roles).await;
    Ok(user)
}

/// Adds `granted` to a user's stored roles. Roles unknown to `policy` are
/// rejected.
pub async fn grant_roles(
    pool: &SqlitePool,
    policy: &Policy,
    assignments: &RoleAssignments,
    user_id: Uuid,
    granted: &[String],
) -> AppResult<User> {
    let known = policy.roles();
    if let Some(unknown) = granted.iter().find(|role| !known.contains(role.as_str())) {
        return Err(AppError::bad_request(format!("unknown role '{unknown}'")));
    }

    let mut user = fetch_user(pool, user_id).await?;
    for role in granted {
        if !user.roles.contains(role) {
            user.roles.push(role.clone());
        }
    }

    sqlx::query("UPDATE users SET roles = ?, updated_at = ? WHERE id = ?")
        .bind(serde_json::to_string(&user.roles)?)
        .bind(utc_now())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    assignments.add_roles(&user_id.to_string(), &user.roles).await;
    tracing::info!(user_id = %user_id, roles = ?user.roles, "roles granted");

    fetch_user(pool, user_id).await
}

/// Removes `revoked` from a user's stored roles and from `assignments`.
/// Roles the user does not hold are ignored.
pub async fn revoke_roles(
    pool: &SqlitePool,
    assignments: &RoleAssignments,
    user_id: Uuid,
    revoked: &[String],
) -> AppResult<User> {
    let mut user = fetch_user(pool, user_id).await?;
    user.roles.retain(|role| !revoked.contains(role));

    sqlx::query("UPDATE users SET roles = ?, updated_at = ? WHERE id = ?")
        .bind(serde_json::to_string(&user.roles)?)
        .bind(utc_now())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    let removed = assignments.remove_roles(&user_id.to_string(), revoked).await;
    tracing::info!(user_id = %user_id, removed, roles = ?user.roles, "roles revoked");

    fetch_user(pool, user_id).await
}

/// Loads every stored user's roles into `assignments`; returns the number of
/// users loaded.
pub async fn hydrate_assignments(pool: &SqlitePool, assignments: &RoleAssignments) -> AppResult<usize> {
    let users = list_users(pool).await?;
    for user in &users {
        assignments.add_roles(&user.id.to_string(), &user.roles).await;
    }
    Ok(users.len())
}
