use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::app::AppState;
use crate::authz::ANONYMOUS_USER;
use crate::errors::AppError;
use crate::models::user::User;

const DEFAULT_EXP_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_minutes: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_minutes: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_minutes,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_minutes = std::env::var("JWT_EXP_MINUTES")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(DEFAULT_EXP_MINUTES))
            .map_err(|_| AppError::configuration("JWT_EXP_MINUTES must be a valid integer"))?;

        Ok(Self::new(secret.into_bytes(), exp_minutes))
    }

    pub fn encode(&self, user: &User) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::minutes(self.exp_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            picture: user.photo.clone(),
            roles: user.roles.clone(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

/// The caller behind a request. Missing, malformed or expired tokens resolve
/// to the anonymous identity instead of rejecting the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER.to_string(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            return Ok(Identity::anonymous());
        };

        // Only the subject is trusted. Roles come from the assignment store,
        // so a revocation holds even while older tokens are still valid.
        match state.jwt.decode(token) {
            Ok(claims) => Ok(Identity { user_id: claims.sub }),
            Err(err) => {
                tracing::debug!(error = %err, "rejected bearer token, continuing as anonymous");
                Ok(Identity::anonymous())
            }
        }
    }
}
