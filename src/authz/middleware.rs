use axum::extract::{OriginalUri, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::{AccessPolicy, Action};
use crate::app::AppState;
use crate::errors::AppError;
use crate::jwt::Identity;

/// Number of leading path segments that name a protected resource,
/// e.g. `/tournament/results/42` guards `/tournament/results`.
const RESOURCE_DEPTH: usize = 2;

/// Reduces a request path to the resource it addresses.
pub fn resource_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .take(RESOURCE_DEPTH)
        .collect();
    format!("/{}", segments.join("/"))
}

/// Rejects the request with 403 unless the caller may perform the request's
/// method on its resource. Runs before routing, so a disabled method is only
/// reported to callers who would otherwise be allowed.
pub async fn enforce_acl(
    State(state): State<AppState>,
    identity: Identity,
    OriginalUri(uri): OriginalUri,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let resource = resource_path(uri.path());
    let method = request.method().clone();

    let allowed = match Action::from_method(&method) {
        Some(action) => state.authz.is_allowed(&identity.user_id, &resource, action).await,
        None => false,
    };

    if !allowed {
        tracing::warn!(
            user_id = %identity.user_id,
            resource = %resource,
            method = %method,
            "access denied"
        );
        return Err(AppError::forbidden(format!(
            "{} may not {} {}",
            identity.user_id,
            method.as_str().to_ascii_lowercase(),
            resource
        )));
    }

    Ok(next.run(request).await)
}
