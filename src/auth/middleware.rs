use axum::extract::{FromRequestParts, Path};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::token;
use crate::error::ApiError;
use crate::store::AppState;

/// Caller holding the upload key of the project named in the path.
#[derive(Debug, Clone)]
pub struct ProjectUploader {
    pub project_id: String,
}

impl FromRequestParts<AppState> for ProjectUploader {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(project_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let presented = extract_bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let expected = state
            .config
            .api_keys
            .get(&project_id)
            .ok_or(ApiError::Unauthorized)?;

        if !token::token_matches(&presented, expected) {
            tracing::warn!(%project_id, "upload key mismatch");
            return Err(ApiError::Unauthorized);
        }
        Ok(Self { project_id })
    }
}

/// Operator holding the admin token. Admin routes reject everyone when no
/// token is configured.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .admin_token
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;
        let presented = extract_bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        if token::token_matches(&presented, expected) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}
