use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::helpers::ListResponse;
use crate::auth::Admin;
use crate::error::ApiError;
use crate::store::{AppState, Deployment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub project_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/deployment", get(list_deployments))
        .route("/api/admin/deployment/{id}", get(get_deployment))
}

async fn list_deployments(
    State(state): State<AppState>,
    _admin: Admin,
    Query(params): Query<ListParams>,
) -> Json<ListResponse<Deployment>> {
    let limit = params.limit.unwrap_or(50).min(100);
    let offset = params.offset.unwrap_or(0);
    let (items, total) = state
        .deployments
        .list(params.project_id.as_deref(), limit, offset)
        .await;
    Json(ListResponse { items, total })
}

async fn get_deployment(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<Uuid>,
) -> Result<Json<Deployment>, ApiError> {
    state
        .deployments
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("deployment".into()))
}
