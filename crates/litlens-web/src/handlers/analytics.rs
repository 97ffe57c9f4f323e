//! Project-level literature analytics over triaged and collected articles.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use litlens_analytics::{authors, timeline};
use litlens_common::ProjectRole;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/projects/{id}/timeline
pub async fn project_timeline(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let articles = state.articles.list_for_project(project_id).await?;
    Ok(Json(timeline::build(&articles)))
}

/// GET /api/projects/{id}/authors
pub async fn project_authors(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let articles = state.articles.list_for_project(project_id).await?;
    Ok(Json(authors::analyze(&articles)))
}
