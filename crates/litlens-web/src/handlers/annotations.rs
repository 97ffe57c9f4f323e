//! Annotations: free-text notes on a project or on one of its articles.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{Annotation, NoteType, ProjectRole};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::handlers::articles::validate_pmid;
use crate::state::SharedState;

const MAX_CONTENT_CHARS: usize = 20_000;

#[derive(Debug, Deserialize)]
pub struct CreateAnnotation {
    pub content: String,
    pub pmid: Option<String>,
    pub note_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnnotationParams {
    pub pmid: Option<String>,
}

/// POST /api/projects/{id}/annotations
pub async fn create_annotation(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateAnnotation>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;

    let content = body.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("annotation content must not be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "annotation content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    let pmid = body.pmid.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    if let Some(pmid) = &pmid {
        validate_pmid(pmid)?;
    }

    let annotation = Annotation {
        id: Uuid::new_v4(),
        project_id,
        pmid,
        author_id: user.as_str().to_string(),
        content: content.to_string(),
        note_type: body.note_type.as_deref().map(NoteType::parse).unwrap_or(NoteType::Note),
        created_at: Utc::now(),
    };
    state.annotations.create(&annotation).await?;
    state.projects.touch(project_id).await?;
    Ok((StatusCode::CREATED, Json(annotation)))
}

/// GET /api/projects/{id}/annotations?pmid= - newest first
pub async fn list_annotations(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Query(params): Query<AnnotationParams>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let pmid = params.pmid.as_deref().filter(|p| !p.is_empty());
    Ok(Json(state.annotations.list_for_project(project_id, pmid).await?))
}

/// DELETE /api/projects/{id}/annotations/{aid} - the author or the project owner
pub async fn delete_annotation(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, annotation_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let role = require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let annotation = state
        .annotations
        .get(project_id, annotation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("annotation {} not found", annotation_id)))?;

    if annotation.author_id != user.as_str() && role != ProjectRole::Owner {
        return Err(ApiError::Forbidden(
            "only the author or the project owner can delete an annotation".into(),
        ));
    }
    state.annotations.delete(project_id, annotation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
