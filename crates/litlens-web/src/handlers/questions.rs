//! Research questions of a project.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{ProjectRole, QuestionStatus, ResearchQuestion};
use litlens_db::QuestionUpdate;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::SharedState;

const DEFAULT_PRIORITY: u8 = 3;

fn validate_text(text: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("question text must not be empty".into()));
    }
    Ok(text.to_string())
}

fn validate_priority(priority: i64) -> Result<u8, ApiError> {
    match u8::try_from(priority) {
        Ok(p) if (1..=5).contains(&p) => Ok(p),
        _ => Err(ApiError::BadRequest(format!("priority must be 1..=5, got {}", priority))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestion {
    pub text: String,
    pub priority: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuestion {
    pub text: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<String>,
}

/// POST /api/projects/{id}/questions
pub async fn create_question(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateQuestion>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let question = ResearchQuestion {
        id: Uuid::new_v4(),
        project_id,
        text: validate_text(&body.text)?,
        priority: body.priority.map(validate_priority).transpose()?.unwrap_or(DEFAULT_PRIORITY),
        status: body.status.as_deref().map(QuestionStatus::parse).unwrap_or(QuestionStatus::Open),
        created_at: Utc::now(),
    };
    state.questions.create(&question).await?;
    state.projects.touch(project_id).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// GET /api/projects/{id}/questions - by priority, then age
pub async fn list_questions(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    Ok(Json(state.questions.list_for_project(project_id).await?))
}

/// PUT /api/projects/{id}/questions/{qid}
pub async fn update_question(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, question_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateQuestion>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let update = QuestionUpdate {
        text: body.text.as_deref().map(validate_text).transpose()?,
        priority: body.priority.map(validate_priority).transpose()?,
        status: body.status.as_deref().map(QuestionStatus::parse),
    };
    let question = state.questions.update(project_id, question_id, &update).await?;
    state.projects.touch(project_id).await?;
    Ok(Json(question))
}

/// DELETE /api/projects/{id}/questions/{qid} - linked hypotheses are kept, unlinked
pub async fn delete_question(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    if !state.questions.delete(project_id, question_id).await? {
        return Err(ApiError::NotFound(format!("research question {} not found", question_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert_eq!(validate_priority(1).unwrap(), 1);
        assert_eq!(validate_priority(5).unwrap(), 5);
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
        assert!(validate_priority(-1).is_err());
        assert!(validate_priority(300).is_err());
    }
}
