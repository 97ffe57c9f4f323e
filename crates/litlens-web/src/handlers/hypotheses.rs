//! Hypotheses of a project, optionally linked to a research question.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{Hypothesis, HypothesisStatus, ProjectRole};
use litlens_db::HypothesisUpdate;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::{AppState, SharedState};

fn validate_statement(statement: &str) -> Result<String, ApiError> {
    let statement = statement.trim();
    if statement.is_empty() {
        return Err(ApiError::BadRequest("hypothesis statement must not be empty".into()));
    }
    Ok(statement.to_string())
}

fn validate_confidence(confidence: f64) -> Result<f64, ApiError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(ApiError::BadRequest(format!("confidence must be within 0..=1, got {}", confidence)))
    }
}

/// The question must belong to the same project.
async fn check_question(state: &AppState, project_id: Uuid, question_id: Uuid) -> Result<(), ApiError> {
    match state.questions.get(project_id, question_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest(format!(
            "research question {} does not belong to this project",
            question_id
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHypothesis {
    pub statement: String,
    pub question_id: Option<Uuid>,
    pub status: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHypothesis {
    pub statement: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<f64>,
}

/// POST /api/projects/{id}/hypotheses
pub async fn create_hypothesis(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateHypothesis>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    if let Some(question_id) = body.question_id {
        check_question(&state, project_id, question_id).await?;
    }

    let hypothesis = Hypothesis {
        id: Uuid::new_v4(),
        project_id,
        question_id: body.question_id,
        statement: validate_statement(&body.statement)?,
        status: body
            .status
            .as_deref()
            .map(HypothesisStatus::parse)
            .unwrap_or(HypothesisStatus::Proposed),
        confidence: body.confidence.map(validate_confidence).transpose()?,
        created_at: Utc::now(),
    };
    state.hypotheses.create(&hypothesis).await?;
    state.projects.touch(project_id).await?;
    Ok((StatusCode::CREATED, Json(hypothesis)))
}

/// GET /api/projects/{id}/hypotheses
pub async fn list_hypotheses(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    Ok(Json(state.hypotheses.list_for_project(project_id).await?))
}

/// PUT /api/projects/{id}/hypotheses/{hid}
pub async fn update_hypothesis(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, hypothesis_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateHypothesis>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let update = HypothesisUpdate {
        statement: body.statement.as_deref().map(validate_statement).transpose()?,
        status: body.status.as_deref().map(HypothesisStatus::parse),
        confidence: body.confidence.map(validate_confidence).transpose()?,
    };
    let hypothesis = state.hypotheses.update(project_id, hypothesis_id, &update).await?;
    state.projects.touch(project_id).await?;
    Ok(Json(hypothesis))
}

/// DELETE /api/projects/{id}/hypotheses/{hid}
pub async fn delete_hypothesis(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, hypothesis_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    if !state.hypotheses.delete(project_id, hypothesis_id).await? {
        return Err(ApiError::NotFound(format!("hypothesis {} not found", hypothesis_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
