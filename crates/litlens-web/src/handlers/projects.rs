//! Projects and their collaborators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{Collaborator, Project, ProjectRole};
use litlens_db::ProjectUpdate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::SharedState;

const MAX_NAME_LEN: usize = 200;

pub(crate) fn validate_name(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(value.to_string())
}

/// Blank descriptions are stored as absent.
fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

// ── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub role: ProjectRole,
    pub collaborators: Vec<Collaborator>,
}

/// POST /api/projects - the caller becomes the owner
pub async fn create_project(
    State(state): State<SharedState>,
    user: UserId,
    Json(body): Json<CreateProject>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        owner_id: user.as_str().to_string(),
        name: validate_name("name", &body.name)?,
        description: clean_description(body.description),
        created_at: now,
        updated_at: now,
    };
    state.projects.create(&project).await?;
    info!(project_id = %project.id, owner = %project.owner_id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects - projects the caller owns or collaborates on
pub async fn list_projects(
    State(state): State<SharedState>,
    user: UserId,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projects.list_for_user(user.as_str()).await?))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let role = require_role(&state, id, &user, ProjectRole::Viewer).await?;
    let project = state
        .projects
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", id)))?;
    let collaborators = state.projects.list_collaborators(id).await?;
    Ok(Json(ProjectDetail { project, role, collaborators }))
}

/// PUT /api/projects/{id}
pub async fn update_project(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProject>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, id, &user, ProjectRole::Editor).await?;
    let update = ProjectUpdate {
        name: body.name.as_deref().map(|n| validate_name("name", n)).transpose()?,
        description: clean_description(body.description),
    };
    Ok(Json(state.projects.update(id, &update).await?))
}

/// DELETE /api/projects/{id} - owner only; cascades to everything the project holds
pub async fn delete_project(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, id, &user, ProjectRole::Owner).await?;
    if !state.projects.delete(id).await? {
        return Err(ApiError::NotFound(format!("project {} not found", id)));
    }
    info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Collaborators ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddCollaborator {
    pub user_id: String,
    pub role: String,
}

/// POST /api/projects/{id}/collaborators - owner only; re-adding changes the role
pub async fn add_collaborator(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(body): Json<AddCollaborator>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, id, &user, ProjectRole::Owner).await?;

    let role = ProjectRole::try_parse(&body.role)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown role '{}'", body.role)))?;
    if role == ProjectRole::Owner {
        return Err(ApiError::BadRequest("a project has exactly one owner".into()));
    }
    let collaborator = UserId::parse(&body.user_id)
        .map_err(|_| ApiError::BadRequest("user_id must be 1 to 128 characters".into()))?;
    if collaborator == user {
        return Err(ApiError::BadRequest("the owner cannot be added as a collaborator".into()));
    }

    let added = state
        .projects
        .add_collaborator(id, collaborator.as_str(), role)
        .await?;
    state.projects.touch(id).await?;
    info!(project_id = %id, user_id = %added.user_id, role = role.as_str(), "Collaborator added");
    Ok((StatusCode::CREATED, Json(added)))
}

/// DELETE /api/projects/{id}/collaborators/{user_id}
pub async fn remove_collaborator(
    State(state): State<SharedState>,
    user: UserId,
    Path((id, collaborator)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, id, &user, ProjectRole::Owner).await?;
    if !state.projects.remove_collaborator(id, &collaborator).await? {
        return Err(ApiError::NotFound(format!("{} is not a collaborator", collaborator)));
    }
    Ok(StatusCode::NO_CONTENT)
}
