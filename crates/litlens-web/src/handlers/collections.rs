//! Named article collections inside a project.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{Collection, ProjectRole};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::handlers::articles::load_article;
use crate::handlers::projects::validate_name;
use crate::state::{AppState, SharedState};

async fn get_collection(
    state: &AppState,
    project_id: Uuid,
    collection_id: Uuid,
) -> Result<Collection, ApiError> {
    state
        .collections
        .get(project_id, collection_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("collection {} not found", collection_id)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCollection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddArticle {
    pub pmid: String,
}

/// POST /api/projects/{id}/collections - names are unique per project
pub async fn create_collection(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateCollection>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let collection = Collection {
        id: Uuid::new_v4(),
        project_id,
        name: validate_name("collection name", &body.name)?,
        description: body.description.filter(|d| !d.trim().is_empty()),
        created_at: Utc::now(),
    };
    state.collections.create(&collection).await?;
    state.projects.touch(project_id).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/projects/{id}/collections
pub async fn list_collections(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    Ok(Json(state.collections.list_for_project(project_id).await?))
}

/// DELETE /api/projects/{id}/collections/{cid}
pub async fn delete_collection(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, collection_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    if !state.collections.delete(project_id, collection_id).await? {
        return Err(ApiError::NotFound(format!("collection {} not found", collection_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/projects/{id}/collections/{cid}/articles - `{pmid}`
/// 201 when added, 200 when the article was already in the collection.
pub async fn add_collection_article(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, collection_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<AddArticle>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    get_collection(&state, project_id, collection_id).await?;
    let article = load_article(&state, body.pmid.trim()).await?;

    let added = state.collections.add_article(collection_id, &article.pmid).await?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({ "collection_id": collection_id, "pmid": article.pmid, "added": added })),
    ))
}

/// GET /api/projects/{id}/collections/{cid}/articles
pub async fn list_collection_articles(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, collection_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    get_collection(&state, project_id, collection_id).await?;
    Ok(Json(state.collections.list_articles(collection_id).await?))
}

/// DELETE /api/projects/{id}/collections/{cid}/articles/{pmid}
pub async fn remove_collection_article(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, collection_id, pmid)): Path<(Uuid, Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    get_collection(&state, project_id, collection_id).await?;
    if !state.collections.remove_article(collection_id, &pmid).await? {
        return Err(ApiError::NotFound(format!("PMID {} is not in this collection", pmid)));
    }
    Ok(StatusCode::NO_CONTENT)
}
