//! Project alerts: raised by triage and protocol extraction, listed and
//! dismissed by collaborators.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use litlens_common::{AlertKind, ProjectAlert, ProjectRole};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::{AppEvent, AppState, SharedState};

/// Store an alert and announce it on the event stream. An alert of the same
/// kind for the same article is refreshed in place and not announced again.
pub(crate) async fn raise_alert(
    state: &AppState,
    project_id: Uuid,
    kind: AlertKind,
    title: String,
    body: String,
    pmid: Option<String>,
) -> Result<ProjectAlert, ApiError> {
    let alert = ProjectAlert {
        id: Uuid::new_v4(),
        project_id,
        kind,
        title,
        body,
        pmid,
        dismissed: false,
        created_at: Utc::now(),
    };
    let (alert, created) = state.alerts.upsert_for_article(&alert).await?;
    if !created {
        debug!(project_id = %project_id, alert_id = %alert.id, kind = kind.as_str(), "Alert refreshed");
        return Ok(alert);
    }
    info!(project_id = %project_id, kind = kind.as_str(), "Alert raised");
    state.publish(AppEvent::AlertRaised {
        project_id,
        alert_id: alert.id,
        title: alert.title.clone(),
    });
    Ok(alert)
}

#[derive(Debug, Deserialize)]
pub struct AlertParams {
    #[serde(default)]
    pub include_dismissed: bool,
}

/// GET /api/projects/{id}/alerts?include_dismissed=
pub async fn list_alerts(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Query(params): Query<AlertParams>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let alerts = state
        .alerts
        .list_for_project(project_id, params.include_dismissed)
        .await?;
    Ok(Json(alerts))
}

/// POST /api/projects/{id}/alerts/{alert_id}/dismiss
pub async fn dismiss_alert(
    State(state): State<SharedState>,
    user: UserId,
    Path((project_id, alert_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    if !state.alerts.dismiss(project_id, alert_id).await? {
        return Err(ApiError::NotFound(format!("alert {} not found", alert_id)));
    }
    Ok(Json(json!({ "id": alert_id, "dismissed": true })))
}
