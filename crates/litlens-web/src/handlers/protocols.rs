//! Protocol extraction and stored protocols.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use litlens_agents::{ProtocolInput, ProtocolOrchestrator};
use litlens_common::{AlertKind, Article, ProjectRole};
use litlens_ingestion::methods_section;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::handlers::alerts::raise_alert;
use crate::handlers::articles::{fetch_full_text, load_article};
use crate::state::{AppEvent, AppState, SharedState};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub project_id: Uuid,
    pub pmid: String,
    #[serde(default)]
    pub use_pdf: bool,
}

/// Methods section of the article's PDF. Any failure along the way leaves
/// the pipeline on the abstract.
async fn pdf_methods(state: &AppState, article: &Article) -> Option<String> {
    match fetch_full_text(state, article).await {
        Ok((location, extracted)) => {
            let methods = methods_section(&extracted.text);
            info!(
                pmid = %article.pmid,
                pdf_source = %location.source,
                backend = extracted.backend,
                found_methods = methods.is_some(),
                "Full text extracted"
            );
            methods
        }
        Err(e) => {
            warn!(pmid = %article.pmid, error = %e, "Full text unavailable, using abstract");
            None
        }
    }
}

/// POST /api/protocols/extract - `{project_id, pmid, use_pdf?}`
/// Nothing is stored when no materials, equipment or steps were extracted.
#[instrument(skip(state, user), fields(user = %user.as_str()))]
pub async fn extract_protocol(
    State(state): State<SharedState>,
    user: UserId,
    Json(body): Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = body.project_id;
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let article = load_article(&state, &body.pmid).await?;

    let methods = if body.use_pdf {
        pdf_methods(&state, &article).await
    } else {
        None
    };

    let orchestrator = ProtocolOrchestrator::new(state.llm.clone(), state.run_settings);
    let outcome = orchestrator
        .run(ProtocolInput { article: &article, methods_text: methods.as_deref() })
        .await;
    let source = outcome.source;
    let steps = outcome.step_reports.clone();

    if outcome.is_empty() {
        info!(pmid = %article.pmid, "No protocol content extracted");
        return Ok((
            StatusCode::OK,
            Json(json!({ "protocol": null, "methods_source": source, "steps": steps })),
        ));
    }

    let protocol = outcome.into_protocol(project_id, &article.pmid);
    state.protocols.insert(&protocol).await?;
    state.projects.touch(project_id).await?;
    info!(protocol_id = %protocol.id, steps = protocol.steps.len(), "Protocol stored");
    state.publish(AppEvent::ProtocolExtracted {
        project_id,
        pmid: protocol.pmid.clone(),
        protocol_id: protocol.id,
        name: protocol.name.clone(),
    });

    let alert = raise_alert(
        &state,
        project_id,
        AlertKind::ProtocolReady,
        format!("Protocol ready: {}", protocol.name),
        format!(
            "{} materials, {} equipment items and {} steps extracted from PMID {}",
            protocol.materials.len(),
            protocol.equipment.len(),
            protocol.steps.len(),
            protocol.pmid
        ),
        Some(protocol.pmid.clone()),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "protocol": protocol,
            "methods_source": source,
            "steps": steps,
            "alert": alert,
        })),
    ))
}

/// GET /api/projects/{id}/protocols - newest first
pub async fn list_protocols(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    Ok(Json(state.protocols.list_for_project(project_id).await?))
}

/// GET /api/protocols/{id}
pub async fn get_protocol(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("protocol {} not found", id));
    let protocol = state.protocols.find(id).await?.ok_or_else(not_found)?;
    require_role(&state, protocol.project_id, &user, ProjectRole::Viewer)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => not_found(),
            other => other,
        })?;
    Ok(Json(protocol))
}
