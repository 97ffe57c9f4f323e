//! Paper triage: run the triage pipeline for a project and read back results.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use litlens_agents::{TriageInput, TriageOrchestrator};
use litlens_common::{AlertKind, HypothesisRelation, ProjectRole, QuestionStatus, TriageStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::handlers::alerts::raise_alert;
use crate::handlers::articles::load_article;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct TriageRequest {
    pub project_id: Uuid,
    pub pmid: String,
}

/// POST /api/triage - triage one article for a project. Re-triaging replaces
/// the previous result. A score at or above the alert threshold raises a
/// high-relevance alert; supporting or contradicting evidence for a
/// hypothesis raises a hypothesis alert.
#[instrument(skip(state, user), fields(user = %user.as_str()))]
pub async fn run_triage(
    State(state): State<SharedState>,
    user: UserId,
    Json(body): Json<TriageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = body.project_id;
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;

    let project = state
        .projects
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", project_id)))?;
    let article = load_article(&state, &body.pmid).await?;
    let questions: Vec<_> = state
        .questions
        .list_for_project(project_id)
        .await?
        .into_iter()
        .filter(|q| q.status == QuestionStatus::Open)
        .collect();
    let hypotheses = state.hypotheses.list_for_project(project_id).await?;

    let orchestrator = TriageOrchestrator::new(state.llm.clone(), state.run_settings);
    let outcome = orchestrator
        .run(TriageInput {
            article: &article,
            project: &project,
            questions: &questions,
            hypotheses: &hypotheses,
        })
        .await;
    let steps = outcome.steps.clone();

    let triage = state
        .triages
        .upsert(&outcome.into_triage(project_id, &article.pmid))
        .await?;
    state.projects.touch(project_id).await?;
    info!(
        pmid = %triage.pmid,
        status = triage.status.as_str(),
        score = triage.relevance_score,
        fallbacks = triage.fallbacks.len(),
        "Triage stored"
    );
    state.publish(AppEvent::TriageCompleted {
        project_id,
        pmid: triage.pmid.clone(),
        status: triage.status,
        score: triage.relevance_score,
    });

    let mut alerts = Vec::new();
    if triage.relevance_score >= state.config.triage.alert_threshold {
        alerts.push(
            raise_alert(
                &state,
                project_id,
                AlertKind::HighRelevancePaper,
                format!("High-relevance paper: {}", article.title),
                format!(
                    "PMID {} scored {:.0}/100 ({}). {}",
                    article.pmid,
                    triage.relevance_score,
                    triage.status.as_str(),
                    triage.rationale
                ),
                Some(article.pmid.clone()),
            )
            .await?,
        );
    }

    let decisive: Vec<_> = triage
        .hypothesis_links
        .iter()
        .filter(|l| l.relationship != HypothesisRelation::Neutral)
        .collect();
    if !decisive.is_empty() {
        let summary = decisive
            .iter()
            .map(|l| {
                let statement = hypotheses
                    .iter()
                    .find(|h| h.id == l.hypothesis_id)
                    .map(|h| h.statement.as_str())
                    .unwrap_or("unknown hypothesis");
                let verb = match l.relationship {
                    HypothesisRelation::Supports => "supports",
                    _ => "contradicts",
                };
                format!("{} \"{}\"", verb, statement)
            })
            .collect::<Vec<_>>()
            .join("; ");
        alerts.push(
            raise_alert(
                &state,
                project_id,
                AlertKind::HypothesisEvidence,
                format!("New evidence in PMID {}", article.pmid),
                format!("{}: {}", article.title, summary),
                Some(article.pmid.clone()),
            )
            .await?,
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "triage": triage, "steps": steps, "alerts": alerts })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TriageListParams {
    pub status: Option<String>,
}

/// GET /api/triage/project/{project_id}?status= - highest score first
pub async fn list_project_triages(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
    Query(params): Query<TriageListParams>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    let status = match params.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            TriageStatus::try_parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown triage status '{}'", raw)))?,
        ),
        None => None,
    };
    Ok(Json(state.triages.list_for_project(project_id, status).await?))
}

/// GET /api/triage/{id}
pub async fn get_triage(
    State(state): State<SharedState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let triage = state
        .triages
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("triage {} not found", id)))?;
    require_role(&state, triage.project_id, &user, ProjectRole::Viewer)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::NotFound(format!("triage {} not found", id)),
            other => other,
        })?;
    Ok(Json(triage))
}
