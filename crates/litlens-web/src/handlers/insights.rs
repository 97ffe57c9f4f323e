//! Project insights over everything a project has gathered.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use litlens_agents::{InsightsOrchestrator, ProjectSnapshot, TriageSummary};
use litlens_common::ProjectRole;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::{AppEvent, AppState, SharedState};

async fn snapshot(state: &AppState, project_id: Uuid) -> Result<ProjectSnapshot, ApiError> {
    let project = state
        .projects
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", project_id)))?;
    let questions = state.questions.list_for_project(project_id).await?;
    let hypotheses = state.hypotheses.list_for_project(project_id).await?;
    let triages = state.triages.list_for_project(project_id, None).await?;

    let pmids: Vec<String> = triages.iter().map(|t| t.pmid.clone()).collect();
    let titles: HashMap<String, String> = state
        .articles
        .get_many(&pmids)
        .await?
        .into_iter()
        .map(|a| (a.pmid, a.title))
        .collect();

    let triages = triages
        .into_iter()
        .map(|t| TriageSummary {
            title: titles.get(&t.pmid).cloned().unwrap_or_default(),
            pmid: t.pmid,
            status: t.status,
            relevance_score: t.relevance_score,
            key_findings: t.key_findings,
            hypothesis_links: t.hypothesis_links,
        })
        .collect();
    let protocols = state
        .protocols
        .list_for_project(project_id)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    let annotation_count = state.annotations.count_for_project(project_id).await?;

    Ok(ProjectSnapshot {
        project,
        questions,
        hypotheses,
        triages,
        protocols,
        annotation_count: usize::try_from(annotation_count).unwrap_or(0),
    })
}

/// POST /api/projects/{id}/insights - runs the insights pipeline; nothing is stored
#[instrument(skip(state, user), fields(user = %user.as_str()))]
pub async fn generate_insights(
    State(state): State<SharedState>,
    user: UserId,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&state, project_id, &user, ProjectRole::Editor).await?;
    let snapshot = snapshot(&state, project_id).await?;

    let orchestrator = InsightsOrchestrator::new(state.llm.clone(), state.run_settings);
    let insights = orchestrator.run(&snapshot).await;

    let fallbacks = insights.fallbacks();
    info!(
        project_id = %project_id,
        triages = snapshot.triages.len(),
        fallbacks = fallbacks.len(),
        "Insights generated"
    );
    state.publish(AppEvent::InsightsGenerated { project_id, fallbacks });
    Ok(Json(insights))
}
