//! Axum router — maps all URL paths to handlers.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    health::health,
    articles::{search_articles, get_article, pdf_url, article_text, similar_articles, article_citations},
    projects::{create_project, list_projects, get_project, update_project, delete_project,
               add_collaborator, remove_collaborator},
    questions::{create_question, list_questions, update_question, delete_question},
    hypotheses::{create_hypothesis, list_hypotheses, update_hypothesis, delete_hypothesis},
    triage::{run_triage, list_project_triages, get_triage},
    protocols::{extract_protocol, list_protocols, get_protocol},
    insights::generate_insights,
    collections::{create_collection, list_collections, delete_collection,
                  add_collection_article, list_collection_articles, remove_collection_article},
    annotations::{create_annotation, list_annotations, delete_annotation},
    alerts::{list_alerts, dismiss_alert},
    analytics::{project_timeline, project_authors},
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/api/health", get(health))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Articles
        .route("/api/articles/search",           get(search_articles))
        .route("/api/articles/{pmid}",           get(get_article))
        .route("/api/articles/{pmid}/text",      get(article_text))
        .route("/api/articles/{pmid}/similar",   get(similar_articles))
        .route("/api/articles/{pmid}/citations", get(article_citations))
        .route("/articles/{pmid}/pdf-url",       get(pdf_url))

        // Projects
        .route("/api/projects",      post(create_project).get(list_projects))
        .route("/api/projects/{id}", get(get_project).put(update_project).delete(delete_project))
        .route("/api/projects/{id}/collaborators",           post(add_collaborator))
        .route("/api/projects/{id}/collaborators/{user_id}", delete(remove_collaborator))
        .route("/api/projects/{id}/questions",       post(create_question).get(list_questions))
        .route("/api/projects/{id}/questions/{qid}", put(update_question).delete(delete_question))
        .route("/api/projects/{id}/hypotheses",       post(create_hypothesis).get(list_hypotheses))
        .route("/api/projects/{id}/hypotheses/{hid}", put(update_hypothesis).delete(delete_hypothesis))

        // Pipelines
        .route("/api/triage",                      post(run_triage))
        .route("/api/triage/project/{project_id}", get(list_project_triages))
        .route("/api/triage/{id}",                 get(get_triage))
        .route("/api/protocols/extract",           post(extract_protocol))
        .route("/api/protocols/{id}",              get(get_protocol))
        .route("/api/projects/{id}/protocols",     get(list_protocols))
        .route("/api/projects/{id}/insights",      post(generate_insights))

        // Collections, annotations, alerts
        .route("/api/projects/{id}/collections",       post(create_collection).get(list_collections))
        .route("/api/projects/{id}/collections/{cid}", delete(delete_collection))
        .route("/api/projects/{id}/collections/{cid}/articles",
               post(add_collection_article).get(list_collection_articles))
        .route("/api/projects/{id}/collections/{cid}/articles/{pmid}",
               delete(remove_collection_article))
        .route("/api/projects/{id}/annotations",       post(create_annotation).get(list_annotations))
        .route("/api/projects/{id}/annotations/{aid}", delete(delete_annotation))
        .route("/api/projects/{id}/alerts",                    get(list_alerts))
        .route("/api/projects/{id}/alerts/{alert_id}/dismiss", post(dismiss_alert))

        // Project analytics
        .route("/api/projects/{id}/timeline", get(project_timeline))
        .route("/api/projects/{id}/authors",  get(project_authors))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
