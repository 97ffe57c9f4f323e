//! Liveness and database status.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::state::SharedState;

/// GET /api/health - no `User-ID` required
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let database = match state.db.stats().await {
        Ok(stats) => json!({
            "status": "ok",
            "articles": stats.articles,
            "projects": stats.projects,
            "triages": stats.triages,
            "protocols": stats.protocols,
        }),
        Err(e) => {
            warn!(error = %e, "Health check could not read database stats");
            json!({ "status": "unavailable" })
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "llm_model": state.llm.model_id(),
        "database": database,
    }))
}
