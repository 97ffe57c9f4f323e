//! Article search, lookup, PDF location and article-level analytics.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use litlens_analytics::{SimilarArticle, TtlCache};
use litlens_common::{Article, ProjectRole};
use litlens_ingestion::{extract_text, methods_section, ExtractedText, PdfLocation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{require_role, UserId};
use crate::error::ApiError;
use crate::state::{AppEvent, AppState, SharedState};

const MAX_PMID_LEN: usize = 12;
const DEFAULT_SIMILAR_LIMIT: usize = 10;
const MAX_SIMILAR_LIMIT: usize = 100;
/// Stored articles considered when no project narrows the candidates.
const SIMILARITY_POOL: i64 = 500;

// ── Shared helpers ──────────────────────────────────────────────────────────

pub(crate) fn validate_pmid(pmid: &str) -> Result<(), ApiError> {
    if pmid.is_empty() || pmid.len() > MAX_PMID_LEN || !pmid.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!("invalid PMID '{}'", pmid)));
    }
    Ok(())
}

/// The stored article, or fetched from PubMed and stored on first use.
pub(crate) async fn load_article(state: &AppState, pmid: &str) -> Result<Article, ApiError> {
    validate_pmid(pmid)?;
    if let Some(article) = state.articles.get(pmid).await? {
        return Ok(article);
    }

    let fetched = state.literature.fetch(&[pmid.to_string()]).await?;
    let article = fetched
        .into_iter()
        .find(|a| a.pmid == pmid)
        .ok_or_else(|| ApiError::NotFound(format!("PMID {} not found", pmid)))?;

    state.articles.upsert(&article).await?;
    info!(pmid = %pmid, "Stored article fetched from PubMed");
    state.publish(AppEvent::ArticleStored {
        pmid: article.pmid.clone(),
        title: article.title.clone(),
    });
    Ok(article)
}

/// Locate, download and extract an article's PDF.
pub(crate) async fn fetch_full_text(
    state: &AppState,
    article: &Article,
) -> Result<(PdfLocation, ExtractedText), ApiError> {
    let location = state
        .pdf_resolver
        .resolve(article)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no PDF found for PMID {}", article.pmid)))?;

    let bytes = state.pdf_fetcher.download(&location.url).await?;
    let extracted = tokio::task::spawn_blocking(move || extract_text(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("PDF extraction task failed: {}", e)))??;
    Ok((location, extracted))
}

// ── Search & lookup ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub max: Option<usize>,
}

/// GET /api/articles/search?q=&max= - PubMed search; results are stored
#[instrument(skip(state, _user))]
pub async fn search_articles(
    State(state): State<SharedState>,
    _user: UserId,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query parameter 'q' is required".into()));
    }
    let cap = state.config.sources.max_search_results;
    let max = params.max.unwrap_or(cap).clamp(1, cap.max(1));

    let articles = state.literature.search(query, max).await?;
    state.articles.upsert_many(&articles).await?;
    info!(query = %query, count = articles.len(), "Article search stored results");
    for article in &articles {
        state.publish(AppEvent::ArticleStored {
            pmid: article.pmid.clone(),
            title: article.title.clone(),
        });
    }
    Ok(Json(articles))
}

/// GET /api/articles/{pmid}
pub async fn get_article(
    State(state): State<SharedState>,
    _user: UserId,
    Path(pmid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_article(&state, &pmid).await?))
}

// ── PDF ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PdfUrlResponse {
    pub pmid: String,
    pub url: Option<String>,
    pub source: Option<String>,
    pub open_access: bool,
}

/// GET /articles/{pmid}/pdf-url - best PDF location, `url: null` when none
pub async fn pdf_url(
    State(state): State<SharedState>,
    Path(pmid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = load_article(&state, &pmid).await?;
    let response = match state.pdf_resolver.resolve(&article).await {
        Some(location) => PdfUrlResponse {
            pmid,
            url: Some(location.url),
            source: Some(location.source),
            open_access: location.open_access,
        },
        None => PdfUrlResponse { pmid, url: None, source: None, open_access: false },
    };
    Ok(Json(response))
}

/// GET /api/articles/{pmid}/text - full text and methods section of the PDF
pub async fn article_text(
    State(state): State<SharedState>,
    _user: UserId,
    Path(pmid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = load_article(&state, &pmid).await?;
    let (location, extracted) = fetch_full_text(&state, &article).await?;
    let methods = methods_section(&extracted.text);

    Ok(Json(json!({
        "pmid": pmid,
        "source_url": location.url,
        "pdf_source": location.source,
        "backend": extracted.backend,
        "page_count": extracted.page_count,
        "characters": extracted.text.chars().count(),
        "methods": methods,
        "text": extracted.text,
    })))
}

// ── Analytics ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub project_id: Option<Uuid>,
    pub limit: Option<usize>,
}

/// GET /api/articles/{pmid}/similar?project_id=&limit=
/// Candidates are the project's articles when a project is given, else the
/// most recently stored articles.
pub async fn similar_articles(
    State(state): State<SharedState>,
    user: UserId,
    Path(pmid): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT).clamp(1, MAX_SIMILAR_LIMIT);
    if let Some(project_id) = params.project_id {
        require_role(&state, project_id, &user, ProjectRole::Viewer).await?;
    }
    let target = load_article(&state, &pmid).await?;

    let scope = params.project_id.map(|id| id.to_string()).unwrap_or_else(|| "*".into());
    let limit_part = limit.to_string();
    let key = TtlCache::<Vec<SimilarArticle>>::key(&[
        "similar",
        pmid.as_str(),
        scope.as_str(),
        limit_part.as_str(),
    ]);
    if let Some(similar) = state.similar_cache.get(&key).await {
        return Ok(Json(json!({ "pmid": pmid, "similar": similar })));
    }

    let candidates = match params.project_id {
        Some(project_id) => state.articles.list_for_project(project_id).await?,
        None => state.articles.list_recent(SIMILARITY_POOL).await?,
    };
    let similar = state.similarity.rank(&target, &candidates, limit);
    state.similar_cache.insert(key, similar.clone()).await;

    Ok(Json(json!({ "pmid": pmid, "similar": similar })))
}

/// GET /api/articles/{pmid}/citations
pub async fn article_citations(
    State(state): State<SharedState>,
    _user: UserId,
    Path(pmid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_pmid(&pmid)?;
    Ok(Json(state.citations.analyze(&pmid).await))
}
