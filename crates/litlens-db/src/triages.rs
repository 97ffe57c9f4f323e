//! Paper triage repository.
//!
//! One triage per (project, article). Re-triaging replaces the stored result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{
    EvidenceExcerpt, HypothesisLink, PaperTriage, QuestionScore, TriageStatus,
};
use sqlx::types::Json;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct TriageRow {
    id: Uuid,
    project_id: Uuid,
    pmid: String,
    status: String,
    relevance_score: f64,
    confidence: f64,
    rationale: String,
    key_findings: Json<Vec<String>>,
    question_scores: Json<Vec<QuestionScore>>,
    evidence: Json<Vec<EvidenceExcerpt>>,
    hypothesis_links: Json<Vec<HypothesisLink>>,
    fallbacks: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl From<TriageRow> for PaperTriage {
    fn from(row: TriageRow) -> Self {
        PaperTriage {
            id: row.id,
            project_id: row.project_id,
            pmid: row.pmid,
            status: TriageStatus::parse(&row.status),
            relevance_score: row.relevance_score,
            confidence: row.confidence,
            rationale: row.rationale,
            key_findings: row.key_findings.0,
            question_scores: row.question_scores.0,
            evidence: row.evidence.0,
            hypothesis_links: row.hypothesis_links.0,
            fallbacks: row.fallbacks.0,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, project_id, pmid, status, relevance_score, confidence, rationale, \
     key_findings, question_scores, evidence, hypothesis_links, fallbacks, created_at";

#[derive(Clone)]
pub struct TriageRepository {
    db: Arc<Database>,
}

impl TriageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a triage, replacing any earlier one for the same article.
    /// Returns the stored row (its id is kept from the first triage).
    pub async fn upsert(&self, triage: &PaperTriage) -> Result<PaperTriage> {
        sqlx::query(
            "INSERT INTO paper_triages (id, project_id, pmid, status, relevance_score, confidence, \
                 rationale, key_findings, question_scores, evidence, hypothesis_links, fallbacks, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(project_id, pmid) DO UPDATE SET \
                status = excluded.status, \
                relevance_score = excluded.relevance_score, \
                confidence = excluded.confidence, \
                rationale = excluded.rationale, \
                key_findings = excluded.key_findings, \
                question_scores = excluded.question_scores, \
                evidence = excluded.evidence, \
                hypothesis_links = excluded.hypothesis_links, \
                fallbacks = excluded.fallbacks, \
                created_at = excluded.created_at",
        )
        .bind(triage.id)
        .bind(triage.project_id)
        .bind(&triage.pmid)
        .bind(triage.status.as_str())
        .bind(triage.relevance_score)
        .bind(triage.confidence)
        .bind(&triage.rationale)
        .bind(Json(&triage.key_findings))
        .bind(Json(&triage.question_scores))
        .bind(Json(&triage.evidence))
        .bind(Json(&triage.hypothesis_links))
        .bind(Json(&triage.fallbacks))
        .bind(triage.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "triage"))?;

        self.get_for_article(triage.project_id, &triage.pmid)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("triage for {}", triage.pmid)))
    }

    /// Lookup by id alone; callers check access to the owning project.
    pub async fn find(&self, id: Uuid) -> Result<Option<PaperTriage>> {
        let row = sqlx::query_as::<_, TriageRow>(&format!(
            "SELECT {} FROM paper_triages WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(PaperTriage::from))
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<PaperTriage>> {
        let row = sqlx::query_as::<_, TriageRow>(&format!(
            "SELECT {} FROM paper_triages WHERE project_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(PaperTriage::from))
    }

    pub async fn get_for_article(&self, project_id: Uuid, pmid: &str) -> Result<Option<PaperTriage>> {
        let row = sqlx::query_as::<_, TriageRow>(&format!(
            "SELECT {} FROM paper_triages WHERE project_id = ? AND pmid = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(pmid)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(PaperTriage::from))
    }

    /// Triages for a project, highest relevance first.
    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        status: Option<TriageStatus>,
    ) -> Result<Vec<PaperTriage>> {
        let rows = sqlx::query_as::<_, TriageRow>(&format!(
            "SELECT {} FROM paper_triages \
             WHERE project_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY relevance_score DESC, pmid",
            COLUMNS
        ))
        .bind(project_id)
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(PaperTriage::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::ArticleRepository;
    use crate::projects::ProjectRepository;
    use litlens_test_utils::{article, project};
    use pretty_assertions::assert_eq;

    fn triage(project_id: Uuid, pmid: &str, score: f64) -> PaperTriage {
        PaperTriage {
            id: Uuid::new_v4(),
            project_id,
            pmid: pmid.to_string(),
            status: TriageStatus::from_score(score),
            relevance_score: score,
            confidence: 0.8,
            rationale: "test".into(),
            key_findings: vec!["finding".into()],
            question_scores: vec![],
            evidence: vec![],
            hypothesis_links: vec![],
            fallbacks: vec![],
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (TriageRepository, Uuid) {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let p = project("alice");
        ProjectRepository::new(db.clone()).create(&p).await.unwrap();
        let articles = ArticleRepository::new(db.clone());
        for pmid in ["1", "2", "3"] {
            articles.upsert(&article(pmid)).await.unwrap();
        }
        (TriageRepository::new(db), p.id)
    }

    #[tokio::test]
    async fn test_retriage_replaces_and_keeps_id() {
        let (repo, pid) = setup().await;
        let first = repo.upsert(&triage(pid, "1", 30.0)).await.unwrap();

        let mut again = triage(pid, "1", 85.0);
        again.fallbacks = vec!["evidence_extraction".into()];
        let second = repo.upsert(&again).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.status, TriageStatus::MustRead);
        assert_eq!(second.fallbacks, vec!["evidence_extraction".to_string()]);
        assert_eq!(repo.list_for_project(pid, None).await.unwrap().len(), 1);
        assert_eq!(repo.find(first.id).await.unwrap().map(|t| t.relevance_score), Some(85.0));
        assert!(repo.find(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_and_filters() {
        let (repo, pid) = setup().await;
        repo.upsert(&triage(pid, "1", 45.0)).await.unwrap();
        repo.upsert(&triage(pid, "2", 90.0)).await.unwrap();
        repo.upsert(&triage(pid, "3", 10.0)).await.unwrap();

        let all: Vec<String> = repo
            .list_for_project(pid, None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.pmid)
            .collect();
        assert_eq!(all, vec!["2", "1", "3"]);

        let must = repo.list_for_project(pid, Some(TriageStatus::MustRead)).await.unwrap();
        assert_eq!(must.len(), 1);
        assert_eq!(must[0].pmid, "2");
    }

    #[tokio::test]
    async fn test_triage_of_unknown_article_is_rejected() {
        let (repo, pid) = setup().await;
        let err = repo.upsert(&triage(pid, "404", 50.0)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
