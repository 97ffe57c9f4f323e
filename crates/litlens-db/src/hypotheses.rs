//! Hypothesis repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{Hypothesis, HypothesisStatus};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct HypothesisRow {
    id: Uuid,
    project_id: Uuid,
    question_id: Option<Uuid>,
    statement: String,
    status: String,
    confidence: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<HypothesisRow> for Hypothesis {
    fn from(row: HypothesisRow) -> Self {
        Hypothesis {
            id: row.id,
            project_id: row.project_id,
            question_id: row.question_id,
            statement: row.statement,
            status: HypothesisStatus::parse(&row.status),
            confidence: row.confidence,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HypothesisUpdate {
    pub statement: Option<String>,
    pub status: Option<HypothesisStatus>,
    pub confidence: Option<f64>,
}

const COLUMNS: &str = "id, project_id, question_id, statement, status, confidence, created_at";

#[derive(Clone)]
pub struct HypothesisRepository {
    db: Arc<Database>,
}

impl HypothesisRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, hypothesis: &Hypothesis) -> Result<()> {
        sqlx::query(
            "INSERT INTO hypotheses (id, project_id, question_id, statement, status, confidence, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(hypothesis.id)
        .bind(hypothesis.project_id)
        .bind(hypothesis.question_id)
        .bind(&hypothesis.statement)
        .bind(hypothesis.status.as_str())
        .bind(hypothesis.confidence)
        .bind(hypothesis.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "hypothesis"))?;
        Ok(())
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<Hypothesis>> {
        let row = sqlx::query_as::<_, HypothesisRow>(&format!(
            "SELECT {} FROM hypotheses WHERE project_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Hypothesis::from))
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Hypothesis>> {
        let rows = sqlx::query_as::<_, HypothesisRow>(&format!(
            "SELECT {} FROM hypotheses WHERE project_id = ? ORDER BY created_at",
            COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Hypothesis::from).collect())
    }

    pub async fn update(
        &self,
        project_id: Uuid,
        id: Uuid,
        update: &HypothesisUpdate,
    ) -> Result<Hypothesis> {
        let result = sqlx::query(
            "UPDATE hypotheses SET \
                statement = COALESCE(?, statement), \
                status = COALESCE(?, status), \
                confidence = COALESCE(?, confidence) \
             WHERE project_id = ? AND id = ?",
        )
        .bind(&update.statement)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.confidence)
        .bind(project_id)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("hypothesis {}", id)));
        }
        self.get(project_id, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("hypothesis {}", id)))
    }

    pub async fn delete(&self, project_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM hypotheses WHERE project_id = ? AND id = ?")
            .bind(project_id)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::ProjectRepository;
    use crate::questions::QuestionRepository;
    use litlens_test_utils::{hypothesis, project, question};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_question_delete_unlinks_hypothesis() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let projects = ProjectRepository::new(db.clone());
        let questions = QuestionRepository::new(db.clone());
        let repo = HypothesisRepository::new(db);

        let p = project("alice");
        projects.create(&p).await.unwrap();
        let q = question(p.id, "What drives resistance?");
        questions.create(&q).await.unwrap();

        let mut h = hypothesis(p.id, "MET amplification bypasses KRAS inhibition");
        h.question_id = Some(q.id);
        repo.create(&h).await.unwrap();

        let updated = repo
            .update(
                p.id,
                h.id,
                &HypothesisUpdate {
                    status: Some(HypothesisStatus::Supported),
                    confidence: Some(0.7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, HypothesisStatus::Supported);
        assert_eq!(updated.confidence, Some(0.7));

        questions.delete(p.id, q.id).await.unwrap();
        let after = repo.get(p.id, h.id).await.unwrap().unwrap();
        assert_eq!(after.question_id, None);
    }

    #[tokio::test]
    async fn test_hypothesis_for_missing_project_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let repo = HypothesisRepository::new(Arc::new(db));
        let err = repo.create(&hypothesis(Uuid::new_v4(), "orphan")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
