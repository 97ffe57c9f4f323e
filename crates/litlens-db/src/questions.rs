//! Research question repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{QuestionStatus, ResearchQuestion};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    project_id: Uuid,
    text: String,
    priority: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<QuestionRow> for ResearchQuestion {
    fn from(row: QuestionRow) -> Self {
        ResearchQuestion {
            id: row.id,
            project_id: row.project_id,
            text: row.text,
            priority: row.priority.clamp(1, 5) as u8,
            status: QuestionStatus::parse(&row.status),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuestionUpdate {
    pub text: Option<String>,
    pub priority: Option<u8>,
    pub status: Option<QuestionStatus>,
}

const COLUMNS: &str = "id, project_id, text, priority, status, created_at";

#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<Database>,
}

impl QuestionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, question: &ResearchQuestion) -> Result<()> {
        sqlx::query(
            "INSERT INTO research_questions (id, project_id, text, priority, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(question.id)
        .bind(question.project_id)
        .bind(&question.text)
        .bind(i64::from(question.priority))
        .bind(question.status.as_str())
        .bind(question.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "research question"))?;
        Ok(())
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<ResearchQuestion>> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM research_questions WHERE project_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(ResearchQuestion::from))
    }

    /// Questions ordered by priority (1 first), then age.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ResearchQuestion>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM research_questions WHERE project_id = ? \
             ORDER BY priority, created_at",
            COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(ResearchQuestion::from).collect())
    }

    pub async fn update(
        &self,
        project_id: Uuid,
        id: Uuid,
        update: &QuestionUpdate,
    ) -> Result<ResearchQuestion> {
        let result = sqlx::query(
            "UPDATE research_questions SET \
                text = COALESCE(?, text), \
                priority = COALESCE(?, priority), \
                status = COALESCE(?, status) \
             WHERE project_id = ? AND id = ?",
        )
        .bind(&update.text)
        .bind(update.priority.map(i64::from))
        .bind(update.status.map(|s| s.as_str()))
        .bind(project_id)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("research question {}", id)));
        }
        self.get(project_id, id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("research question {}", id)))
    }

    pub async fn delete(&self, project_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM research_questions WHERE project_id = ? AND id = ?")
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
    use litlens_test_utils::{project, question};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_crud_scoped_to_project() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let projects = ProjectRepository::new(db.clone());
        let repo = QuestionRepository::new(db);

        let p = project("alice");
        projects.create(&p).await.unwrap();

        let mut low = question(p.id, "Which biomarkers predict response?");
        low.priority = 4;
        let high = question(p.id, "What drives acquired resistance?");
        repo.create(&low).await.unwrap();
        repo.create(&high).await.unwrap();

        let listed = repo.list_for_project(p.id).await.unwrap();
        assert_eq!(listed[0].id, high.id);

        let updated = repo
            .update(
                p.id,
                low.id,
                &QuestionUpdate { status: Some(QuestionStatus::Answered), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, QuestionStatus::Answered);
        assert_eq!(updated.text, low.text);

        // Another project's id does not reach this question.
        assert!(repo.get(Uuid::new_v4(), low.id).await.unwrap().is_none());
        assert!(!repo.delete(Uuid::new_v4(), low.id).await.unwrap());
        assert!(repo.delete(p.id, low.id).await.unwrap());
    }
}
