//! Annotation repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{Annotation, NoteType};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct AnnotationRow {
    id: Uuid,
    project_id: Uuid,
    pmid: Option<String>,
    author_id: String,
    content: String,
    note_type: String,
    created_at: DateTime<Utc>,
}

impl From<AnnotationRow> for Annotation {
    fn from(row: AnnotationRow) -> Self {
        Annotation {
            id: row.id,
            project_id: row.project_id,
            pmid: row.pmid,
            author_id: row.author_id,
            content: row.content,
            note_type: NoteType::parse(&row.note_type),
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, project_id, pmid, author_id, content, note_type, created_at";

#[derive(Clone)]
pub struct AnnotationRepository {
    db: Arc<Database>,
}

impl AnnotationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, annotation: &Annotation) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO annotations ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(annotation.id)
        .bind(annotation.project_id)
        .bind(&annotation.pmid)
        .bind(&annotation.author_id)
        .bind(&annotation.content)
        .bind(annotation.note_type.as_str())
        .bind(annotation.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "annotation"))?;
        Ok(())
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<Annotation>> {
        let row = sqlx::query_as::<_, AnnotationRow>(&format!(
            "SELECT {} FROM annotations WHERE project_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Annotation::from))
    }

    /// Newest first, optionally limited to one article.
    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        pmid: Option<&str>,
    ) -> Result<Vec<Annotation>> {
        let rows = sqlx::query_as::<_, AnnotationRow>(&format!(
            "SELECT {} FROM annotations \
             WHERE project_id = ? AND (? IS NULL OR pmid = ?) \
             ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(project_id)
        .bind(pmid)
        .bind(pmid)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Annotation::from).collect())
    }

    pub async fn count_for_project(&self, project_id: Uuid) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM annotations WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(n)
    }

    pub async fn delete(&self, project_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM annotations WHERE project_id = ? AND id = ?")
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
    use litlens_test_utils::project;
    use pretty_assertions::assert_eq;

    fn note(project_id: Uuid, pmid: Option<&str>, content: &str) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            project_id,
            pmid: pmid.map(str::to_string),
            author_id: "alice".into(),
            content: content.into(),
            note_type: NoteType::Finding,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_filter_by_article() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let p = project("alice");
        ProjectRepository::new(db.clone()).create(&p).await.unwrap();
        let repo = AnnotationRepository::new(db);

        repo.create(&note(p.id, Some("1"), "on paper one")).await.unwrap();
        repo.create(&note(p.id, Some("2"), "on paper two")).await.unwrap();
        repo.create(&note(p.id, None, "project-wide")).await.unwrap();

        assert_eq!(repo.list_for_project(p.id, None).await.unwrap().len(), 3);
        let one = repo.list_for_project(p.id, Some("1")).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].content, "on paper one");
        assert_eq!(one[0].note_type, NoteType::Finding);
        assert_eq!(repo.count_for_project(p.id).await.unwrap(), 3);
    }
}
