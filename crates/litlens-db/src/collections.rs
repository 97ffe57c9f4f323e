//! Collections: named article groupings inside a project.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{Article, Collection};
use uuid::Uuid;

use crate::articles::{ArticleRow, ARTICLE_COLUMNS};
use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct CollectionRepository {
    db: Arc<Database>,
}

impl CollectionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fails with `Conflict` if the project already has a collection of that name.
    pub async fn create(&self, collection: &Collection) -> Result<()> {
        sqlx::query(
            "INSERT INTO collections (id, project_id, name, description, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection.id)
        .bind(collection.project_id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(collection.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, &format!("collection '{}'", collection.name)))?;
        Ok(())
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<Collection>> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "SELECT id, project_id, name, description, created_at FROM collections \
             WHERE project_id = ? AND id = ?",
        )
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Collection::from))
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Collection>> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            "SELECT id, project_id, name, description, created_at FROM collections \
             WHERE project_id = ? ORDER BY name",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Collection::from).collect())
    }

    pub async fn delete(&self, project_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collections WHERE project_id = ? AND id = ?")
            .bind(project_id)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` if the article was already in the collection.
    pub async fn add_article(&self, collection_id: Uuid, pmid: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO collection_articles (collection_id, pmid, added_at) \
             VALUES (?, ?, ?)",
        )
        .bind(collection_id)
        .bind(pmid)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "collection article"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_article(&self, collection_id: Uuid, pmid: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM collection_articles WHERE collection_id = ? AND pmid = ?",
        )
        .bind(collection_id)
        .bind(pmid)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Articles in a collection, most recently added first.
    pub async fn list_articles(&self, collection_id: Uuid) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles a \
             JOIN collection_articles ca ON ca.pmid = a.pmid \
             WHERE ca.collection_id = ? \
             ORDER BY ca.added_at DESC, a.pmid",
            ARTICLE_COLUMNS
        ))
        .bind(collection_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }
}
