//! Article repository.
//!
//! Articles are keyed by PMID and shared by every project.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::Article;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pmid: String,
    title: String,
    abstract_text: Option<String>,
    authors: Json<Vec<String>>,
    journal: Option<String>,
    publication_year: Option<i64>,
    doi: Option<String>,
    pmcid: Option<String>,
    mesh_terms: Json<Vec<String>>,
    keywords: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            pmid: row.pmid,
            title: row.title,
            abstract_text: row.abstract_text,
            authors: row.authors.0,
            journal: row.journal,
            publication_year: row.publication_year.map(|y| y as i32),
            doi: row.doi,
            pmcid: row.pmcid,
            mesh_terms: row.mesh_terms.0,
            keywords: row.keywords.0,
            created_at: row.created_at,
        }
    }
}

pub(crate) const ARTICLE_COLUMNS: &str = "a.pmid, a.title, a.abstract_text, a.authors, a.journal, \
     a.publication_year, a.doi, a.pmcid, a.mesh_terms, a.keywords, a.created_at";

/// Repository for article operations.
#[derive(Clone)]
pub struct ArticleRepository {
    db: Arc<Database>,
}

impl ArticleRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or refresh an article. The original `created_at` is kept.
    pub async fn upsert(&self, article: &Article) -> Result<()> {
        sqlx::query(
            "INSERT INTO articles (pmid, title, abstract_text, authors, journal, publication_year, \
                                   doi, pmcid, mesh_terms, keywords, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(pmid) DO UPDATE SET \
                title = excluded.title, \
                abstract_text = COALESCE(excluded.abstract_text, articles.abstract_text), \
                authors = excluded.authors, \
                journal = COALESCE(excluded.journal, articles.journal), \
                publication_year = COALESCE(excluded.publication_year, articles.publication_year), \
                doi = COALESCE(excluded.doi, articles.doi), \
                pmcid = COALESCE(excluded.pmcid, articles.pmcid), \
                mesh_terms = excluded.mesh_terms, \
                keywords = excluded.keywords, \
                updated_at = excluded.updated_at",
        )
        .bind(&article.pmid)
        .bind(&article.title)
        .bind(&article.abstract_text)
        .bind(Json(&article.authors))
        .bind(&article.journal)
        .bind(article.publication_year.map(i64::from))
        .bind(&article.doi)
        .bind(&article.pmcid)
        .bind(Json(&article.mesh_terms))
        .bind(Json(&article.keywords))
        .bind(article.created_at)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn upsert_many(&self, articles: &[Article]) -> Result<()> {
        for article in articles {
            self.upsert(article).await?;
        }
        Ok(())
    }

    pub async fn get(&self, pmid: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles a WHERE a.pmid = ?",
            ARTICLE_COLUMNS
        ))
        .bind(pmid)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Article::from))
    }

    /// Articles for the given PMIDs, in PMID order. Unknown PMIDs are skipped.
    pub async fn get_many(&self, pmids: &[String]) -> Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM articles a WHERE a.pmid IN (", ARTICLE_COLUMNS));
        let mut sep = qb.separated(", ");
        for pmid in pmids {
            sep.push_bind(pmid);
        }
        sep.push_unseparated(") ORDER BY a.pmid");

        let rows = qb.build_query_as::<ArticleRow>().fetch_all(self.db.pool()).await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles a ORDER BY a.updated_at DESC, a.pmid LIMIT ?",
            ARTICLE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Articles a project has triaged or collected.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles a WHERE a.pmid IN ( \
                SELECT t.pmid FROM paper_triages t WHERE t.project_id = ? \
                UNION \
                SELECT ca.pmid FROM collection_articles ca \
                  JOIN collections c ON c.id = ca.collection_id \
                 WHERE c.project_id = ? \
             ) ORDER BY a.pmid",
            ARTICLE_COLUMNS
        ))
        .bind(project_id)
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litlens_test_utils::article;
    use pretty_assertions::assert_eq;

    async fn repo() -> ArticleRepository {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        ArticleRepository::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = repo().await;
        let a = article("100");
        repo.upsert(&a).await.unwrap();

        let got = repo.get("100").await.unwrap().unwrap();
        assert_eq!(got.title, a.title);
        assert_eq!(got.authors, a.authors);
        assert_eq!(got.mesh_terms, a.mesh_terms);
        assert_eq!(got.publication_year, Some(2021));
        assert!(repo.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_optional_fields() {
        let repo = repo().await;
        repo.upsert(&article("100")).await.unwrap();

        let mut sparse = Article::new("100", "Updated title");
        sparse.abstract_text = None;
        repo.upsert(&sparse).await.unwrap();

        let got = repo.get("100").await.unwrap().unwrap();
        assert_eq!(got.title, "Updated title");
        assert!(got.abstract_text.is_some());
        assert_eq!(got.doi.as_deref(), Some("10.1000/test.100"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let repo = repo().await;
        repo.upsert_many(&[article("2"), article("1"), article("3")]).await.unwrap();

        let got = repo
            .get_many(&["3".to_string(), "1".to_string(), "999".to_string()])
            .await
            .unwrap();
        let pmids: Vec<_> = got.iter().map(|a| a.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["1", "3"]);
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_recent_limit() {
        let repo = repo().await;
        repo.upsert_many(&[article("1"), article("2"), article("3")]).await.unwrap();
        assert_eq!(repo.list_recent(2).await.unwrap().len(), 2);
    }
}
