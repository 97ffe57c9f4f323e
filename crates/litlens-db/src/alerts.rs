//! Project alert repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{AlertKind, ProjectAlert};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    project_id: Uuid,
    kind: String,
    title: String,
    body: String,
    pmid: Option<String>,
    dismissed: bool,
    created_at: DateTime<Utc>,
}

impl From<AlertRow> for ProjectAlert {
    fn from(row: AlertRow) -> Self {
        ProjectAlert {
            id: row.id,
            project_id: row.project_id,
            kind: AlertKind::parse(&row.kind),
            title: row.title,
            body: row.body,
            pmid: row.pmid,
            dismissed: row.dismissed,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, project_id, kind, title, body, pmid, dismissed, created_at";

#[derive(Clone)]
pub struct AlertRepository {
    db: Arc<Database>,
}

impl AlertRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, alert: &ProjectAlert) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO project_alerts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(alert.id)
        .bind(alert.project_id)
        .bind(alert.kind.as_str())
        .bind(&alert.title)
        .bind(&alert.body)
        .bind(&alert.pmid)
        .bind(alert.dismissed)
        .bind(alert.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "alert"))?;
        Ok(())
    }

    /// Stores `alert`, unless the project already holds an alert of the same
    /// kind for the same article. In that case the existing alert gets the new
    /// title and body and keeps its id and dismissed flag. Returns the stored
    /// alert and whether it was newly created.
    pub async fn upsert_for_article(&self, alert: &ProjectAlert) -> Result<(ProjectAlert, bool)> {
        let Some(pmid) = alert.pmid.as_deref() else {
            self.create(alert).await?;
            return Ok((alert.clone(), true));
        };

        let existing = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM project_alerts \
             WHERE project_id = ? AND pmid = ? AND kind = ? \
             ORDER BY created_at ASC LIMIT 1",
            COLUMNS
        ))
        .bind(alert.project_id)
        .bind(pmid)
        .bind(alert.kind.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        match existing {
            Some(row) => {
                sqlx::query("UPDATE project_alerts SET title = ?, body = ? WHERE id = ?")
                    .bind(&alert.title)
                    .bind(&alert.body)
                    .bind(row.id)
                    .execute(self.db.pool())
                    .await?;
                let mut stored = ProjectAlert::from(row);
                stored.title = alert.title.clone();
                stored.body = alert.body.clone();
                Ok((stored, false))
            }
            None => {
                self.create(alert).await?;
                Ok((alert.clone(), true))
            }
        }
    }

    /// Newest first. Dismissed alerts are skipped unless requested.
    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        include_dismissed: bool,
    ) -> Result<Vec<ProjectAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM project_alerts \
             WHERE project_id = ? AND (? OR dismissed = 0) \
             ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(project_id)
        .bind(include_dismissed)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(ProjectAlert::from).collect())
    }

    pub async fn dismiss(&self, project_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE project_alerts SET dismissed = 1 WHERE project_id = ? AND id = ?",
        )
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

    #[tokio::test]
    async fn test_dismissed_alerts_are_hidden_by_default() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let p = project("alice");
        ProjectRepository::new(db.clone()).create(&p).await.unwrap();
        let repo = AlertRepository::new(db);

        let alert = ProjectAlert {
            id: Uuid::new_v4(),
            project_id: p.id,
            kind: AlertKind::HighRelevancePaper,
            title: "High-relevance paper".into(),
            body: "PMID 1 scored 92/100".into(),
            pmid: Some("1".into()),
            dismissed: false,
            created_at: Utc::now(),
        };
        repo.create(&alert).await.unwrap();
        assert_eq!(repo.list_for_project(p.id, false).await.unwrap().len(), 1);

        assert!(repo.dismiss(p.id, alert.id).await.unwrap());
        assert!(repo.list_for_project(p.id, false).await.unwrap().is_empty());

        let all = repo.list_for_project(p.id, true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].dismissed);
        assert!(!repo.dismiss(Uuid::new_v4(), alert.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_for_article_refreshes_instead_of_duplicating() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let p = project("alice");
        ProjectRepository::new(db.clone()).create(&p).await.unwrap();
        let repo = AlertRepository::new(db);

        let alert = |body: &str, kind: AlertKind| ProjectAlert {
            id: Uuid::new_v4(),
            project_id: p.id,
            kind,
            title: "High-relevance paper".into(),
            body: body.into(),
            pmid: Some("1".into()),
            dismissed: false,
            created_at: Utc::now(),
        };

        let first = alert("scored 85", AlertKind::HighRelevancePaper);
        let (stored, created) = repo.upsert_for_article(&first).await.unwrap();
        assert!(created);
        assert_eq!(stored.id, first.id);
        repo.dismiss(p.id, first.id).await.unwrap();

        let (stored, created) = repo
            .upsert_for_article(&alert("scored 91", AlertKind::HighRelevancePaper))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.body, "scored 91");
        assert!(stored.dismissed);

        let (_, created) = repo
            .upsert_for_article(&alert("supports h1", AlertKind::HypothesisEvidence))
            .await
            .unwrap();
        assert!(created);

        let all = repo.list_for_project(p.id, true).await.unwrap();
        assert_eq!(all.len(), 2);
        let high = all.iter().find(|a| a.kind == AlertKind::HighRelevancePaper).unwrap();
        assert_eq!(high.body, "scored 91");
    }
}
