//! Projects and collaborator access.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{Collaborator, Project, ProjectRole};
use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    owner_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollaboratorRow {
    project_id: Uuid,
    user_id: String,
    role: String,
    added_at: DateTime<Utc>,
}

impl From<CollaboratorRow> for Collaborator {
    fn from(row: CollaboratorRow) -> Self {
        Collaborator {
            project_id: row.project_id,
            user_id: row.user_id,
            role: ProjectRole::try_parse(&row.role).unwrap_or(ProjectRole::Viewer),
            added_at: row.added_at,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Repository for project operations.
#[derive(Clone)]
pub struct ProjectRepository {
    db: Arc<Database>,
}

impl ProjectRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, project: &Project) -> Result<()> {
        sqlx::query(
            "INSERT INTO projects (id, owner_id, name, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id)
        .bind(&project.owner_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "project"))?;
        debug!(project_id = %project.id, owner = %project.owner_id, "Project created");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, owner_id, name, description, created_at, updated_at \
             FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Project::from))
    }

    /// Projects the user owns or collaborates on, most recently updated first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT p.id, p.owner_id, p.name, p.description, p.created_at, p.updated_at \
             FROM projects p \
             WHERE p.owner_id = ? \
                OR EXISTS (SELECT 1 FROM project_collaborators c \
                            WHERE c.project_id = p.id AND c.user_id = ?) \
             ORDER BY p.updated_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    pub async fn update(&self, id: Uuid, update: &ProjectUpdate) -> Result<Project> {
        let result = sqlx::query(
            "UPDATE projects SET \
                name = COALESCE(?, name), \
                description = COALESCE(?, description), \
                updated_at = ? \
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("project {}", id)));
        }
        self.get(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("project {}", id)))
    }

    /// Bump `updated_at` after a change to project-owned data.
    pub async fn touch(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Delete a project and, through cascades, everything it owns.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Collaborators ───────────────────────────────────────────────────────

    /// Add a collaborator, or change the role of an existing one.
    pub async fn add_collaborator(
        &self,
        project_id: Uuid,
        user_id: &str,
        role: ProjectRole,
    ) -> Result<Collaborator> {
        let added_at = Utc::now();
        sqlx::query(
            "INSERT INTO project_collaborators (project_id, user_id, role, added_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(project_id, user_id) DO UPDATE SET role = excluded.role",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(added_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "collaborator"))?;

        let row = sqlx::query_as::<_, CollaboratorRow>(
            "SELECT project_id, user_id, role, added_at FROM project_collaborators \
             WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.into())
    }

    pub async fn remove_collaborator(&self, project_id: Uuid, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM project_collaborators WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_collaborators(&self, project_id: Uuid) -> Result<Vec<Collaborator>> {
        let rows = sqlx::query_as::<_, CollaboratorRow>(
            "SELECT project_id, user_id, role, added_at FROM project_collaborators \
             WHERE project_id = ? ORDER BY added_at, user_id",
        )
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Collaborator::from).collect())
    }

    /// The user's role on a project, or `None` if they have no access
    /// (or the project does not exist).
    pub async fn role_of(&self, project_id: Uuid, user_id: &str) -> Result<Option<ProjectRole>> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT p.owner_id, c.role FROM projects p \
             LEFT JOIN project_collaborators c \
                    ON c.project_id = p.id AND c.user_id = ? \
             WHERE p.id = ?",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(match row {
            None => None,
            Some((owner, _)) if owner == user_id => Some(ProjectRole::Owner),
            Some((_, role)) => role.as_deref().and_then(ProjectRole::try_parse),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litlens_test_utils::project;
    use pretty_assertions::assert_eq;

    async fn repo() -> ProjectRepository {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        ProjectRepository::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let repo = repo().await;
        let p = project("alice");
        repo.create(&p).await.unwrap();

        let got = repo.get(p.id).await.unwrap().unwrap();
        assert_eq!(got.name, p.name);

        let updated = repo
            .update(p.id, &ProjectUpdate { name: Some("Renamed".into()), description: None })
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, p.description);
    }

    #[tokio::test]
    async fn test_update_missing_project_is_not_found() {
        let repo = repo().await;
        let err = repo.update(Uuid::new_v4(), &ProjectUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_roles() {
        let repo = repo().await;
        let p = project("alice");
        repo.create(&p).await.unwrap();
        repo.add_collaborator(p.id, "bob", ProjectRole::Viewer).await.unwrap();

        assert_eq!(repo.role_of(p.id, "alice").await.unwrap(), Some(ProjectRole::Owner));
        assert_eq!(repo.role_of(p.id, "bob").await.unwrap(), Some(ProjectRole::Viewer));
        assert_eq!(repo.role_of(p.id, "carol").await.unwrap(), None);
        assert_eq!(repo.role_of(Uuid::new_v4(), "alice").await.unwrap(), None);

        // Re-adding changes the role in place.
        let c = repo.add_collaborator(p.id, "bob", ProjectRole::Editor).await.unwrap();
        assert_eq!(c.role, ProjectRole::Editor);
        assert_eq!(repo.list_collaborators(p.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_user_includes_shared_projects() {
        let repo = repo().await;
        let own = project("alice");
        let shared = project("bob");
        let other = project("carol");
        for p in [&own, &shared, &other] {
            repo.create(p).await.unwrap();
        }
        repo.add_collaborator(shared.id, "alice", ProjectRole::Editor).await.unwrap();

        let ids: Vec<Uuid> = repo
            .list_for_user("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&own.id));
        assert!(ids.contains(&shared.id));
    }

    #[tokio::test]
    async fn test_collaborator_on_missing_project_is_not_found() {
        let repo = repo().await;
        let err = repo
            .add_collaborator(Uuid::new_v4(), "bob", ProjectRole::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
