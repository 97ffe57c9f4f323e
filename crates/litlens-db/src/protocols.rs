//! Extracted protocol repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{Equipment, Material, Protocol, ProtocolStep};
use sqlx::types::Json;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{DbError, Result};

#[derive(Debug, sqlx::FromRow)]
struct ProtocolRow {
    id: Uuid,
    project_id: Uuid,
    pmid: String,
    name: String,
    protocol_type: Option<String>,
    materials: Json<Vec<Material>>,
    equipment: Json<Vec<Equipment>>,
    steps: Json<Vec<ProtocolStep>>,
    key_parameters: Json<Vec<String>>,
    difficulty: Option<String>,
    estimated_duration: Option<String>,
    confidence: f64,
    fallbacks: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl From<ProtocolRow> for Protocol {
    fn from(row: ProtocolRow) -> Self {
        Protocol {
            id: row.id,
            project_id: row.project_id,
            pmid: row.pmid,
            name: row.name,
            protocol_type: row.protocol_type,
            materials: row.materials.0,
            equipment: row.equipment.0,
            steps: row.steps.0,
            key_parameters: row.key_parameters.0,
            difficulty: row.difficulty,
            estimated_duration: row.estimated_duration,
            confidence: row.confidence,
            fallbacks: row.fallbacks.0,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, project_id, pmid, name, protocol_type, materials, equipment, steps, \
     key_parameters, difficulty, estimated_duration, confidence, fallbacks, created_at";

#[derive(Clone)]
pub struct ProtocolRepository {
    db: Arc<Database>,
}

impl ProtocolRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, protocol: &Protocol) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO protocols ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(protocol.id)
        .bind(protocol.project_id)
        .bind(&protocol.pmid)
        .bind(&protocol.name)
        .bind(&protocol.protocol_type)
        .bind(Json(&protocol.materials))
        .bind(Json(&protocol.equipment))
        .bind(Json(&protocol.steps))
        .bind(Json(&protocol.key_parameters))
        .bind(&protocol.difficulty)
        .bind(&protocol.estimated_duration)
        .bind(protocol.confidence)
        .bind(Json(&protocol.fallbacks))
        .bind(protocol.created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| DbError::from_write(e, "protocol"))?;
        Ok(())
    }

    /// Lookup by id alone; callers check access to the owning project.
    pub async fn find(&self, id: Uuid) -> Result<Option<Protocol>> {
        let row = sqlx::query_as::<_, ProtocolRow>(&format!(
            "SELECT {} FROM protocols WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Protocol::from))
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Result<Option<Protocol>> {
        let row = sqlx::query_as::<_, ProtocolRow>(&format!(
            "SELECT {} FROM protocols WHERE project_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(project_id)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Protocol::from))
    }

    /// Newest first.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Protocol>> {
        let rows = sqlx::query_as::<_, ProtocolRow>(&format!(
            "SELECT {} FROM protocols WHERE project_id = ? ORDER BY created_at DESC",
            COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.into_iter().map(Protocol::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::ArticleRepository;
    use crate::projects::ProjectRepository;
    use litlens_test_utils::{article, project};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);
        let p = project("alice");
        ProjectRepository::new(db.clone()).create(&p).await.unwrap();
        ArticleRepository::new(db.clone()).upsert(&article("7")).await.unwrap();
        let repo = ProtocolRepository::new(db);

        let protocol = Protocol {
            id: Uuid::new_v4(),
            project_id: p.id,
            pmid: "7".into(),
            name: "Western blot".into(),
            protocol_type: Some("assay".into()),
            materials: vec![Material { name: "RIPA buffer".into(), ..Default::default() }],
            equipment: vec![],
            steps: vec![ProtocolStep {
                step_number: 1,
                description: "Lyse cells".into(),
                ..Default::default()
            }],
            key_parameters: vec!["4 °C".into()],
            difficulty: Some("moderate".into()),
            estimated_duration: None,
            confidence: 0.6,
            fallbacks: vec![],
            created_at: Utc::now(),
        };
        repo.insert(&protocol).await.unwrap();

        let got = repo.get(p.id, protocol.id).await.unwrap().unwrap();
        assert_eq!(got.materials, protocol.materials);
        assert_eq!(got.steps, protocol.steps);
        assert_eq!(repo.list_for_project(p.id).await.unwrap().len(), 1);
        assert!(repo.get(Uuid::new_v4(), protocol.id).await.unwrap().is_none());
    }
}
