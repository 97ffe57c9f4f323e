//! Cross-repository behaviour against a real SQLite file.

use std::sync::Arc;

use chrono::Utc;
use litlens_common::{Collection, PaperTriage, ProjectRole, TriageStatus};
use litlens_db::{
    ArticleRepository, CollectionRepository, Database, HypothesisRepository, ProjectRepository,
    QuestionRepository, TriageRepository,
};
use litlens_test_utils::{article, hypothesis, project, question};
use uuid::Uuid;

async fn file_db(dir: &tempfile::TempDir) -> Arc<Database> {
    let url = format!("sqlite://{}", dir.path().join("litlens.db").display());
    let db = Database::connect(&url, 4).await.unwrap();
    db.initialize().await.unwrap();
    Arc::new(db)
}

#[tokio::test]
async fn deleting_a_project_removes_everything_it_owns() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;

    let projects = ProjectRepository::new(db.clone());
    let articles = ArticleRepository::new(db.clone());
    let questions = QuestionRepository::new(db.clone());
    let hypotheses = HypothesisRepository::new(db.clone());
    let triages = TriageRepository::new(db.clone());
    let collections = CollectionRepository::new(db.clone());

    let p = project("alice");
    projects.create(&p).await.unwrap();
    projects.add_collaborator(p.id, "bob", ProjectRole::Editor).await.unwrap();
    articles.upsert(&article("42")).await.unwrap();

    let q = question(p.id, "Does SHP2 co-inhibition delay resistance?");
    questions.create(&q).await.unwrap();
    hypotheses.create(&hypothesis(p.id, "SHP2 blockade restores sensitivity")).await.unwrap();
    triages
        .upsert(&PaperTriage {
            id: Uuid::new_v4(),
            project_id: p.id,
            pmid: "42".into(),
            status: TriageStatus::MustRead,
            relevance_score: 88.0,
            confidence: 0.9,
            rationale: "directly addresses the question".into(),
            key_findings: vec![],
            question_scores: vec![],
            evidence: vec![],
            hypothesis_links: vec![],
            fallbacks: vec![],
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let c = Collection {
        id: Uuid::new_v4(),
        project_id: p.id,
        name: "Core".into(),
        description: None,
        created_at: Utc::now(),
    };
    collections.create(&c).await.unwrap();
    collections.add_article(c.id, "42").await.unwrap();

    assert!(projects.delete(p.id).await.unwrap());

    assert!(questions.list_for_project(p.id).await.unwrap().is_empty());
    assert!(hypotheses.list_for_project(p.id).await.unwrap().is_empty());
    assert!(triages.list_for_project(p.id, None).await.unwrap().is_empty());
    assert!(collections.list_articles(c.id).await.unwrap().is_empty());
    assert!(projects.list_collaborators(p.id).await.unwrap().is_empty());
    assert_eq!(projects.role_of(p.id, "alice").await.unwrap(), None);

    // Articles are shared and survive.
    assert!(articles.get("42").await.unwrap().is_some());
    let stats = db.stats().await.unwrap();
    assert_eq!(stats.projects, 0);
    assert_eq!(stats.articles, 1);
}

#[tokio::test]
async fn data_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let p = project("alice");
    {
        let db = file_db(&dir).await;
        ProjectRepository::new(db).create(&p).await.unwrap();
    }
    let db = file_db(&dir).await;
    let got = ProjectRepository::new(db).get(p.id).await.unwrap().unwrap();
    assert_eq!(got.owner_id, "alice");
}
