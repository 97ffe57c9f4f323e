use chrono::Utc;
use litlens_common::{
    Article, Hypothesis, HypothesisStatus, Project, QuestionStatus, ResearchQuestion,
};
use uuid::Uuid;

pub fn article(pmid: &str) -> Article {
    article_with(
        pmid,
        &format!("Article {}", pmid),
        "KRAS G12C inhibitors show durable responses in lung adenocarcinoma.",
        &["Jane Smith", "Wei Chen"],
        &["Lung Neoplasms", "Proto-Oncogene Proteins p21(ras)"],
        Some(2021),
    )
}

pub fn article_with(
    pmid: &str,
    title: &str,
    abstract_text: &str,
    authors: &[&str],
    mesh_terms: &[&str],
    year: Option<i32>,
) -> Article {
    let mut a = Article::new(pmid, title);
    a.abstract_text = Some(abstract_text.to_string());
    a.authors = authors.iter().map(|s| s.to_string()).collect();
    a.mesh_terms = mesh_terms.iter().map(|s| s.to_string()).collect();
    a.journal = Some("Journal of Testing".to_string());
    a.publication_year = year;
    a.doi = Some(format!("10.1000/test.{}", pmid));
    a
}

pub fn project(owner_id: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        name: "KRAS resistance".to_string(),
        description: Some("Mechanisms of resistance to KRAS G12C inhibition".to_string()),
        created_at: now,
        updated_at: now,
    }
}

pub fn question(project_id: Uuid, text: &str) -> ResearchQuestion {
    ResearchQuestion {
        id: Uuid::new_v4(),
        project_id,
        text: text.to_string(),
        priority: 2,
        status: QuestionStatus::Open,
        created_at: Utc::now(),
    }
}

pub fn hypothesis(project_id: Uuid, statement: &str) -> Hypothesis {
    Hypothesis {
        id: Uuid::new_v4(),
        project_id,
        question_id: None,
        statement: statement.to_string(),
        status: HypothesisStatus::Proposed,
        confidence: None,
        created_at: Utc::now(),
    }
}
