use std::sync::Arc;

use litlens_agents::{
    InsightsOrchestrator, MethodsSource, ProjectSnapshot, ProtocolInput, ProtocolOrchestrator,
    RecommendationPriority, RunSettings, TriageInput, TriageOrchestrator, TriageSummary,
};
use litlens_common::{Article, HypothesisRelation, HypothesisStatus, TriageStatus};
use litlens_test_utils::{article, hypothesis, project, question, ScriptedBackend};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Triage ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_triage_happy_path_threads_context_between_steps() {
    let proj = project("alice");
    let q = question(proj.id, "What drives resistance to sotorasib?");
    let h = hypothesis(proj.id, "MET amplification causes resistance");
    let art = article("111");

    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"key_concepts": ["KRAS", "sotorasib"], "research_domain": "oncology", "study_type": "clinical trial"}))
            .reply_json(json!({"relevance_score": 86, "question_scores": [
                {"question_id": q.id.to_string(), "score": 90, "rationale": "direct"},
                {"question_id": "not-a-uuid", "score": 10}
            ]}))
            .reply_json(json!({
                "key_findings": ["MET amplification observed in 3/10 patients"],
                "evidence": [{"excerpt": "MET amplification was detected", "question_ids": [q.id.to_string()]}],
                "hypothesis_links": [{"hypothesis_id": h.id.to_string(), "relationship": "supports", "rationale": "observed"}]
            }))
            .reply_json(json!({"triage_status": "must_read", "rationale": "Directly addresses Q1", "confidence": 0.9})),
    );

    let orch = TriageOrchestrator::new(backend.clone(), RunSettings::default());
    let questions = vec![q.clone()];
    let hypotheses = vec![h.clone()];
    let out = orch
        .run(TriageInput { article: &art, project: &proj, questions: &questions, hypotheses: &hypotheses })
        .await;

    assert_eq!(out.status, TriageStatus::MustRead);
    assert_eq!(out.relevance_score, 86.0);
    assert_eq!(out.confidence, 0.9);
    assert_eq!(out.context.research_domain, "oncology");
    assert_eq!(out.question_scores.len(), 1);
    assert_eq!(out.question_scores[0].question_id, q.id);
    assert_eq!(out.evidence[0].question_ids, vec![q.id]);
    assert_eq!(out.hypothesis_links[0].relationship, HypothesisRelation::Supports);
    assert!(out.fallbacks().is_empty());

    assert_eq!(backend.call_count(), 4);
    let first = backend.user_prompt(0).unwrap();
    assert!(first.contains(&q.id.to_string()));
    assert!(!first.contains("Results of earlier analysis steps"));
    let last = backend.user_prompt(3).unwrap();
    assert!(last.contains("\"relevance_scoring\""));
    assert!(last.contains("\"evidence_extraction\""));
}

#[tokio::test]
async fn test_triage_accepts_alternate_field_names() {
    let proj = project("alice");
    let art = article("222");
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"key_concepts": []}))
            .reply_json(json!({"score": "55"}))
            .reply_json(json!({"key_findings": []}))
            .reply_json(json!({"decision": "Nice to know", "rationale": "tangential"})),
    );
    let out = TriageOrchestrator::new(backend, RunSettings::default())
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &[] })
        .await;

    assert_eq!(out.relevance_score, 55.0);
    assert_eq!(out.status, TriageStatus::NiceToKnow);
    assert_eq!(out.rationale, "tangential");
}

#[tokio::test]
async fn test_triage_null_optional_keys_keep_the_step() {
    let proj = project("alice");
    let h = hypothesis(proj.id, "MET amplification causes resistance");
    let art = article("111");
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"key_concepts": ["KRAS"], "study_type": null}))
            .reply_json(json!({"relevance_score": 85, "question_scores": null}))
            .reply_json(json!({
                "key_findings": ["MET amplification"],
                "evidence": null,
                "hypothesis_links": [
                    {"hypothesis_id": h.id.to_string(), "relationship": "Supports"},
                    null
                ]
            }))
            .reply_json(json!({"triage_status": "must_read", "rationale": "core", "confidence": null})),
    );
    let hypotheses = vec![h.clone()];
    let out = TriageOrchestrator::new(backend, RunSettings::default())
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &hypotheses })
        .await;

    assert!(out.fallbacks().is_empty());
    assert_eq!(out.relevance_score, 85.0);
    assert_eq!(out.status, TriageStatus::MustRead);
    assert_eq!(out.key_findings, vec!["MET amplification".to_string()]);
    assert!(out.evidence.is_empty());
    assert_eq!(out.hypothesis_links.len(), 1);
    assert_eq!(out.hypothesis_links[0].relationship, HypothesisRelation::Supports);
}

#[tokio::test]
async fn test_triage_capitalised_relationships() {
    let proj = project("alice");
    let h1 = hypothesis(proj.id, "MET amplification causes resistance");
    let h2 = hypothesis(proj.id, "KRAS G12D responds to sotorasib");
    let art = article("111");
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"key_concepts": []}))
            .reply_json(json!({"relevance_score": 50}))
            .reply_json(json!({"key_findings": [], "hypothesis_links": [
                {"hypothesis_id": h1.id.to_string(), "relationship": "SUPPORTS"},
                {"hypothesis_id": h2.id.to_string(), "relationship": "Contradicts"}
            ]}))
            .reply_json(json!({"triage_status": "nice_to_know", "rationale": "partial"})),
    );
    let hypotheses = vec![h1, h2];
    let out = TriageOrchestrator::new(backend, RunSettings::default())
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &hypotheses })
        .await;

    let relations: Vec<_> = out.hypothesis_links.iter().map(|l| l.relationship).collect();
    assert_eq!(relations, vec![HypothesisRelation::Supports, HypothesisRelation::Contradicts]);
}

#[tokio::test]
async fn test_triage_decision_failure_derives_status_from_score() {
    let proj = project("alice");
    let art = article("333");
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_text("not json at all")
            .reply_json(json!({"relevance_score": 140}))
            .reply_error("upstream 500")
            .reply_json(json!({"triage_status": "definitely", "rationale": "?"})),
    );
    let out = TriageOrchestrator::new(backend, RunSettings::default())
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &[] })
        .await;

    assert_eq!(out.relevance_score, 100.0);
    assert_eq!(out.status, TriageStatus::MustRead);
    assert_eq!(out.confidence, 0.0);
    assert_eq!(out.fallbacks(), vec!["context_analysis".to_string(), "evidence_extraction".to_string()]);
}

#[tokio::test]
async fn test_triage_with_dead_backend_is_all_defaults() {
    let proj = project("alice");
    let art = article("444");
    let backend = Arc::new(ScriptedBackend::new());
    let out = TriageOrchestrator::new(backend.clone(), RunSettings::default())
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &[] })
        .await;

    assert_eq!(backend.call_count(), 4);
    assert_eq!(out.status, TriageStatus::Ignore);
    assert_eq!(out.relevance_score, 0.0);
    assert_eq!(out.fallbacks().len(), 4);

    let triage = out.into_triage(proj.id, &art.pmid);
    assert_eq!(triage.pmid, "444");
    assert_eq!(triage.fallbacks.len(), 4);
}

#[tokio::test]
async fn test_triage_truncates_long_abstracts() {
    let proj = project("alice");
    let mut art = article("555");
    art.abstract_text = Some("x".repeat(500));
    let backend = Arc::new(ScriptedBackend::new());
    let settings = RunSettings { max_input_chars: 100, ..RunSettings::default() };
    TriageOrchestrator::new(backend.clone(), settings)
        .run(TriageInput { article: &art, project: &proj, questions: &[], hypotheses: &[] })
        .await;

    let prompt = backend.user_prompt(0).unwrap();
    assert!(prompt.contains(&"x".repeat(100)));
    assert!(!prompt.contains(&"x".repeat(101)));
}

// ── Protocol ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_protocol_extraction_from_methods() {
    let art = article("777");
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"materials": [
                {"name": "DMEM", "supplier": "Gibco", "amount": 500},
                {"name": ""}
            ]}))
            .reply_json(json!({"equipment": [{"name": "Centrifuge", "settings": "300 x g"}]}))
            .reply_text("```json\n{\"steps\": [{\"step_number\": 4, \"description\": \"Seed cells\"}, {\"step_number\": 9, \"description\": \"Incubate\", \"temperature\": \"37 C\"}]}\n```")
            .reply_json(json!({"protocol_name": "Cell viability assay", "difficulty": "Moderate",
                               "key_parameters": ["seeding density"], "confidence": 1.7})),
    );
    let out = ProtocolOrchestrator::new(backend.clone(), RunSettings::default())
        .run(ProtocolInput { article: &art, methods_text: Some("Cells were seeded at 5000 per well.") })
        .await;

    assert_eq!(out.source, MethodsSource::Methods);
    assert_eq!(out.materials.len(), 1);
    assert_eq!(out.materials[0].amount.as_deref(), Some("500"));
    assert_eq!(out.equipment[0].settings.as_deref(), Some("300 x g"));
    assert_eq!(out.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(out.steps[1].temperature.as_deref(), Some("37 C"));
    assert_eq!(out.name, "Cell viability assay");
    assert_eq!(out.difficulty.as_deref(), Some("moderate"));
    assert_eq!(out.confidence, 1.0);
    assert!(out.fallbacks().is_empty());
    assert!(backend.user_prompt(0).unwrap().contains("Cells were seeded"));
}

#[tokio::test]
async fn test_protocol_falls_back_to_abstract_and_defaults() {
    let art = article("778");
    let backend = Arc::new(ScriptedBackend::new().reply_error("quota"));
    let out = ProtocolOrchestrator::new(backend.clone(), RunSettings::default())
        .run(ProtocolInput { article: &art, methods_text: Some("   ") })
        .await;

    assert_eq!(out.source, MethodsSource::Abstract);
    assert!(out.is_empty());
    assert_eq!(out.name, art.title);
    assert_eq!(out.fallbacks().len(), 4);
    // The materials default is threaded into later prompts.
    assert!(backend.user_prompt(1).unwrap().contains("\"materials\": []"));
}

#[tokio::test]
async fn test_protocol_without_any_text_skips_llm() {
    let art = Article::new("779", "Editorial");
    let backend = Arc::new(ScriptedBackend::new());
    let out = ProtocolOrchestrator::new(backend.clone(), RunSettings::default())
        .run(ProtocolInput { article: &art, methods_text: None })
        .await;

    assert_eq!(backend.call_count(), 0);
    assert_eq!(out.source, MethodsSource::None);
    assert!(out.is_empty());
    assert!(out.step_reports.is_empty());
}

// ── Insights ─────────────────────────────────────────────────────────────────

fn snapshot() -> ProjectSnapshot {
    let proj = project("alice");
    let q1 = question(proj.id, "Q one");
    let q2 = question(proj.id, "Q two");
    let h = hypothesis(proj.id, "H one");
    ProjectSnapshot {
        questions: vec![q1, q2],
        hypotheses: vec![h],
        triages: vec![TriageSummary {
            pmid: "111".into(),
            title: "Paper".into(),
            status: TriageStatus::MustRead,
            relevance_score: 90.0,
            key_findings: vec!["finding".into()],
            hypothesis_links: vec![],
        }],
        protocols: vec!["Western blot".into()],
        annotation_count: 3,
        project: proj,
    }
}

#[tokio::test]
async fn test_insights_filters_unknown_ids_and_sorts_recommendations() {
    let snap = snapshot();
    let q1 = snap.questions[0].id;
    let h = snap.hypotheses[0].id;
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"summary": "Going well", "answered_question_ids": [q1.to_string(), q1.to_string(), "bogus"]}))
            .reply_json(json!({"hypothesis_assessments": [
                {"hypothesis_id": h.to_string(), "verdict": "supported", "supporting_pmids": ["111", "999"]},
                {"hypothesis_id": uuid::Uuid::new_v4().to_string(), "verdict": "refuted"}
            ]}))
            .reply_json(json!({"gaps": [{"description": "No in vivo data", "related_question_id": q1.to_string()}]}))
            .reply_json(json!({"recommendations": [
                {"title": "Read reviews", "description": "", "priority": "low"},
                {"title": "Run PDX study", "description": "", "priority": "high"},
                {"title": "Email authors", "description": "", "priority": "medium"}
            ]})),
    );
    let insights = InsightsOrchestrator::new(backend.clone(), RunSettings::default()).run(&snap).await;

    assert_eq!(insights.summary, "Going well");
    assert_eq!(insights.answered_question_ids, vec![q1]);
    assert_eq!(insights.hypothesis_assessments.len(), 1);
    assert_eq!(insights.hypothesis_assessments[0].verdict, HypothesisStatus::Supported);
    assert_eq!(insights.hypothesis_assessments[0].supporting_pmids, vec!["111".to_string()]);
    assert_eq!(insights.gaps[0].related_question_id, Some(q1));
    let priorities: Vec<_> = insights.recommendations.iter().map(|r| r.priority).collect();
    assert_eq!(
        priorities,
        vec![RecommendationPriority::High, RecommendationPriority::Medium, RecommendationPriority::Low]
    );
    assert!(backend.user_prompt(0).unwrap().contains("Western blot"));
}

#[tokio::test]
async fn test_insights_capitalised_priorities_are_ranked() {
    let snap = snapshot();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_json(json!({"summary": "ok", "answered_question_ids": null}))
            .reply_json(json!({"hypothesis_assessments": []}))
            .reply_json(json!({"gaps": []}))
            .reply_json(json!({"recommendations": [
                {"title": "Later", "priority": "Low"},
                null,
                {"title": "Now", "priority": "High"},
                {"title": "Soon", "priority": "someday"}
            ]})),
    );
    let insights = InsightsOrchestrator::new(backend, RunSettings::default()).run(&snap).await;

    assert!(insights.fallbacks().is_empty());
    assert_eq!(insights.summary, "ok");
    let ranked: Vec<_> = insights
        .recommendations
        .iter()
        .map(|r| (r.title.as_str(), r.priority))
        .collect();
    assert_eq!(
        ranked,
        vec![
            ("Now", RecommendationPriority::High),
            ("Soon", RecommendationPriority::Medium),
            ("Later", RecommendationPriority::Low),
        ]
    );
}

#[tokio::test]
async fn test_insights_progress_fallback_summarises_counts() {
    let snap = snapshot();
    let backend = Arc::new(ScriptedBackend::new());
    let insights = InsightsOrchestrator::new(backend, RunSettings::default()).run(&snap).await;

    assert_eq!(
        insights.summary,
        "2 research questions, 1 hypotheses, 1 triaged papers (1 must-read), 1 protocols."
    );
    assert_eq!(insights.fallbacks().len(), 4);
    assert!(insights.recommendations.is_empty());
}
