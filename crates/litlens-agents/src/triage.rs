//! Paper triage: decides whether an article is worth reading for a project.
//!
//! Steps, in order:
//!   1. context_analysis   — key concepts, domain, study type
//!   2. relevance_scoring  — overall 0-100 score plus per-question scores
//!   3. evidence_extraction — findings, excerpts, hypothesis links
//!   4. triage_decision    — must_read | nice_to_know | ignore
//!
//! If the decision step fails or names an unknown status, the status is
//! derived from the relevance score.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use litlens_common::{
    Article, EvidenceExcerpt, Hypothesis, HypothesisLink, HypothesisRelation, PaperTriage, Project,
    QuestionScore, ResearchQuestion, TriageStatus,
};
use litlens_llm::LlmBackend;
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::lenient;
use crate::prompts::{self, system, TRIAGE_TEMPLATE};
use crate::shape::{Kind, Shape};
use crate::step::{truncate_chars, PipelineContext, RunSettings, StepReport, StepRunner, StepSpec};

const PIPELINE: &str = "triage";

// ── Step outputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalysis {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_concepts: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub research_domain: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub study_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawQuestionScore {
    #[serde(default, deserialize_with = "lenient::string")]
    question_id: String,
    #[serde(default, deserialize_with = "lenient::number")]
    score: f64,
    #[serde(default, deserialize_with = "lenient::string")]
    rationale: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RelevanceScoring {
    #[serde(deserialize_with = "lenient::number")]
    relevance_score: f64,
    #[serde(default, deserialize_with = "lenient::list")]
    question_scores: Vec<RawQuestionScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawEvidence {
    #[serde(default, deserialize_with = "lenient::string")]
    excerpt: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    question_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawHypothesisLink {
    #[serde(default, deserialize_with = "lenient::string")]
    hypothesis_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    relationship: String,
    #[serde(default, deserialize_with = "lenient::string")]
    rationale: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EvidenceExtraction {
    #[serde(default, deserialize_with = "lenient::string_list")]
    key_findings: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    evidence: Vec<RawEvidence>,
    #[serde(default, deserialize_with = "lenient::list")]
    hypothesis_links: Vec<RawHypothesisLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TriageDecision {
    #[serde(deserialize_with = "lenient::string")]
    triage_status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    rationale: String,
    #[serde(default, deserialize_with = "lenient::number")]
    confidence: f64,
}

fn steps() -> [StepSpec; 4] {
    [
        StepSpec {
            name: "context_analysis",
            system_prompt: system::TRIAGE_CONTEXT,
            shape: Shape::new()
                .required("key_concepts", Kind::Array)
                .optional("research_domain", Kind::String)
                .optional("study_type", Kind::String),
        },
        StepSpec {
            name: "relevance_scoring",
            system_prompt: system::TRIAGE_RELEVANCE,
            shape: Shape::new()
                .required_any(&["relevance_score", "score", "relevance"], Kind::Number)
                .optional("question_scores", Kind::Array),
        },
        StepSpec {
            name: "evidence_extraction",
            system_prompt: system::TRIAGE_EVIDENCE,
            shape: Shape::new()
                .required("key_findings", Kind::Array)
                .optional("evidence", Kind::Array)
                .optional("hypothesis_links", Kind::Array),
        },
        StepSpec {
            name: "triage_decision",
            system_prompt: system::TRIAGE_DECISION,
            shape: Shape::new()
                .required_any(&["triage_status", "decision", "status"], Kind::String)
                .required("rationale", Kind::String)
                .optional("confidence", Kind::Number),
        },
    ]
}

const TASKS: [&str; 4] = [
    "Identify the key concepts, research domain and study type of this article.",
    "Score the article's relevance to the project overall and to each research question.",
    "Extract the key findings, supporting excerpts and links to the hypotheses.",
    "Decide whether the article is a must_read, nice_to_know or ignore for this project.",
];

// ── Input / output ───────────────────────────────────────────────────────────

pub struct TriageInput<'a> {
    pub article: &'a Article,
    pub project: &'a Project,
    pub questions: &'a [ResearchQuestion],
    pub hypotheses: &'a [Hypothesis],
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageOutcome {
    pub status: TriageStatus,
    pub relevance_score: f64,
    pub confidence: f64,
    pub rationale: String,
    pub context: ContextAnalysis,
    pub key_findings: Vec<String>,
    pub question_scores: Vec<QuestionScore>,
    pub evidence: Vec<EvidenceExcerpt>,
    pub hypothesis_links: Vec<HypothesisLink>,
    pub steps: Vec<StepReport>,
}

impl TriageOutcome {
    pub fn fallbacks(&self) -> Vec<String> {
        self.steps.iter().filter(|s| s.fell_back).map(|s| s.name.clone()).collect()
    }

    pub fn into_triage(self, project_id: Uuid, pmid: &str) -> PaperTriage {
        PaperTriage {
            id: Uuid::new_v4(),
            project_id,
            pmid: pmid.to_string(),
            status: self.status,
            relevance_score: self.relevance_score,
            confidence: self.confidence,
            fallbacks: self.fallbacks(),
            rationale: self.rationale,
            key_findings: self.key_findings,
            question_scores: self.question_scores,
            evidence: self.evidence,
            hypothesis_links: self.hypothesis_links,
            created_at: Utc::now(),
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

pub struct TriageOrchestrator {
    backend: Arc<dyn LlmBackend>,
    settings: RunSettings,
}

impl TriageOrchestrator {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: RunSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(skip(self, input), fields(pmid = %input.article.pmid, project = %input.project.id))]
    pub async fn run(&self, input: TriageInput<'_>) -> TriageOutcome {
        let runner = StepRunner::new(self.backend.as_ref(), PIPELINE, self.settings);
        let [context_spec, relevance_spec, evidence_spec, decision_spec] = steps();
        let mut ctx = PipelineContext::new();

        let context = runner
            .run::<ContextAnalysis>(&context_spec, self.prompt(&input, TASKS[0], &ctx))
            .await;
        ctx.insert(context_spec.name, context.json.clone());

        let relevance = runner
            .run::<RelevanceScoring>(&relevance_spec, self.prompt(&input, TASKS[1], &ctx))
            .await;
        ctx.insert(relevance_spec.name, relevance.json.clone());

        let evidence = runner
            .run::<EvidenceExtraction>(&evidence_spec, self.prompt(&input, TASKS[2], &ctx))
            .await;
        ctx.insert(evidence_spec.name, evidence.json.clone());

        let decision = runner
            .run::<TriageDecision>(&decision_spec, self.prompt(&input, TASKS[3], &ctx))
            .await;

        let question_ids: HashSet<Uuid> = input.questions.iter().map(|q| q.id).collect();
        let hypothesis_ids: HashSet<Uuid> = input.hypotheses.iter().map(|h| h.id).collect();

        let relevance_score = clamp_score(relevance.value.relevance_score);
        let question_scores = relevance
            .value
            .question_scores
            .into_iter()
            .filter_map(|qs| {
                let id = known_id(&qs.question_id, &question_ids)?;
                Some(QuestionScore { question_id: id, score: clamp_score(qs.score), rationale: qs.rationale })
            })
            .collect();

        let EvidenceExtraction { key_findings, evidence: raw_evidence, hypothesis_links } = evidence.value;
        let evidence_excerpts = raw_evidence
            .into_iter()
            .filter(|e| !e.excerpt.is_empty())
            .map(|e| EvidenceExcerpt {
                question_ids: e.question_ids.iter().filter_map(|id| known_id(id, &question_ids)).collect(),
                excerpt: e.excerpt,
            })
            .collect();
        let hypothesis_links = hypothesis_links
            .into_iter()
            .filter_map(|l| {
                let id = known_id(&l.hypothesis_id, &hypothesis_ids)?;
                Some(HypothesisLink {
                    hypothesis_id: id,
                    relationship: HypothesisRelation::parse(&l.relationship),
                    rationale: l.rationale,
                })
            })
            .collect();

        let decided = if decision.fell_back() {
            None
        } else {
            TriageStatus::try_parse(&decision.value.triage_status)
        };
        let (status, rationale, confidence) = match decided {
            Some(status) => (
                status,
                decision.value.rationale,
                decision.value.confidence.clamp(0.0, 1.0),
            ),
            None => (
                TriageStatus::from_score(relevance_score),
                format!(
                    "Relevance score {:.0}/100; status derived from the score.",
                    relevance_score
                ),
                0.0,
            ),
        };

        let outcome = TriageOutcome {
            status,
            relevance_score,
            confidence,
            rationale,
            context: context.value,
            key_findings,
            question_scores,
            evidence: evidence_excerpts,
            hypothesis_links,
            steps: vec![context.report, relevance.report, evidence.report, decision.report],
        };

        info!(
            status = outcome.status.as_str(),
            score = outcome.relevance_score,
            fallbacks = outcome.fallbacks().len(),
            "Triage complete"
        );
        outcome
    }

    fn prompt(&self, input: &TriageInput<'_>, task: &str, ctx: &PipelineContext) -> Result<String, String> {
        let abstract_text = input
            .article
            .abstract_text
            .as_deref()
            .map(|a| truncate_chars(a, self.settings.max_input_chars))
            .unwrap_or("");
        let previous = if ctx.is_empty() { String::new() } else { ctx.to_prompt_json() };
        prompts::render(
            TRIAGE_TEMPLATE,
            context! {
                task => task,
                project => input.project,
                questions => input.questions,
                hypotheses => input.hypotheses,
                article => input.article,
                abstract_text => abstract_text,
                previous => previous,
            },
        )
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 }
}

fn known_id(raw: &str, known: &HashSet<Uuid>) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok().filter(|id| known.contains(id))
}
