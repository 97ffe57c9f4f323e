//! Project insights: progress, evidence per hypothesis, gaps, next steps.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use litlens_common::{
    Hypothesis, HypothesisLink, HypothesisStatus, Project, ResearchQuestion, TriageStatus,
};
use litlens_llm::LlmBackend;
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::lenient;
use crate::prompts::{self, system, INSIGHTS_TEMPLATE};
use crate::shape::{Kind, Shape};
use crate::step::{PipelineContext, RunSettings, StepReport, StepRunner, StepSpec};

const PIPELINE: &str = "insights";

/// Triage result condensed for the insights prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSummary {
    pub pmid: String,
    pub title: String,
    pub status: TriageStatus,
    pub relevance_score: f64,
    pub key_findings: Vec<String>,
    pub hypothesis_links: Vec<HypothesisLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: Project,
    pub questions: Vec<ResearchQuestion>,
    pub hypotheses: Vec<Hypothesis>,
    pub triages: Vec<TriageSummary>,
    pub protocols: Vec<String>,
    pub annotation_count: usize,
}

// ── Step outputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProgressOutput {
    #[serde(default, deserialize_with = "lenient::string")]
    summary: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    answered_question_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    open_question_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawAssessment {
    #[serde(default, deserialize_with = "lenient::string")]
    hypothesis_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    verdict: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    supporting_pmids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    contradicting_pmids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EvidenceOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    hypothesis_assessments: Vec<RawAssessment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawGap {
    #[serde(default, deserialize_with = "lenient::string")]
    description: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    related_question_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GapsOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    gaps: Vec<RawGap>,
}

/// Declaration order is the sort order: high first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl RecommendationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationPriority::High   => "high",
            RecommendationPriority::Medium => "medium",
            RecommendationPriority::Low    => "low",
        }
    }

    /// Case-insensitive; anything unrecognised is `Medium`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" | "critical" => RecommendationPriority::High,
            "low" | "optional"             => RecommendationPriority::Low,
            _                              => RecommendationPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRecommendation {
    #[serde(default, deserialize_with = "lenient::string")]
    title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    priority: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecommendationsOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    recommendations: Vec<RawRecommendation>,
}

fn steps() -> [StepSpec; 4] {
    [
        StepSpec {
            name: "progress",
            system_prompt: system::INSIGHTS_PROGRESS,
            shape: Shape::new()
                .required("summary", Kind::String)
                .optional("answered_question_ids", Kind::Array)
                .optional("open_question_ids", Kind::Array),
        },
        StepSpec {
            name: "evidence_synthesis",
            system_prompt: system::INSIGHTS_EVIDENCE,
            shape: Shape::new().required_any(&["hypothesis_assessments", "assessments"], Kind::Array),
        },
        StepSpec {
            name: "gaps",
            system_prompt: system::INSIGHTS_GAPS,
            shape: Shape::new().required_any(&["gaps", "research_gaps"], Kind::Array),
        },
        StepSpec {
            name: "recommendations",
            system_prompt: system::INSIGHTS_RECOMMENDATIONS,
            shape: Shape::new().required("recommendations", Kind::Array),
        },
    ]
}

const TASKS: [&str; 4] = [
    "Summarise the project's progress and say which research questions are answered and which remain open.",
    "Assess each hypothesis against the triaged papers, citing PMIDs.",
    "Identify gaps in the literature the project has covered so far.",
    "Recommend concrete next steps, each with a priority.",
];

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisAssessment {
    pub hypothesis_id: Uuid,
    pub verdict: HypothesisStatus,
    pub supporting_pmids: Vec<String>,
    pub contradicting_pmids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchGap {
    pub description: String,
    pub related_question_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: RecommendationPriority,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInsights {
    pub project_id: Uuid,
    pub summary: String,
    pub answered_question_ids: Vec<Uuid>,
    pub open_question_ids: Vec<Uuid>,
    pub hypothesis_assessments: Vec<HypothesisAssessment>,
    pub gaps: Vec<ResearchGap>,
    pub recommendations: Vec<Recommendation>,
    pub steps: Vec<StepReport>,
    pub generated_at: DateTime<Utc>,
}

impl ProjectInsights {
    pub fn fallbacks(&self) -> Vec<String> {
        self.steps.iter().filter(|s| s.fell_back).map(|s| s.name.clone()).collect()
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

pub struct InsightsOrchestrator {
    backend: Arc<dyn LlmBackend>,
    settings: RunSettings,
}

impl InsightsOrchestrator {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: RunSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(skip(self, snapshot), fields(project = %snapshot.project.id))]
    pub async fn run(&self, snapshot: &ProjectSnapshot) -> ProjectInsights {
        let runner = StepRunner::new(self.backend.as_ref(), PIPELINE, self.settings);
        let [progress_spec, evidence_spec, gaps_spec, recs_spec] = steps();
        let mut ctx = PipelineContext::new();

        let prompt = |task: &str, ctx: &PipelineContext| {
            let previous = if ctx.is_empty() { String::new() } else { ctx.to_prompt_json() };
            prompts::render(
                INSIGHTS_TEMPLATE,
                context! {
                    task => task,
                    project => &snapshot.project,
                    questions => &snapshot.questions,
                    hypotheses => &snapshot.hypotheses,
                    triages => &snapshot.triages,
                    protocols => &snapshot.protocols,
                    annotation_count => snapshot.annotation_count,
                    previous => previous,
                },
            )
        };

        let progress = runner.run::<ProgressOutput>(&progress_spec, prompt(TASKS[0], &ctx)).await;
        ctx.insert(progress_spec.name, progress.json.clone());

        let evidence = runner.run::<EvidenceOutput>(&evidence_spec, prompt(TASKS[1], &ctx)).await;
        ctx.insert(evidence_spec.name, evidence.json.clone());

        let gaps = runner.run::<GapsOutput>(&gaps_spec, prompt(TASKS[2], &ctx)).await;
        ctx.insert(gaps_spec.name, gaps.json.clone());

        let recs = runner.run::<RecommendationsOutput>(&recs_spec, prompt(TASKS[3], &ctx)).await;

        let question_ids: HashSet<Uuid> = snapshot.questions.iter().map(|q| q.id).collect();
        let hypothesis_ids: HashSet<Uuid> = snapshot.hypotheses.iter().map(|h| h.id).collect();
        let known_pmids: HashSet<&str> = snapshot.triages.iter().map(|t| t.pmid.as_str()).collect();

        let ids = |raw: &[String], known: &HashSet<Uuid>| -> Vec<Uuid> {
            let mut seen = HashSet::new();
            raw.iter()
                .filter_map(|s| Uuid::parse_str(s.trim()).ok())
                .filter(|id| known.contains(id) && seen.insert(*id))
                .collect()
        };
        let pmids = |raw: Vec<String>| -> Vec<String> {
            raw.into_iter().filter(|p| known_pmids.contains(p.as_str())).collect()
        };

        let summary = if progress.fell_back() {
            fallback_summary(snapshot)
        } else {
            progress.value.summary
        };

        let hypothesis_assessments = evidence
            .value
            .hypothesis_assessments
            .into_iter()
            .filter_map(|a| {
                let id = Uuid::parse_str(a.hypothesis_id.trim()).ok().filter(|id| hypothesis_ids.contains(id))?;
                Some(HypothesisAssessment {
                    hypothesis_id: id,
                    verdict: verdict(&a.verdict),
                    supporting_pmids: pmids(a.supporting_pmids),
                    contradicting_pmids: pmids(a.contradicting_pmids),
                })
            })
            .collect();

        let gaps_out = gaps
            .value
            .gaps
            .into_iter()
            .filter(|g| !g.description.is_empty())
            .map(|g| ResearchGap {
                related_question_id: g
                    .related_question_id
                    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
                    .filter(|id| question_ids.contains(id)),
                description: g.description,
            })
            .collect();

        let mut recommendations: Vec<Recommendation> = recs
            .value
            .recommendations
            .into_iter()
            .filter(|r| !r.title.is_empty())
            .map(|r| Recommendation {
                priority: RecommendationPriority::parse(&r.priority),
                title: r.title,
                description: r.description,
            })
            .collect();
        recommendations.sort_by_key(|r| r.priority);

        let insights = ProjectInsights {
            project_id: snapshot.project.id,
            summary,
            answered_question_ids: ids(&progress.value.answered_question_ids, &question_ids),
            open_question_ids: ids(&progress.value.open_question_ids, &question_ids),
            hypothesis_assessments,
            gaps: gaps_out,
            recommendations,
            steps: vec![progress.report, evidence.report, gaps.report, recs.report],
            generated_at: Utc::now(),
        };

        info!(
            recommendations = insights.recommendations.len(),
            gaps = insights.gaps.len(),
            fallbacks = insights.fallbacks().len(),
            "Insights generated"
        );
        insights
    }
}

fn verdict(raw: &str) -> HypothesisStatus {
    match HypothesisStatus::parse(raw) {
        HypothesisStatus::Proposed => HypothesisStatus::Inconclusive,
        other => other,
    }
}

/// Plain counts used when the progress step produced nothing.
fn fallback_summary(snapshot: &ProjectSnapshot) -> String {
    let must_read = snapshot.triages.iter().filter(|t| t.status == TriageStatus::MustRead).count();
    format!(
        "{} research questions, {} hypotheses, {} triaged papers ({} must-read), {} protocols.",
        snapshot.questions.len(),
        snapshot.hypotheses.len(),
        snapshot.triages.len(),
        must_read,
        snapshot.protocols.len(),
    )
}
