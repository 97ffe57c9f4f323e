//! Prompt templates. User prompts are minijinja templates shared by all steps
//! of a pipeline; each step supplies its own system prompt and task line.

use std::sync::OnceLock;

use minijinja::Environment;
use serde::Serialize;

pub const TRIAGE_TEMPLATE: &str = "triage";
pub const PROTOCOL_TEMPLATE: &str = "protocol";
pub const INSIGHTS_TEMPLATE: &str = "insights";

const TRIAGE_USER: &str = r#"Task: {{ task }}

Research project: {{ project.name }}
{%- if project.description %}
Project description: {{ project.description }}
{%- endif %}

Research questions:
{%- for q in questions %}
- [{{ q.id }}] (priority {{ q.priority }}) {{ q.text }}
{%- else %}
- none recorded
{%- endfor %}

Hypotheses:
{%- for h in hypotheses %}
- [{{ h.id }}] {{ h.statement }}
{%- else %}
- none recorded
{%- endfor %}

Article PMID {{ article.pmid }}: {{ article.title }}
{%- if article.journal %}
Journal: {{ article.journal }}{% if article.publication_year %} ({{ article.publication_year }}){% endif %}
{%- endif %}
{%- if article.mesh_terms %}
MeSH terms: {{ article.mesh_terms | join(", ") }}
{%- endif %}

Abstract:
{% if abstract_text %}{{ abstract_text }}{% else %}(no abstract available){% endif %}
{%- if previous %}

Results of earlier analysis steps (JSON):
{{ previous }}
{%- endif %}"#;

const PROTOCOL_USER: &str = r#"Task: {{ task }}

Article PMID {{ article.pmid }}: {{ article.title }}

Methods text ({{ source }}):
{{ methods }}
{%- if previous %}

Already extracted (JSON):
{{ previous }}
{%- endif %}"#;

const INSIGHTS_USER: &str = r#"Task: {{ task }}

Research project: {{ project.name }}
{%- if project.description %}
Project description: {{ project.description }}
{%- endif %}

Research questions:
{%- for q in questions %}
- [{{ q.id }}] ({{ q.status }}) {{ q.text }}
{%- else %}
- none recorded
{%- endfor %}

Hypotheses:
{%- for h in hypotheses %}
- [{{ h.id }}] ({{ h.status }}) {{ h.statement }}
{%- else %}
- none recorded
{%- endfor %}

Triaged papers:
{%- for t in triages %}
- PMID {{ t.pmid }} [{{ t.status }}, score {{ t.relevance_score }}] {{ t.title }}
{%- for f in t.key_findings %}
    * {{ f }}
{%- endfor %}
{%- else %}
- none yet
{%- endfor %}

Extracted protocols: {{ protocols | join(", ") if protocols else "none" }}
Annotations recorded: {{ annotation_count }}
{%- if previous %}

Results of earlier analysis steps (JSON):
{{ previous }}
{%- endif %}"#;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> &'static Environment<'static> {
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in [
            (TRIAGE_TEMPLATE, TRIAGE_USER),
            (PROTOCOL_TEMPLATE, PROTOCOL_USER),
            (INSIGHTS_TEMPLATE, INSIGHTS_USER),
        ] {
            if let Err(e) = env.add_template(name, source) {
                tracing::error!(template = name, error = %e, "Invalid prompt template");
            }
        }
        env
    })
}

/// Renders a user prompt. Errors are returned as strings so the step runner
/// can record them as the step's fallback reason.
pub fn render<S: Serialize>(template: &str, ctx: S) -> Result<String, String> {
    env()
        .get_template(template)
        .and_then(|t| t.render(ctx))
        .map_err(|e| e.to_string())
}

// ── System prompts ───────────────────────────────────────────────────────────

pub mod system {
    pub const TRIAGE_CONTEXT: &str = "You are a biomedical research analyst. Identify what an article is about \
relative to a research project. Respond with a single JSON object: \
{\"key_concepts\": [string], \"research_domain\": string, \"study_type\": string}.";

    pub const TRIAGE_RELEVANCE: &str = "You score how relevant an article is to a research project. \
Respond with a single JSON object: {\"relevance_score\": number from 0 to 100, \
\"question_scores\": [{\"question_id\": string, \"score\": number from 0 to 100, \"rationale\": string}]}. \
Only use question ids listed in the prompt.";

    pub const TRIAGE_EVIDENCE: &str = "You extract evidence from an article abstract. Respond with a single JSON object: \
{\"key_findings\": [string], \"evidence\": [{\"excerpt\": string, \"question_ids\": [string]}], \
\"hypothesis_links\": [{\"hypothesis_id\": string, \"relationship\": \"supports\" | \"contradicts\" | \"neutral\", \
\"rationale\": string}]}. Excerpts must be quoted from the abstract.";

    pub const TRIAGE_DECISION: &str = "You make the final reading decision for an article. Respond with a single JSON \
object: {\"triage_status\": \"must_read\" | \"nice_to_know\" | \"ignore\", \"rationale\": string, \
\"confidence\": number from 0 to 1}.";

    pub const PROTOCOL_MATERIALS: &str = "You extract reagents and materials from a methods section. Respond with a \
single JSON object: {\"materials\": [{\"name\": string, \"catalog_number\": string or null, \
\"supplier\": string or null, \"amount\": string or null}]}.";

    pub const PROTOCOL_EQUIPMENT: &str = "You extract laboratory equipment from a methods section. Respond with a \
single JSON object: {\"equipment\": [{\"name\": string, \"model\": string or null, \"settings\": string or null}]}.";

    pub const PROTOCOL_PROCEDURE: &str = "You rewrite a methods section as an ordered procedure. Respond with a single \
JSON object: {\"steps\": [{\"step_number\": number, \"description\": string, \"duration\": string or null, \
\"temperature\": string or null, \"notes\": string or null}]}.";

    pub const PROTOCOL_VALIDATION: &str = "You review an extracted protocol for completeness. Respond with a single JSON \
object: {\"protocol_name\": string, \"protocol_type\": string or null, \
\"difficulty\": \"easy\" | \"moderate\" | \"hard\" | null, \"estimated_duration\": string or null, \
\"key_parameters\": [string], \"confidence\": number from 0 to 1}.";

    pub const INSIGHTS_PROGRESS: &str = "You assess progress of a research project. Respond with a single JSON object: \
{\"summary\": string, \"answered_question_ids\": [string], \"open_question_ids\": [string]}.";

    pub const INSIGHTS_EVIDENCE: &str = "You weigh the evidence for each hypothesis of a research project. Respond \
with a single JSON object: {\"hypothesis_assessments\": [{\"hypothesis_id\": string, \
\"verdict\": \"supported\" | \"refuted\" | \"inconclusive\", \"supporting_pmids\": [string], \
\"contradicting_pmids\": [string]}]}.";

    pub const INSIGHTS_GAPS: &str = "You identify gaps in a research project's literature coverage. Respond with a \
single JSON object: {\"gaps\": [{\"description\": string, \"related_question_id\": string or null}]}.";

    pub const INSIGHTS_RECOMMENDATIONS: &str = "You recommend next steps for a research project. Respond with a single \
JSON object: {\"recommendations\": [{\"title\": string, \"description\": string, \
\"priority\": \"high\" | \"medium\" | \"low\"}]}.";
}
