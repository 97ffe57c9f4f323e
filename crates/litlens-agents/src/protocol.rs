//! Protocol extraction: turns a methods section into a structured protocol.
//!
//! Steps: materials → equipment → procedure → validation. Without any
//! methods text or abstract the pipeline returns an empty protocol and makes
//! no LLM calls.

use std::sync::Arc;

use chrono::Utc;
use litlens_common::{Article, Equipment, Material, Protocol, ProtocolStep};
use litlens_llm::LlmBackend;
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::lenient;
use crate::prompts::{self, system, PROTOCOL_TEMPLATE};
use crate::shape::{Kind, Shape};
use crate::step::{truncate_chars, PipelineContext, RunSettings, StepReport, StepRunner, StepSpec};

const PIPELINE: &str = "protocol";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawMaterial {
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    catalog_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    supplier: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    amount: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MaterialsOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    materials: Vec<RawMaterial>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawEquipment {
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    model: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    settings: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EquipmentOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    equipment: Vec<RawEquipment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawStep {
    #[serde(default, deserialize_with = "lenient::string")]
    description: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    duration: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    temperature: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProcedureOutput {
    #[serde(default, deserialize_with = "lenient::list")]
    steps: Vec<RawStep>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ValidationOutput {
    #[serde(default, deserialize_with = "lenient::string")]
    protocol_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    protocol_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    estimated_duration: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    key_parameters: Vec<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    confidence: f64,
}

fn steps() -> [StepSpec; 4] {
    [
        StepSpec {
            name: "materials",
            system_prompt: system::PROTOCOL_MATERIALS,
            shape: Shape::new().required_any(&["materials", "reagents"], Kind::Array),
        },
        StepSpec {
            name: "equipment",
            system_prompt: system::PROTOCOL_EQUIPMENT,
            shape: Shape::new().required_any(&["equipment", "instruments"], Kind::Array),
        },
        StepSpec {
            name: "procedure",
            system_prompt: system::PROTOCOL_PROCEDURE,
            shape: Shape::new().required_any(&["steps", "procedure"], Kind::Array),
        },
        StepSpec {
            name: "validation",
            system_prompt: system::PROTOCOL_VALIDATION,
            shape: Shape::new()
                .required_any(&["protocol_name", "name"], Kind::String)
                .required("key_parameters", Kind::Array)
                .required("confidence", Kind::Number)
                .optional("protocol_type", Kind::String)
                .optional("difficulty", Kind::String)
                .optional("estimated_duration", Kind::String),
        },
    ]
}

const TASKS: [&str; 4] = [
    "List every reagent and material used, with catalog numbers, suppliers and amounts when stated.",
    "List every piece of laboratory equipment used, with model and settings when stated.",
    "Write the procedure as ordered steps with durations and temperatures when stated.",
    "Name the protocol, classify it, rate its difficulty and list its critical parameters.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodsSource {
    /// Methods section extracted from the full text.
    Methods,
    Abstract,
    None,
}

impl MethodsSource {
    fn label(&self) -> &'static str {
        match self {
            MethodsSource::Methods  => "methods section of the full text",
            MethodsSource::Abstract => "abstract only; full text unavailable",
            MethodsSource::None     => "none",
        }
    }
}

pub struct ProtocolInput<'a> {
    pub article: &'a Article,
    pub methods_text: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolOutcome {
    pub name: String,
    pub protocol_type: Option<String>,
    pub materials: Vec<Material>,
    pub equipment: Vec<Equipment>,
    pub steps: Vec<ProtocolStep>,
    pub key_parameters: Vec<String>,
    pub difficulty: Option<String>,
    pub estimated_duration: Option<String>,
    pub confidence: f64,
    pub source: MethodsSource,
    pub step_reports: Vec<StepReport>,
}

impl ProtocolOutcome {
    fn empty(article: &Article) -> Self {
        Self {
            name: article.title.clone(),
            protocol_type: None,
            materials: Vec::new(),
            equipment: Vec::new(),
            steps: Vec::new(),
            key_parameters: Vec::new(),
            difficulty: None,
            estimated_duration: None,
            confidence: 0.0,
            source: MethodsSource::None,
            step_reports: Vec::new(),
        }
    }

    pub fn fallbacks(&self) -> Vec<String> {
        self.step_reports.iter().filter(|s| s.fell_back).map(|s| s.name.clone()).collect()
    }

    /// True when nothing usable was extracted.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.equipment.is_empty() && self.steps.is_empty()
    }

    pub fn into_protocol(self, project_id: Uuid, pmid: &str) -> Protocol {
        Protocol {
            id: Uuid::new_v4(),
            project_id,
            pmid: pmid.to_string(),
            fallbacks: self.fallbacks(),
            name: self.name,
            protocol_type: self.protocol_type,
            materials: self.materials,
            equipment: self.equipment,
            steps: self.steps,
            key_parameters: self.key_parameters,
            difficulty: self.difficulty,
            estimated_duration: self.estimated_duration,
            confidence: self.confidence,
            created_at: Utc::now(),
        }
    }
}

pub struct ProtocolOrchestrator {
    backend: Arc<dyn LlmBackend>,
    settings: RunSettings,
}

impl ProtocolOrchestrator {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: RunSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(skip(self, input), fields(pmid = %input.article.pmid))]
    pub async fn run(&self, input: ProtocolInput<'_>) -> ProtocolOutcome {
        let (source, text) = match (input.methods_text, input.article.abstract_text.as_deref()) {
            (Some(m), _) if !m.trim().is_empty() => (MethodsSource::Methods, m),
            (_, Some(a)) if !a.trim().is_empty() => (MethodsSource::Abstract, a),
            _ => {
                info!("No methods text or abstract; returning empty protocol");
                return ProtocolOutcome::empty(input.article);
            }
        };
        let text = truncate_chars(text, self.settings.max_input_chars);

        let runner = StepRunner::new(self.backend.as_ref(), PIPELINE, self.settings);
        let [materials_spec, equipment_spec, procedure_spec, validation_spec] = steps();
        let mut ctx = PipelineContext::new();
        let prompt = |task: &str, ctx: &PipelineContext| {
            let previous = if ctx.is_empty() { String::new() } else { ctx.to_prompt_json() };
            prompts::render(
                PROTOCOL_TEMPLATE,
                context! {
                    task => task,
                    article => input.article,
                    source => source.label(),
                    methods => text,
                    previous => previous,
                },
            )
        };

        let materials = runner.run::<MaterialsOutput>(&materials_spec, prompt(TASKS[0], &ctx)).await;
        ctx.insert(materials_spec.name, materials.json.clone());

        let equipment = runner.run::<EquipmentOutput>(&equipment_spec, prompt(TASKS[1], &ctx)).await;
        ctx.insert(equipment_spec.name, equipment.json.clone());

        let procedure = runner.run::<ProcedureOutput>(&procedure_spec, prompt(TASKS[2], &ctx)).await;
        ctx.insert(procedure_spec.name, procedure.json.clone());

        let validation = runner.run::<ValidationOutput>(&validation_spec, prompt(TASKS[3], &ctx)).await;

        let materials_out = materials
            .value
            .materials
            .into_iter()
            .filter(|m| !m.name.is_empty())
            .map(|m| Material {
                name: m.name,
                catalog_number: m.catalog_number,
                supplier: m.supplier,
                amount: m.amount,
            })
            .collect();
        let equipment_out = equipment
            .value
            .equipment
            .into_iter()
            .filter(|e| !e.name.is_empty())
            .map(|e| Equipment { name: e.name, model: e.model, settings: e.settings })
            .collect();
        let steps_out = renumber(procedure.value.steps);

        let v = validation.value;
        let name = if v.protocol_name.is_empty() { input.article.title.clone() } else { v.protocol_name };
        let confidence = if v.confidence.is_finite() { v.confidence.clamp(0.0, 1.0) } else { 0.0 };

        let outcome = ProtocolOutcome {
            name,
            protocol_type: v.protocol_type,
            materials: materials_out,
            equipment: equipment_out,
            steps: steps_out,
            key_parameters: v.key_parameters,
            difficulty: v.difficulty.map(|d| d.to_ascii_lowercase()),
            estimated_duration: v.estimated_duration,
            confidence,
            source,
            step_reports: vec![materials.report, equipment.report, procedure.report, validation.report],
        };

        info!(
            materials = outcome.materials.len(),
            equipment = outcome.equipment.len(),
            steps = outcome.steps.len(),
            fallbacks = outcome.fallbacks().len(),
            "Protocol extraction complete"
        );
        outcome
    }
}

/// Drops blank steps and numbers the rest 1..n in the order given.
fn renumber(raw: Vec<RawStep>) -> Vec<ProtocolStep> {
    raw.into_iter()
        .filter(|s| !s.description.is_empty())
        .enumerate()
        .map(|(i, s)| ProtocolStep {
            step_number: i as u32 + 1,
            description: s.description,
            duration: s.duration,
            temperature: s.temperature,
            notes: s.notes,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber_drops_blank_and_orders() {
        let raw = vec![
            RawStep { description: "Seed cells".into(), ..Default::default() },
            RawStep { description: String::new(), ..Default::default() },
            RawStep { description: "Treat with drug".into(), duration: Some("24 h".into()), ..Default::default() },
        ];
        let steps = renumber(raw);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].step_number, 2);
        assert_eq!(steps[1].duration.as_deref(), Some("24 h"));
    }

    #[test]
    fn test_reagents_alias_accepted() {
        let [spec, ..] = steps();
        let v = spec.shape.conform(serde_json::json!({"reagents": [{"name": "PBS"}]})).unwrap();
        let out: MaterialsOutput = serde_json::from_value(v).unwrap();
        assert_eq!(out.materials[0].name, "PBS");
    }

    #[test]
    fn test_default_materials_and_equipment_are_empty_lists() {
        let m = serde_json::to_value(MaterialsOutput::default()).unwrap();
        let e = serde_json::to_value(EquipmentOutput::default()).unwrap();
        assert_eq!(m, serde_json::json!({"materials": []}));
        assert_eq!(e, serde_json::json!({"equipment": []}));
    }
}
