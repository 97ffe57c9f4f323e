//! Running one pipeline step: prompt, parse, validate, deserialize, or fall back.

use std::time::Instant;

use litlens_config::LlmConfig;
use litlens_llm::{extract_json, LlmAuditEntry, LlmBackend, LlmRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::shape::Shape;

/// Per-call generation settings shared by every step of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_input_chars: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { temperature: 0.2, max_tokens: 2048, max_input_chars: 12_000 }
    }
}

impl From<&LlmConfig> for RunSettings {
    fn from(cfg: &LlmConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            max_input_chars: cfg.max_input_chars,
        }
    }
}

/// Static description of a step.
pub struct StepSpec {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub fell_back: bool,
    pub error: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StepOutcome<T> {
    pub value: T,
    /// The validated JSON (or the serialized default) handed to later steps.
    pub json: Value,
    pub report: StepReport,
}

impl<T> StepOutcome<T> {
    pub fn fell_back(&self) -> bool {
        self.report.fell_back
    }
}

/// Accumulated outputs of the steps run so far, keyed by step name.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    outputs: Map<String, Value>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step: &str, output: Value) {
        self.outputs.insert(step.to_string(), output);
    }

    pub fn get(&self, step: &str) -> Option<&Value> {
        self.outputs.get(step)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Pretty JSON of everything so far, for embedding in the next prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.outputs).unwrap_or_else(|_| "{}".to_string())
    }
}

pub struct StepRunner<'a> {
    backend: &'a dyn LlmBackend,
    pipeline: &'static str,
    settings: RunSettings,
}

impl<'a> StepRunner<'a> {
    pub fn new(backend: &'a dyn LlmBackend, pipeline: &'static str, settings: RunSettings) -> Self {
        Self { backend, pipeline, settings }
    }

    pub fn settings(&self) -> RunSettings {
        self.settings
    }

    /// Runs `spec` with the rendered `user_prompt`. Never fails: any error
    /// yields `T::default()` with `report.fell_back` set.
    pub async fn run<T>(&self, spec: &StepSpec, user_prompt: Result<String, String>) -> StepOutcome<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let user_prompt = match user_prompt {
            Ok(p) => p,
            Err(e) => return self.fallback(spec, format!("prompt rendering failed: {}", e), 0, 0, 0),
        };

        let req = LlmRequest::new(spec.system_prompt, user_prompt)
            .json()
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let started = Instant::now();
        let resp = self.backend.complete(req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => return self.fallback(spec, format!("LLM call failed: {}", e), 0, 0, latency_ms),
        };

        let parsed = extract_json(&resp.content)
            .ok_or_else(|| "reply contained no JSON object".to_string())
            .and_then(|v| spec.shape.conform(v).map_err(|e| format!("unexpected shape: {}", e)))
            .and_then(|v| {
                serde_json::from_value::<T>(v.clone())
                    .map(|t| (t, v))
                    .map_err(|e| format!("could not deserialize: {}", e))
            });

        match parsed {
            Ok((value, json)) => {
                LlmAuditEntry::new(
                    self.pipeline, spec.name, &resp.model,
                    resp.prompt_tokens, resp.completion_tokens,
                    &resp.content, latency_ms, true,
                )
                .emit();
                debug!(pipeline = self.pipeline, step = spec.name, "Step succeeded");
                StepOutcome {
                    value,
                    json,
                    report: StepReport {
                        name: spec.name.to_string(),
                        fell_back: false,
                        error: None,
                        prompt_tokens: resp.prompt_tokens,
                        completion_tokens: resp.completion_tokens,
                        latency_ms,
                    },
                }
            }
            Err(e) => {
                LlmAuditEntry::new(
                    self.pipeline, spec.name, &resp.model,
                    resp.prompt_tokens, resp.completion_tokens,
                    &resp.content, latency_ms, false,
                )
                .emit();
                self.fallback(spec, e, resp.prompt_tokens, resp.completion_tokens, latency_ms)
            }
        }
    }

    fn fallback<T>(
        &self,
        spec: &StepSpec,
        error: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        latency_ms: u64,
    ) -> StepOutcome<T>
    where
        T: Serialize + Default,
    {
        warn!(pipeline = self.pipeline, step = spec.name, error = %error, "Step failed, using default output");
        let value = T::default();
        let json = serde_json::to_value(&value).unwrap_or(Value::Null);
        StepOutcome {
            value,
            json,
            report: StepReport {
                name: spec.name.to_string(),
                fell_back: true,
                error: Some(error),
                prompt_tokens,
                completion_tokens,
                latency_ms,
            },
        }
    }
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Kind;
    use litlens_test_utils::ScriptedBackend;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Out {
        summary: String,
    }

    fn spec() -> StepSpec {
        StepSpec {
            name: "summary",
            system_prompt: "Return JSON {\"summary\": string}",
            shape: Shape::new().required("summary", Kind::String),
        }
    }

    #[tokio::test]
    async fn test_successful_step() {
        let backend = ScriptedBackend::new().reply_json(json!({"summary": "fine"}));
        let runner = StepRunner::new(&backend, "test", RunSettings::default());
        let out: StepOutcome<Out> = runner.run(&spec(), Ok("go".into())).await;
        assert!(!out.fell_back());
        assert_eq!(out.value.summary, "fine");
        assert_eq!(out.json, json!({"summary": "fine"}));
        assert_eq!(out.report.prompt_tokens, 100);
        assert!(backend.requests()[0].json_mode);
    }

    #[tokio::test]
    async fn test_llm_error_falls_back() {
        let backend = ScriptedBackend::new().reply_error("boom");
        let runner = StepRunner::new(&backend, "test", RunSettings::default());
        let out: StepOutcome<Out> = runner.run(&spec(), Ok("go".into())).await;
        assert!(out.fell_back());
        assert_eq!(out.value, Out::default());
        assert_eq!(out.json, json!({"summary": ""}));
        assert!(out.report.error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_bad_shape_falls_back() {
        let backend = ScriptedBackend::new().reply_json(json!({"summary": ["not", "a", "string"]}));
        let runner = StepRunner::new(&backend, "test", RunSettings::default());
        let out: StepOutcome<Out> = runner.run(&spec(), Ok("go".into())).await;
        assert!(out.fell_back());
        assert!(out.report.error.as_deref().unwrap().starts_with("unexpected shape"));
    }

    #[tokio::test]
    async fn test_prose_reply_falls_back() {
        let backend = ScriptedBackend::new().reply_text("Sorry, I can't do that.");
        let runner = StepRunner::new(&backend, "test", RunSettings::default());
        let out: StepOutcome<Out> = runner.run(&spec(), Ok("go".into())).await;
        assert!(out.fell_back());
    }

    #[tokio::test]
    async fn test_render_error_skips_llm() {
        let backend = ScriptedBackend::new();
        let runner = StepRunner::new(&backend, "test", RunSettings::default());
        let out: StepOutcome<Out> = runner.run(&spec(), Err("bad template".into())).await;
        assert!(out.fell_back());
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_context_accumulates() {
        let mut ctx = PipelineContext::new();
        assert!(ctx.is_empty());
        ctx.insert("a", json!({"x": 1}));
        assert_eq!(ctx.get("a"), Some(&json!({"x": 1})));
        assert!(ctx.to_prompt_json().contains("\"x\": 1"));
    }
}
