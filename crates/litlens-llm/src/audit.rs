//! Audit records for LLM calls. One entry per orchestrator step.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub pipeline: String,
    pub step: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub succeeded: bool,
    pub called_at: chrono::DateTime<Utc>,
}

impl LlmAuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pipeline: &str,
        step: &str,
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
        output: &str,
        latency_ms: u64,
        succeeded: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline: pipeline.to_string(),
            step: step.to_string(),
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
            output_hash: hash_output(output),
            latency_ms,
            succeeded,
            called_at: Utc::now(),
        }
    }

    pub fn emit(&self) {
        tracing::info!(
            target: "litlens::llm_audit",
            audit_id = %self.id,
            pipeline = %self.pipeline,
            step = %self.step,
            model = %self.model,
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            latency_ms = self.latency_ms,
            succeeded = self.succeeded,
            output_hash = %self.output_hash,
            "LLM call"
        );
    }
}

fn hash_output(output: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(output.as_bytes());
    format!("{:x}", hasher.finalize())
}
