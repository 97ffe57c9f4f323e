//! litlens-llm — LLM backend abstraction layer.
//! Chat-completion backends behind the `LlmBackend` trait, JSON reply
//! extraction, and per-call audit records.

pub mod backend;
pub mod json;
pub mod audit;

pub use backend::{
    build_backend, DisabledBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message,
    OpenAiBackend, OpenAiCompatibleBackend,
};
pub use json::extract_json;
pub use audit::LlmAuditEntry;
