use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use litlens_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

enum Reply {
    Text(String),
    Error(String),
}

/// LLM backend that replays a fixed queue of replies and records every request.
/// Once the queue is empty every call fails with `LlmError::Unavailable`.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON value, serialized as the reply content.
    pub fn reply_json(self, value: serde_json::Value) -> Self {
        self.reply_text(value.to_string())
    }

    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a JSON reply on a backend that is already shared, for replies
    /// that depend on ids created during the test.
    pub fn push_json(&self, value: serde_json::Value) {
        self.replies.lock().unwrap().push_back(Reply::Text(value.to_string()));
    }

    /// Queue an API failure.
    pub fn reply_error(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Error(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// User-message content of the n-th request.
    pub fn user_prompt(&self, n: usize) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .get(n)
            .and_then(|r| r.messages.iter().find(|m| m.role == "user"))
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(req);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(content)) => Ok(LlmResponse {
                completion_tokens: (content.len() / 4) as u32,
                content,
                model: "scripted".to_string(),
                prompt_tokens: 100,
            }),
            Some(Reply::Error(message)) => Err(LlmError::Api { status: 500, message }),
            None => Err(LlmError::Unavailable("script exhausted".to_string())),
        }
    }

    fn model_id(&self) -> &str { "scripted" }
    fn max_output_tokens(&self) -> usize { 4096 }
}
