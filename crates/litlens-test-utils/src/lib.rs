//! Shared testing utilities: a scripted LLM backend and entity fixtures.

pub mod fixtures;
pub mod scripted;

pub use fixtures::*;
pub use scripted::ScriptedBackend;
