//! litlens-agents — Sequential LLM pipelines.
//!
//! Each orchestrator runs a fixed list of steps one after another. A step's
//! validated JSON is added to the shared context for the steps after it; a
//! step that fails for any reason contributes its default output instead.
//!
//!   TriageOrchestrator   — context → relevance → evidence → decision
//!   ProtocolOrchestrator — materials → equipment → procedure → validation
//!   InsightsOrchestrator — progress → evidence synthesis → gaps → recommendations

pub mod shape;
pub mod step;
pub mod prompts;
mod lenient;

pub mod triage;
pub mod protocol;
pub mod insights;

pub use shape::{Kind, Shape, ShapeError};
pub use step::{PipelineContext, RunSettings, StepOutcome, StepReport, StepRunner};
pub use triage::{TriageInput, TriageOrchestrator, TriageOutcome};
pub use protocol::{MethodsSource, ProtocolInput, ProtocolOrchestrator, ProtocolOutcome};
pub use insights::{
    InsightsOrchestrator, ProjectInsights, ProjectSnapshot, RecommendationPriority, TriageSummary,
};
