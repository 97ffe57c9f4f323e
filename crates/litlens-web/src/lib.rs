//! litlens-web — JSON REST API for LitLens
//! Serves:
//!   - Article search, lookup, PDF location and full-text extraction
//!   - Projects with collaborators, research questions and hypotheses
//!   - Paper triage, protocol extraction and project insights
//!   - Collections, annotations and alerts
//!   - Similarity, citation, timeline and author analytics
//!   - A server-sent event stream of everything above

pub mod auth;
pub mod error;
pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppEvent, AppState, Services, SharedState};
