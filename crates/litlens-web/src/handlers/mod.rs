//! HTTP handlers for all API routes.

pub mod health;
pub mod articles;
pub mod projects;
pub mod questions;
pub mod hypotheses;
pub mod triage;
pub mod protocols;
pub mod insights;
pub mod collections;
pub mod annotations;
pub mod alerts;
pub mod analytics;
