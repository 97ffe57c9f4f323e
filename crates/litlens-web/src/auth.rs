//! Caller identity and project access checks.
//!
//! Identity is asserted by the `User-ID` header; there is no session or
//! token layer. Project-scoped handlers call [`require_role`] before
//! touching project data.

use axum::{extract::FromRequestParts, http::request::Parts};
use litlens_common::ProjectRole;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "user-id";
const MAX_USER_ID_LEN: usize = 128;

/// The calling user, taken from the `User-ID` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ApiError::Unauthorized("User-ID header is empty".into()));
        }
        if id.chars().count() > MAX_USER_ID_LEN {
            return Err(ApiError::Unauthorized(format!(
                "User-ID must be at most {} characters",
                MAX_USER_ID_LEN
            )));
        }
        Ok(UserId(id.to_string()))
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing User-ID header".into()))?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("User-ID header is not valid text".into()))?;
        UserId::parse(raw)
    }
}

/// Checks the caller's role on a project. A project the caller has no role
/// on is reported as not found, so its existence is not disclosed.
pub async fn require_role(
    state: &AppState,
    project_id: Uuid,
    user: &UserId,
    required: ProjectRole,
) -> Result<ProjectRole, ApiError> {
    match state.projects.role_of(project_id, user.as_str()).await? {
        None => Err(ApiError::NotFound(format!("project {} not found", project_id))),
        Some(role) if role.allows(required) => Ok(role),
        Some(role) => Err(ApiError::Forbidden(format!(
            "{} role required, caller is {}",
            required.as_str(),
            role.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_trimmed_and_bounded() {
        assert_eq!(UserId::parse("  alice ").unwrap(), UserId("alice".into()));
        assert!(matches!(UserId::parse("   "), Err(ApiError::Unauthorized(_))));
        assert!(UserId::parse(&"x".repeat(128)).is_ok());
        assert!(matches!(UserId::parse(&"x".repeat(129)), Err(ApiError::Unauthorized(_))));
    }
}
