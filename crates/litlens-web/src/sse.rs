//! Server-Sent Events (SSE) stream of triage, protocol, insight and alert events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::auth::UserId;
use crate::state::{AppEvent, AppState, SharedState};

/// GET /api/events - clients subscribe here for real-time updates.
/// Project events only reach users holding a role on that project; the check
/// runs per event so collaborator changes apply to open streams.
/// Subscribers that fall behind skip the events they missed.
pub async fn sse_handler(
    State(state): State<SharedState>,
    user: UserId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let state = state.clone();
        let user = user.clone();
        async move {
            let event = result.ok()?;
            if !visible_to(&state, &event, &user).await {
                return None;
            }
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok(Event::default().data(data)))
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn visible_to(state: &AppState, event: &AppEvent, user: &UserId) -> bool {
    let Some(project_id) = event.project_id() else {
        return true;
    };
    match state.projects.role_of(project_id, user.as_str()).await {
        Ok(role) => role.is_some(),
        Err(e) => {
            warn!(error = %e, project_id = %project_id, "Role lookup failed; event withheld");
            false
        }
    }
}
