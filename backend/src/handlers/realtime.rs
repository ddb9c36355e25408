//! Server-sent change feed

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::extract::Query;
use crate::middleware::AuthUser;
use crate::services::realtime::{ChangeFilter, TableChange};
use crate::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    pub tables: Option<String>,
}

/// Render one change as an SSE frame
pub fn change_event(change: &TableChange) -> Event {
    match Event::default().event("change").json_data(change) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to encode table change: {}", e);
            Event::default().event("resync")
        }
    }
}

/// Changes accepted by `filter`, in order; a lagging receiver gets one
/// `resync` event and then continues with the newest changes
pub fn change_stream(
    receiver: broadcast::Receiver<TableChange>,
    filter: ChangeFilter,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((receiver, filter), |(mut receiver, filter)| async move {
        loop {
            match receiver.recv().await {
                Ok(change) if filter.matches(&change) => {
                    let event = change_event(&change);
                    return Some((Ok(event), (receiver, filter)));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Realtime subscriber lagged");
                    let event = Event::default().event("resync").data(skipped.to_string());
                    return Some((Ok(event), (receiver, filter)));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// GET /realtime?tables=courses,videos
///
/// Students never receive changes to finance, passcode, profile or mailbox
/// tables; teachers never receive mailbox changes.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RealtimeQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = ChangeFilter::parse(query.tables.as_deref()).for_role(user.role);
    tracing::debug!(user_id = %user.user_id, tables = ?query.tables, "Realtime subscriber connected");

    let stream = change_stream(state.changes.subscribe(), filter);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
