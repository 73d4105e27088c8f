//! Server-Sent Events stream of form progress for dashboard viewers

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::AppState;

/// GET /api/events
///
/// Streams `SessionStarted`, `StepChanged`, `SubmissionStored` and
/// `SubmissionFailed`. Lagged subscribers silently skip missed events.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(
        "New SSE subscriber ({} already connected)",
        state.events.subscriber_count()
    );
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        },
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
