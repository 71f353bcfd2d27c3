//! Server-Sent Events feed of pool changes.
//!
//! Each stream opens with a `snapshot` event followed by one `update` per
//! change. Events are unnamed so browser `EventSource.onmessage` sees them.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::Stream;
use motorpool_core::{LeaseRegistry, PoolEvent, ShutdownController};
use tracing::{debug, warn};

use crate::server::config::EventsConfig;

fn to_sse(event: &PoolEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(error = %e, kind = event.kind(), "Failed to encode event");
            Event::default().comment("encode error")
        }
    }
}

async fn event_stream(
    Extension(registry): Extension<Arc<LeaseRegistry>>,
    Extension(shutdown): Extension<Arc<ShutdownController>>,
    Extension(events): Extension<EventsConfig>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = registry.subscribe().await;
    let guard = shutdown.register_stream();
    let token = guard.token();
    debug!(subscription = %subscription.id(), "SSE stream opened");

    let stream = futures::stream::unfold(
        (subscription, guard, token),
        |(mut subscription, guard, token)| async move {
            let event = tokio::select! {
                _ = token.cancelled() => None,
                event = subscription.recv() => event,
            };
            match event {
                Some(event) => Some((Ok(to_sse(&event)), (subscription, guard, token))),
                None => {
                    debug!(subscription = %subscription.id(), "SSE stream closed");
                    None
                }
            }
        },
    );

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(events.keepalive_secs))
            .text("keepalive"),
    )
}

/// Create the SSE route
pub fn events_routes() -> Router {
    Router::new().route("/events", get(event_stream))
}

