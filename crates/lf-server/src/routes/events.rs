//! Lifecycle event handlers.
//!
//! `GET /api/events` returns the recent ring buffer as JSON. The `/stream`
//! variant is a Server-Sent Events feed that replays recent events for late
//! joiners, then follows the [`lf_core::events::EventBus`] live until the
//! server shuts down.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;

use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only events for this job.
    pub job_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

fn matches_job(event: &lf_core::Event, filter: &Option<String>) -> bool {
    match filter {
        Some(id) => event.payload.job_id().as_str() == id,
        None => true,
    }
}

/// GET /api/events -- recent events, newest first.
pub async fn recent_events(
    State(ctx): State<AppContext>,
    Query(params): Query<EventsQuery>,
) -> Json<Vec<lf_core::Event>> {
    let events = ctx
        .event_bus
        .recent_events(usize::MAX)
        .into_iter()
        .filter(|e| matches_job(e, &params.job_id))
        .take(params.limit)
        .collect();
    Json(events)
}

/// GET /api/events/stream -- SSE stream of lifecycle events.
pub async fn events_stream(
    State(ctx): State<AppContext>,
    Query(params): Query<EventsQuery>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let job_filter = params.job_id;

    let recent = ctx.event_bus.recent_events(params.limit);
    let mut rx = ctx.event_bus.subscribe();
    let shutdown = ctx.shutdown.clone();

    let stream = async_stream::stream! {
        for event in recent.into_iter().rev() {
            if matches_job(&event, &job_filter) {
                if let Ok(data) = serde_json::to_string(&event) {
                    yield Ok(Event::default().data(data));
                }
            }
        }

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(event) => {
                    if matches_job(&event, &job_filter) {
                        if let Ok(data) = serde_json::to_string(&event) {
                            yield Ok(Event::default().data(data));
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("SSE client lagged by {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
