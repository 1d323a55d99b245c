//! Legacy HTTP+SSE transport.
//!
//! `GET /sse` opens an event stream whose first `endpoint` event names the
//! URL to post messages to. Replies to those messages arrive on the stream as
//! `message` events.

use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{RpcResponse, process_message};
use crate::infra::http::HttpState;

pub const STREAM_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";

const SESSION_BUFFER: usize = 16;

/// Open SSE sessions, keyed by the id handed out in the `endpoint` event.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, mpsc::Sender<RpcResponse>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self) -> (SessionGuard, mpsc::Receiver<RpcResponse>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(SESSION_BUFFER);
        self.sessions.insert(id, sender);
        let guard = SessionGuard {
            id,
            registry: self.clone(),
        };
        (guard, receiver)
    }

    fn sender(&self, id: &Uuid) -> Option<mpsc::Sender<RpcResponse>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }
}

/// Unregisters its session when the event stream is dropped.
struct SessionGuard {
    id: Uuid,
    registry: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.sessions.remove(&self.id);
        debug!(target = "pagedrop::mcp", session_id = %self.id, "sse session closed");
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionQuery {
    session_id: Uuid,
}

pub(super) async fn open_stream(State(state): State<HttpState>) -> Response {
    let (guard, mut receiver) = state.mcp_sessions.open();
    let endpoint = format!("{MESSAGES_PATH}?session_id={}", guard.id);
    debug!(target = "pagedrop::mcp", session_id = %guard.id, "sse session opened");

    let events = stream! {
        let _guard = guard;
        yield Ok::<Event, Infallible>(Event::default().event("endpoint").data(endpoint));

        while let Some(message) = receiver.recv().await {
            match serde_json::to_string(&message) {
                Ok(data) => {
                    yield Ok(Event::default().event("message").data(data));
                }
                Err(err) => warn!(
                    target = "pagedrop::mcp",
                    error = %err,
                    "failed to encode sse message"
                ),
            }
        }
    };

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub(super) async fn post_message(
    State(state): State<HttpState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let Some(sender) = state.mcp_sessions.sender(&query.session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(response) = process_message(&state, &body).await {
        if sender.send(response).await.is_err() {
            return StatusCode::GONE.into_response();
        }
    }

    StatusCode::ACCEPTED.into_response()
}
