//! Session Endpoint (spec.md §4.E): the per-connection read/write loops
//! upgraded from `GET /ws/login?client_id=<uid>`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::http::envelope::{AppJson, Envelope, HttpResult};
use crate::metrics;
use crate::registry::SessionHandle;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub client_id: String,
}

/// `POST /ws/logout` — explicit client-initiated teardown, removing the
/// registry entry without waiting on the socket's own read/write loops to
/// observe a close (spec.md §6).
pub async fn logout(State(state): State<AppState>, AppJson(req): AppJson<LogoutRequest>) -> HttpResult<()> {
    state.registry.remove(&req.client_id);
    metrics::CONNECTED_SESSIONS.set(state.registry.connected_count() as i64);
    Ok(Envelope::success(()))
}

type WriteHalf = Arc<Mutex<SplitSink<WebSocket, WsMessage>>>;

pub async fn login(
    ws: WebSocketUpgrade,
    Query(query): Query<LoginQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query.client_id, state))
}

/// Guards a single shutdown across both loops (spec.md §4.E "once-guard").
struct CloseGuard(AtomicBool);

impl CloseGuard {
    fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn should_run(&self) -> bool {
        self.0.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }
}

async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (write_half, read_half) = socket.split();
    let write_half: WriteHalf = Arc::new(Mutex::new(write_half));
    let capacity = state.config.server.channel_size;

    let (handle, outbound) = SessionHandle::new(user_id.clone(), capacity);
    state.registry.insert(handle.clone());
    metrics::CONNECTED_SESSIONS.inc();
    info!(user_id = %user_id, "session registered");

    if send_welcome(&write_half).await.is_err() {
        state.registry.remove_if_current(&user_id, &handle);
        metrics::CONNECTED_SESSIONS.dec();
        return;
    }

    let close_guard = Arc::new(CloseGuard::new());

    let write_task = tokio::spawn(run_write_loop(
        outbound,
        write_half.clone(),
        state.clone(),
        handle.clone(),
        close_guard.clone(),
    ));
    let read_task = tokio::spawn(run_read_loop(read_half, state.clone(), user_id.clone()));

    // Either loop exiting (write error, channel close, or a connection
    // error surfaced by the read loop) triggers the once-guarded close.
    tokio::select! {
        _ = write_task => {}
        _ = read_task => {}
    }
    close_once(&state, &handle, &close_guard).await;
}

async fn send_welcome(conn: &WriteHalf) -> Result<(), axum::Error> {
    let mut conn = conn.lock().await;
    conn.send(WsMessage::Text(r#"{"type":"welcome"}"#.into())).await
}

/// Removes the registry entry only if it still points at this exact
/// session, so a session displaced by a newer login for the same user-id
/// cannot eject that newer login on its own delayed close (spec.md §9).
async fn close_once(state: &AppState, handle: &Arc<SessionHandle>, guard: &CloseGuard) {
    if !guard.should_run() {
        return;
    }
    state.registry.remove_if_current(&handle.user_id, handle);
    metrics::CONNECTED_SESSIONS.dec();
    info!(user_id = %handle.user_id, "session closed");
}

/// Write loop: drains the outbound queue and writes the serialized egress
/// envelope, best-effort marking the originating Message row SENT on
/// success (spec.md §4.E).
async fn run_write_loop(
    mut outbound: tokio::sync::mpsc::Receiver<crate::wire::EgressEnvelope>,
    write_half: WriteHalf,
    state: AppState,
    handle: Arc<SessionHandle>,
    close_guard: Arc<CloseGuard>,
) {
    while let Some(envelope) = outbound.recv().await {
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize egress envelope");
                continue;
            }
        };

        let sent = {
            let mut conn = write_half.lock().await;
            conn.send(WsMessage::Text(payload.into())).await
        };
        if sent.is_err() {
            break;
        }

        if let Some(message_id) = &envelope.message_id {
            if let Err(e) = state.services.db.messages().mark_sent(message_id).await {
                warn!(error = %e, "best-effort SENT status update failed");
            }
        }
    }
    close_once(&state, &handle, &close_guard).await;
}

/// Read loop: parse inbound JSON frames and append them to the log broker
/// keyed by sender. Malformed JSON is logged and skipped — it never closes
/// the connection (spec.md §4.E).
async fn run_read_loop(mut read_half: SplitStream<WebSocket>, state: AppState, user_id: String) {
    while let Some(message) = read_half.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "read loop connection error");
                break;
            }
        };
        let WsMessage::Text(text) = message else { continue };

        if serde_json::from_str::<serde_json::Value>(&text).is_err() {
            warn!(user_id = %user_id, "dropping malformed ingress frame");
            metrics::FRAMES_DROPPED.inc();
            continue;
        }

        if let Err(e) = state.producer.append(&user_id, text.as_bytes()).await {
            warn!(error = %e, "failed to append frame to broker");
            continue;
        }
        metrics::FRAMES_INGESTED.inc();
    }
}
