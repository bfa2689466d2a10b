use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use mesh_feed::FeedError;
use mesh_types::events::{ClientCommand, ServerEvent, decode_command};

use crate::hub::Hub;
use crate::registry::SessionId;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one WebSocket connection from welcome to close.
///
/// The connection holds no feed state. Outbound frames (welcome, broadcasts,
/// replies) all flow through the session's registry channel; inbound text is
/// handed to [`handle_frame`].
pub async fn handle_connection(socket: WebSocket, hub: Hub) {
    let (mut sender, mut receiver) = socket.split();

    let (session_id, mut outbound) = hub.open_session().await;
    info!("Session {} connected", session_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let hub_recv = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_frame(&hub_recv, session_id, text.as_str()).await,
                Message::Binary(bytes) => handle_binary(&hub_recv, session_id, &bytes).await,
                Message::Pong(_) => pong_flag_recv.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.close_session(session_id).await;
    info!("Session {} disconnected", session_id);
}

/// Decode one inbound text frame and act on it. Any failure becomes an
/// `error` event for this session only; the connection stays open.
pub async fn handle_frame(hub: &Hub, session_id: SessionId, text: &str) {
    let result = match decode_command(text) {
        Ok(cmd) => handle_command(hub, session_id, cmd).await,
        Err(e) => Err(FeedError::from(e)),
    };

    if let Err(err) = result {
        warn!(
            "Session {} request failed: {:?} -- raw: {}",
            session_id,
            err,
            truncate_for_log(text)
        );
        reply_error(hub, session_id, &err).await;
    }
}

/// Binary frames carry the same JSON as text frames.
pub async fn handle_binary(hub: &Hub, session_id: SessionId, bytes: &[u8]) {
    match std::str::from_utf8(bytes) {
        Ok(text) => handle_frame(hub, session_id, text).await,
        Err(e) => {
            let err = FeedError::MalformedMessage(format!("invalid message: {}", e));
            warn!("Session {} sent {} bytes of non-UTF-8 data", session_id, bytes.len());
            reply_error(hub, session_id, &err).await;
        }
    }
}

async fn reply_error(hub: &Hub, session_id: SessionId, err: &FeedError) {
    hub.dispatcher()
        .send_to(session_id, &ServerEvent::error(err.to_string()))
        .await;
}

async fn handle_command(hub: &Hub, session_id: SessionId, cmd: ClientCommand) -> Result<(), FeedError> {
    match cmd {
        ClientCommand::NewPost {
            user,
            content,
            post_type,
        } => {
            hub.create_post(&user, &content, post_type).await?;
        }

        ClientCommand::NewComment {
            post_id,
            user,
            text,
        } => {
            hub.add_comment(&post_id, &user, &text).await?;
        }

        ClientCommand::Heartbeat => {
            debug!("Session {} heartbeat", session_id);
            hub.dispatcher()
                .send_to(session_id, &ServerEvent::HeartbeatAck)
                .await;
        }

        ClientCommand::MusicPlayStart { song_id, .. } => {
            debug!("Session {} started playing {}", session_id, song_id);
        }

        ClientCommand::MusicPlayComplete {
            song_id,
            user_id,
            duration,
        } => {
            hub.record_play(&song_id, user_id.as_deref(), duration).await?;
        }
    }
    Ok(())
}

fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
