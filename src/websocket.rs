//! Websocket pool (§4.4): up to `MAX_WEBSOCKETS` PubSub connections, each carrying at most
//! `WS_TOPICS_LIMIT` topic subscriptions, with ping/pong liveness and exponential-backoff
//! reconnects.
//!
//! Frame shapes, topic-prefix event parsing, and the ping/reconnect idea build on a prior
//! single-connection `WebSocketManager`; the pool algorithm itself (least-loaded topic
//! placement, `desired`/`submitted` diffing, per-connection state machine) generalizes that
//! into a bounded pool of connections.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::constants::{MAX_WEBSOCKETS, PING_INTERVAL, PING_TIMEOUT, WS_TOPICS_LIMIT};
use crate::error::MinerError;
use crate::transport::ExponentialBackoff;

const PUBSUB_URL: &str = "wss://pubsub-edge.twitch.tv/v1";
/// Frames are gathered for this long per receive cycle before controls (ping/command checks)
/// get another turn, per §4.4 step 3.
const GATHER_WINDOW: Duration = Duration::from_millis(500);

// =============================================================================
// Wire frames
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum OutgoingMessage {
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "LISTEN")]
    Listen { nonce: String, data: ListenData },
    #[serde(rename = "UNLISTEN")]
    Unlisten { nonce: String, data: UnlistenData },
}

#[derive(Debug, Clone, Serialize)]
struct ListenData {
    topics: Vec<String>,
    auth_token: String,
}

#[derive(Debug, Clone, Serialize)]
struct UnlistenData {
    topics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct IncomingMessage {
    #[serde(rename = "type")]
    msg_type: String,
    data: Option<MessageData>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageData {
    topic: String,
    message: String,
}

fn nonce() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..30)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

// =============================================================================
// Parsed events
// =============================================================================

/// A decoded PubSub event, topic-routed and ready for the progress engine / channel set.
#[derive(Debug, Clone)]
pub enum PubSubEvent {
    DropProgress {
        drop_id: String,
        current_minutes: i32,
    },
    DropClaim {
        drop_id: String,
        drop_instance_id: String,
    },
    StreamUp {
        channel_id: String,
    },
    StreamDown {
        channel_id: String,
    },
    ViewCount {
        channel_id: String,
        viewers: i32,
    },
    /// `community-points-user-v1`'s `points-earned`: a passive balance update, display-only.
    PointsEarned {
        channel_id: String,
        balance: i64,
    },
    /// `community-points-user-v1`'s `claim-available`: a bonus claim is ready to be redeemed.
    ClaimAvailable {
        channel_id: String,
        claim_id: String,
    },
    Unknown(Value),
}

fn parse_event(topic: &str, message: &str) -> Result<PubSubEvent> {
    let value: Value = serde_json::from_str(message).context("invalid pubsub message payload")?;

    if topic.starts_with("user-drop-events") {
        return Ok(parse_drop_event(&value));
    }
    if topic.starts_with("video-playback-by-id") {
        return Ok(parse_stream_event(topic, &value));
    }
    if topic.starts_with("community-points-user-v1") {
        return Ok(parse_points_event(&value));
    }
    Ok(PubSubEvent::Unknown(value))
}

fn parse_drop_event(value: &Value) -> PubSubEvent {
    match value["type"].as_str().unwrap_or("") {
        "drop-progress" => PubSubEvent::DropProgress {
            drop_id: value["data"]["drop_id"].as_str().unwrap_or("").to_string(),
            current_minutes: value["data"]["current_progress_min"].as_i64().unwrap_or(0) as i32,
        },
        "drop-claim" => PubSubEvent::DropClaim {
            drop_id: value["data"]["drop_id"].as_str().unwrap_or("").to_string(),
            drop_instance_id: value["data"]["drop_instance_id"]
                .as_str()
                .unwrap_or("")
                .to_string(),
        },
        _ => PubSubEvent::Unknown(value.clone()),
    }
}

fn parse_stream_event(topic: &str, value: &Value) -> PubSubEvent {
    let channel_id: String = topic
        .split('.')
        .next_back()
        .unwrap_or_default()
        .to_string();

    match value["type"].as_str().unwrap_or("") {
        "stream-up" => PubSubEvent::StreamUp { channel_id },
        "stream-down" => PubSubEvent::StreamDown { channel_id },
        "viewcount" => PubSubEvent::ViewCount {
            channel_id,
            viewers: value["viewers"].as_i64().unwrap_or(0) as i32,
        },
        _ => PubSubEvent::Unknown(value.clone()),
    }
}

fn parse_points_event(value: &Value) -> PubSubEvent {
    match value["type"].as_str().unwrap_or("") {
        "points-earned" => PubSubEvent::PointsEarned {
            channel_id: value["data"]["channel_id"].as_str().unwrap_or("").to_string(),
            balance: value["data"]["balance"]["balance"].as_i64().unwrap_or(0),
        },
        "claim-available" => PubSubEvent::ClaimAvailable {
            channel_id: value["data"]["claim"]["channel_id"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            claim_id: value["data"]["claim"]["id"].as_str().unwrap_or("").to_string(),
        },
        _ => PubSubEvent::Unknown(value.clone()),
    }
}

// =============================================================================
// Per-connection task
// =============================================================================

enum ConnCommand {
    AddTopics(Vec<String>),
    RemoveTopics(Vec<String>),
    Shutdown,
}

/// Pool-side handle to a single connection's background task.
struct ConnectionHandle {
    /// Topics this connection is responsible for, as tracked by the pool (the connection task
    /// keeps its own copy derived from the same add/remove commands; this one drives
    /// least-loaded placement without needing a round trip).
    desired: HashSet<String>,
    cmd_tx: mpsc::Sender<ConnCommand>,
}

async fn run_connection(
    auth_token: Arc<Mutex<String>>,
    event_tx: mpsc::Sender<PubSubEvent>,
    mut cmd_rx: mpsc::Receiver<ConnCommand>,
) {
    let mut desired: HashSet<String> = HashSet::new();
    let mut backoff = ExponentialBackoff::new();

    'reconnect: loop {
        let mut submitted: HashSet<String> = HashSet::new();

        let stream = match connect_async(PUBSUB_URL).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::warn!("websocket pool: connect failed ({e}), backing off");
                tokio::time::sleep(backoff.next()).await;
                continue 'reconnect;
            }
        };
        tracing::info!("websocket pool: connection established");
        let (mut write, mut read) = stream.split();
        backoff = ExponentialBackoff::new();

        if !desired.is_empty() {
            if let Err(e) = send_listen(&mut write, &auth_token, desired.iter().cloned().collect()).await {
                tracing::warn!("websocket pool: initial LISTEN failed: {e}");
                tokio::time::sleep(backoff.next()).await;
                continue 'reconnect;
            }
            submitted = desired.clone();
        }

        let mut ping_deadline: Option<Instant> = None;
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await; // first tick fires immediately; consume it

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnCommand::AddTopics(topics)) => {
                            desired.extend(topics);
                        }
                        Some(ConnCommand::RemoveTopics(topics)) => {
                            for t in &topics {
                                desired.remove(t);
                            }
                        }
                        Some(ConnCommand::Shutdown) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                    }
                    if let Err(e) = sync_topics(&mut write, &auth_token, &desired, &mut submitted).await {
                        tracing::warn!("websocket pool: topic sync failed: {e}");
                        continue 'reconnect;
                    }
                }

                _ = ping_interval.tick() => {
                    if let Err(e) = write.send(Message::Text(serde_json::to_string(&OutgoingMessage::Ping).unwrap())).await {
                        tracing::warn!("websocket pool: ping send failed: {e}");
                        continue 'reconnect;
                    }
                    ping_deadline = Some(Instant::now() + PING_TIMEOUT);
                }

                _ = wait_for_deadline(ping_deadline) => {
                    tracing::warn!("websocket pool: PONG deadline elapsed, reconnecting");
                    continue 'reconnect;
                }

                gathered = gather_frames(&mut read) => {
                    match gathered {
                        GatherOutcome::Frames(frames) => {
                            for text in frames {
                                match serde_json::from_str::<IncomingMessage>(&text) {
                                    Ok(msg) => {
                                        if dispatch(msg, &event_tx).await {
                                            ping_deadline = None;
                                        }
                                    }
                                    Err(e) => tracing::debug!("websocket pool: bad frame: {e}"),
                                }
                            }
                        }
                        GatherOutcome::Reconnect => {
                            tracing::warn!("websocket pool: connection closed, reconnecting");
                            continue 'reconnect;
                        }
                        GatherOutcome::Idle => {}
                    }
                }
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d.into()).await,
        None => std::future::pending().await,
    }
}

enum GatherOutcome {
    Frames(Vec<String>),
    Reconnect,
    Idle,
}

/// Collect text frames for up to `GATHER_WINDOW`. A close/error frame short-circuits with
/// `Reconnect`.
async fn gather_frames(
    read: &mut futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
) -> GatherOutcome {
    let mut frames = Vec::new();
    let deadline = Instant::now() + GATHER_WINDOW;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => frames.push(text),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return GatherOutcome::Reconnect,
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) => return GatherOutcome::Reconnect,
            Err(_) => break,
        }
    }
    if frames.is_empty() {
        GatherOutcome::Idle
    } else {
        GatherOutcome::Frames(frames)
    }
}

/// Dispatch a decoded frame. Returns `true` if it was a `PONG` (so the caller can clear the
/// ping deadline).
async fn dispatch(msg: IncomingMessage, event_tx: &mpsc::Sender<PubSubEvent>) -> bool {
    match msg.msg_type.as_str() {
        "PONG" => true,
        "RECONNECT" => false,
        "RESPONSE" => {
            if let Some(error) = msg.error {
                if !error.is_empty() {
                    tracing::warn!("websocket pool: RESPONSE error: {error}");
                }
            }
            false
        }
        "MESSAGE" => {
            if let Some(data) = msg.data {
                match parse_event(&data.topic, &data.message) {
                    Ok(event) => {
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(event).await;
                        });
                    }
                    Err(e) => tracing::debug!("websocket pool: failed to parse event: {e}"),
                }
            }
            false
        }
        other => {
            tracing::debug!("websocket pool: unhandled frame type {other}");
            false
        }
    }
}

type WsWriter = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

async fn send_listen(write: &mut WsWriter, auth_token: &Arc<Mutex<String>>, topics: Vec<String>) -> Result<()> {
    let auth_token = auth_token.lock().await.clone();
    let msg = OutgoingMessage::Listen {
        nonce: nonce(),
        data: ListenData {
            topics,
            auth_token,
        },
    };
    write
        .send(Message::Text(serde_json::to_string(&msg)?))
        .await
        .context("failed to send LISTEN")
}

async fn send_unlisten(write: &mut WsWriter, topics: Vec<String>) -> Result<()> {
    let msg = OutgoingMessage::Unlisten {
        nonce: nonce(),
        data: UnlistenData { topics },
    };
    write
        .send(Message::Text(serde_json::to_string(&msg)?))
        .await
        .context("failed to send UNLISTEN")
}

/// §4.4 step 2: diff `desired` against `submitted`, send `UNLISTEN`/`LISTEN` for the deltas,
/// and update `submitted` to match.
async fn sync_topics(
    write: &mut WsWriter,
    auth_token: &Arc<Mutex<String>>,
    desired: &HashSet<String>,
    submitted: &mut HashSet<String>,
) -> Result<()> {
    let added: Vec<String> = desired.difference(submitted).cloned().collect();
    let removed: Vec<String> = submitted.difference(desired).cloned().collect();

    if !removed.is_empty() {
        send_unlisten(write, removed.clone()).await?;
    }
    if !added.is_empty() {
        send_listen(write, auth_token, added.clone()).await?;
    }

    for t in removed {
        submitted.remove(&t);
    }
    for t in added {
        submitted.insert(t);
    }
    Ok(())
}

// =============================================================================
// Pool
// =============================================================================

/// The pool the state machine and channel set talk to. `add_topics`/`remove_topics` manage
/// subscriptions across however many connections are needed; the pool never exposes individual
/// connections to callers.
pub struct WebsocketPool {
    auth_token: Arc<Mutex<String>>,
    event_tx: mpsc::Sender<PubSubEvent>,
    connections: Mutex<Vec<ConnectionHandle>>,
}

impl WebsocketPool {
    pub fn new(access_token: String) -> (Self, mpsc::Receiver<PubSubEvent>) {
        let (tx, rx) = mpsc::channel(256);
        (
            Self {
                auth_token: Arc::new(Mutex::new(access_token)),
                event_tx: tx,
                connections: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    /// Update the token used for future `LISTEN` frames (e.g. after a re-login).
    pub async fn set_access_token(&self, token: String) {
        *self.auth_token.lock().await = token;
    }

    pub async fn total_topics(&self) -> usize {
        self.connections
            .lock()
            .await
            .iter()
            .map(|c| c.desired.len())
            .sum()
    }

    /// §4.4 `add_topics`: fill the least-loaded connection first, spawning new connections
    /// (up to `MAX_WEBSOCKETS`) as needed. Returns `TopicLimitExceeded` if the pool is already
    /// saturated.
    pub async fn add_topics(&self, topics: Vec<String>) -> Result<(), MinerError> {
        let mut connections = self.connections.lock().await;
        let mut remaining: Vec<String> = topics;

        loop {
            if remaining.is_empty() {
                return Ok(());
            }

            // Fill whichever existing connection has the most spare capacity.
            if let Some((idx, spare)) = connections
                .iter()
                .enumerate()
                .map(|(i, c)| (i, WS_TOPICS_LIMIT.saturating_sub(c.desired.len())))
                .filter(|(_, spare)| *spare > 0)
                .max_by_key(|(_, spare)| *spare)
            {
                let take = spare.min(remaining.len());
                let batch: Vec<String> = remaining.drain(..take).collect();
                connections[idx].desired.extend(batch.iter().cloned());
                let _ = connections[idx].cmd_tx.send(ConnCommand::AddTopics(batch)).await;
                continue;
            }

            if connections.len() >= MAX_WEBSOCKETS {
                return Err(MinerError::TopicLimitExceeded);
            }

            let (cmd_tx, cmd_rx) = mpsc::channel(32);
            let auth_token = self.auth_token.clone();
            let event_tx = self.event_tx.clone();
            tokio::spawn(async move {
                run_connection(auth_token, event_tx, cmd_rx).await;
            });
            connections.push(ConnectionHandle {
                desired: HashSet::new(),
                cmd_tx,
            });
        }
    }

    /// §4.4 `remove_topics`: drop from whichever connection holds each topic; if the remaining
    /// load fits in `len - 1` connections, close the last one and redistribute its topics.
    pub async fn remove_topics(&self, topics: &[String]) {
        let mut connections = self.connections.lock().await;
        let topic_set: HashSet<&String> = topics.iter().collect();

        for conn in connections.iter_mut() {
            let removed: Vec<String> = conn
                .desired
                .iter()
                .filter(|t| topic_set.contains(t))
                .cloned()
                .collect();
            if removed.is_empty() {
                continue;
            }
            for t in &removed {
                conn.desired.remove(t);
            }
            let _ = conn.cmd_tx.send(ConnCommand::RemoveTopics(removed)).await;
        }

        self.recycle_if_underloaded(&mut connections).await;
    }

    /// If total load now fits in `len - 1` full connections, close the last connection and
    /// re-home its topics into the rest via `add_topics`-style placement.
    async fn recycle_if_underloaded(&self, connections: &mut Vec<ConnectionHandle>) {
        while connections.len() >= 2 {
            let total: usize = connections.iter().map(|c| c.desired.len()).sum();
            let capacity_without_last = (connections.len() - 1) * WS_TOPICS_LIMIT;
            if total > capacity_without_last {
                return;
            }

            let last = connections.pop().expect("len >= 2 checked above");
            let _ = last.cmd_tx.send(ConnCommand::Shutdown).await;
            let orphaned: Vec<String> = last.desired.into_iter().collect();

            let mut remaining = orphaned;
            while !remaining.is_empty() {
                let Some((idx, spare)) = connections
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i, WS_TOPICS_LIMIT.saturating_sub(c.desired.len())))
                    .filter(|(_, spare)| *spare > 0)
                    .max_by_key(|(_, spare)| *spare)
                else {
                    break;
                };
                let take = spare.min(remaining.len());
                let batch: Vec<String> = remaining.drain(..take).collect();
                connections[idx].desired.extend(batch.iter().cloned());
                let _ = connections[idx].cmd_tx.send(ConnCommand::AddTopics(batch)).await;
            }
        }
    }

    /// Tear down every connection (used on shutdown / logout).
    pub async fn shutdown(&self) {
        let mut connections = self.connections.lock().await;
        for conn in connections.drain(..) {
            let _ = conn.cmd_tx.send(ConnCommand::Shutdown).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_ping_serialization() {
        let json = serde_json::to_string(&OutgoingMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"PING"}"#);
    }

    #[test]
    fn test_outgoing_listen_serialization() {
        let msg = OutgoingMessage::Listen {
            nonce: "abc".to_string(),
            data: ListenData {
                topics: vec!["user-drop-events.12345".to_string()],
                auth_token: "token123".to_string(),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["type"], "LISTEN");
        assert_eq!(parsed["nonce"], "abc");
        assert_eq!(parsed["data"]["topics"][0], "user-drop-events.12345");
        assert_eq!(parsed["data"]["auth_token"], "token123");
    }

    #[test]
    fn test_nonce_length_and_charset() {
        let n = nonce();
        assert_eq!(n.len(), 30);
        assert!(n.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_parse_drop_progress_event() {
        let value: Value = serde_json::from_str(
            r#"{"type":"drop-progress","data":{"drop_id":"drop123","current_progress_min":30}}"#,
        )
        .unwrap();
        match parse_drop_event(&value) {
            PubSubEvent::DropProgress { drop_id, current_minutes } => {
                assert_eq!(drop_id, "drop123");
                assert_eq!(current_minutes, 30);
            }
            _ => panic!("expected DropProgress"),
        }
    }

    #[test]
    fn test_parse_drop_claim_event() {
        let value: Value = serde_json::from_str(
            r#"{"type":"drop-claim","data":{"drop_id":"d1","drop_instance_id":"inst-1"}}"#,
        )
        .unwrap();
        match parse_drop_event(&value) {
            PubSubEvent::DropClaim { drop_id, drop_instance_id } => {
                assert_eq!(drop_id, "d1");
                assert_eq!(drop_instance_id, "inst-1");
            }
            _ => panic!("expected DropClaim"),
        }
    }

    #[test]
    fn test_parse_stream_events() {
        let up: Value = serde_json::from_str(r#"{"type":"stream-up"}"#).unwrap();
        match parse_stream_event("video-playback-by-id.98765", &up) {
            PubSubEvent::StreamUp { channel_id } => assert_eq!(channel_id, "98765"),
            _ => panic!("expected StreamUp"),
        }

        let down: Value = serde_json::from_str(r#"{"type":"stream-down"}"#).unwrap();
        match parse_stream_event("video-playback-by-id.1", &down) {
            PubSubEvent::StreamDown { channel_id } => assert_eq!(channel_id, "1"),
            _ => panic!("expected StreamDown"),
        }
    }

    #[test]
    fn test_parse_points_earned_event() {
        let value: Value = serde_json::from_str(
            r#"{"type":"points-earned","data":{"channel_id":"123","balance":{"balance":12345}}}"#,
        )
        .unwrap();
        match parse_points_event(&value) {
            PubSubEvent::PointsEarned { channel_id, balance } => {
                assert_eq!(channel_id, "123");
                assert_eq!(balance, 12345);
            }
            _ => panic!("expected PointsEarned"),
        }
    }

    #[test]
    fn test_parse_claim_available_event() {
        let value: Value = serde_json::from_str(
            r#"{"type":"claim-available","data":{"claim":{"id":"claim-1","channel_id":"123"}}}"#,
        )
        .unwrap();
        match parse_points_event(&value) {
            PubSubEvent::ClaimAvailable { channel_id, claim_id } => {
                assert_eq!(channel_id, "123");
                assert_eq!(claim_id, "claim-1");
            }
            _ => panic!("expected ClaimAvailable"),
        }
    }

    #[tokio::test]
    async fn add_topics_spawns_connections_as_needed() {
        let (pool, _rx) = WebsocketPool::new("token".to_string());
        let many: Vec<String> = (0..(WS_TOPICS_LIMIT + 5))
            .map(|i| format!("topic.{i}"))
            .collect();
        pool.add_topics(many).await.unwrap();
        assert_eq!(pool.connections.lock().await.len(), 2);
        assert_eq!(pool.total_topics().await, WS_TOPICS_LIMIT + 5);
    }

    #[tokio::test]
    async fn add_topics_past_pool_capacity_errors() {
        let (pool, _rx) = WebsocketPool::new("token".to_string());
        let huge: Vec<String> = (0..(WS_TOPICS_LIMIT * MAX_WEBSOCKETS + 1))
            .map(|i| format!("topic.{i}"))
            .collect();
        let err = pool.add_topics(huge).await.unwrap_err();
        assert!(matches!(err, MinerError::TopicLimitExceeded));
    }

    #[tokio::test]
    async fn remove_topics_recycles_underloaded_connection() {
        let (pool, _rx) = WebsocketPool::new("token".to_string());
        let first_batch: Vec<String> = (0..WS_TOPICS_LIMIT).map(|i| format!("a.{i}")).collect();
        let second_batch: Vec<String> = (0..5).map(|i| format!("b.{i}")).collect();
        pool.add_topics(first_batch.clone()).await.unwrap();
        pool.add_topics(second_batch.clone()).await.unwrap();
        assert_eq!(pool.connections.lock().await.len(), 2);

        // Free up enough room on the first connection that everything fits in one.
        let drop_some: Vec<String> = first_batch[..10].to_vec();
        pool.remove_topics(&drop_some).await;

        assert_eq!(pool.connections.lock().await.len(), 1);
        assert_eq!(pool.total_topics().await, WS_TOPICS_LIMIT - 10 + 5);
    }

    #[tokio::test]
    async fn remove_topics_folds_multiple_trailing_connections_in_one_call() {
        let (pool, _rx) = WebsocketPool::new("token".to_string());
        let batch_a: Vec<String> = (0..WS_TOPICS_LIMIT).map(|i| format!("a.{i}")).collect();
        let batch_b: Vec<String> = (0..WS_TOPICS_LIMIT).map(|i| format!("b.{i}")).collect();
        let batch_c: Vec<String> = (0..5).map(|i| format!("c.{i}")).collect();
        pool.add_topics(batch_a.clone()).await.unwrap();
        pool.add_topics(batch_b.clone()).await.unwrap();
        pool.add_topics(batch_c.clone()).await.unwrap();
        assert_eq!(pool.connections.lock().await.len(), 3);

        // Drop all of `a` and the first 5 of `b`, leaving exactly WS_TOPICS_LIMIT topics total
        // (the rest of `b` plus all of `c`) — small enough to fold both trailing connections
        // into the first in a single `remove_topics` call.
        let mut drop_these = batch_a.clone();
        drop_these.extend(batch_b[..5].iter().cloned());
        pool.remove_topics(&drop_these).await;

        assert_eq!(pool.connections.lock().await.len(), 1);
        assert_eq!(pool.total_topics().await, WS_TOPICS_LIMIT);
    }
}
