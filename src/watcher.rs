//! Watch loop (§4.7): a single task that keeps one heartbeat in flight at a time, POSTing the
//! "minute-watched" spade payload every `WATCH_INTERVAL` and correlating the response against
//! the progress engine's one-shot update slot, falling back to a GraphQL `CurrentDrop` read or
//! a local estimator bump when no authoritative event arrives in time.
//!
//! `generate_payload`/`send_pulse`/`fetch_spade_url` implement the minute-watched payload and
//! spade URL scrape chain; the loop shape itself (steps 1-5) mirrors a `_watch` coroutine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use tokio::sync::{Mutex, Notify};

use crate::auth::AuthState;
use crate::constants::{CLIENT_ANDROID_APP, CLIENT_WEB, WATCH_INTERVAL};
use crate::gql::GqlClient;
use crate::models::{Channel, DropsCampaign, TimedDrop};
use crate::progress::ProgressEngine;

static SPADE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""beacon_?url": ?"(https://video-edge-[\.\w\-/]+\.ts(?:\?allow_stream=true)?)""#)
        .expect("Invalid spade pattern regex")
});

static SETTINGS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="(https://[\w\.]+/config/settings\.[0-9a-f]{32}\.js)""#)
        .expect("Invalid settings pattern regex")
});

/// What the watch loop is pulsing, and which drop (if any) it should try to correlate minutes
/// against. The caller (the app's watch-management layer, which owns the campaign/channel data)
/// decides `drop_id` each time it sets a target — the loop itself holds no campaign state.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub channel_id: String,
    pub channel_login: String,
    pub broadcast_id: String,
    pub spade_url: String,
    pub drop_id: Option<String>,
    /// Mirrors the channel's current online status, kept in sync by the caller as stream-state
    /// events arrive. Checked before every pulse; a clone shares the same underlying flag with
    /// whatever `WatchTarget` the app itself is holding, so flipping it there is visible here
    /// with no extra round-trip through `WatchHandle`.
    pub online: Arc<AtomicBool>,
}

/// Legacy UI-facing snapshot of what's currently being mined, kept for the dashboard's display
/// needs. Built by the caller from a `WatchEvent::MinuteAccounted` plus its own campaign lookup.
#[derive(Debug, Clone)]
pub struct MiningStatus {
    pub game_name: String,
    pub channel_login: String,
    pub drop_name: String,
    pub progress_percent: f64,
    pub minutes_watched: i32,
    pub minutes_required: i32,
}

#[derive(Debug, Clone, Serialize)]
struct SpadeEvent {
    event: &'static str,
    properties: SpadeProperties,
}

#[derive(Debug, Clone, Serialize)]
struct SpadeProperties {
    broadcast_id: String,
    channel_id: String,
    channel: String,
    hidden: bool,
    live: bool,
    location: &'static str,
    logged_in: bool,
    muted: bool,
    player: &'static str,
    user_id: u64,
}

/// Events the watch loop reports back to its caller. Carries just enough for the caller to
/// update its own campaign data and the UI — the loop itself never mutates campaign state.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// An authoritative minute count arrived (from the websocket correlation or the GraphQL
    /// fallback) for `drop_id`.
    MinuteAccounted {
        channel_login: String,
        drop_id: String,
        minutes: i32,
        via: MinuteSource,
    },
    /// Nothing authoritative arrived in time; the caller should bump its own local estimator.
    LocalEstimateBump {
        channel_login: String,
        drop_id: String,
    },
    /// A pulse went out but there was no drop to correlate against.
    PulseSent { channel_login: String },
    /// The spade pulse itself failed (non-204 or transport error).
    PulseFailed { channel_login: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinuteSource {
    Websocket,
    GraphQlFallback,
    LocalEstimate,
}

/// Sends watch pulses and scrapes the spade beacon URL. Cheap to clone (just a `reqwest::Client`
/// handle and some static config).
#[derive(Clone)]
pub struct Watcher {
    client: reqwest::Client,
    auth: AuthState,
    proxy_url: Option<String>,
}

impl Watcher {
    pub fn new(auth: AuthState) -> Self {
        Self::new_with_proxy(auth, None)
    }

    pub fn new_with_proxy(auth: AuthState, proxy_url: Option<String>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(ref url) = proxy_url {
            if let Ok(proxy) = reqwest::Proxy::all(url) {
                builder = builder.proxy(proxy);
                tracing::info!("Watcher using proxy");
            }
        }
        Self {
            client: builder.build().expect("Failed to build HTTP client"),
            auth,
            proxy_url,
        }
    }

    /// §4.7 step 2's payload: `[{"event":"minute-watched","properties":{...}}]`, base64-encoded.
    pub fn generate_payload(&self, target: &WatchTarget) -> String {
        let events = vec![SpadeEvent {
            event: "minute-watched",
            properties: SpadeProperties {
                broadcast_id: target.broadcast_id.clone(),
                channel_id: target.channel_id.clone(),
                channel: target.channel_login.clone(),
                hidden: false,
                live: true,
                location: "channel",
                logged_in: true,
                muted: false,
                player: "site",
                user_id: self.auth.user_id,
            },
        }];
        let json = serde_json::to_string(&events).unwrap();
        BASE64.encode(json.as_bytes())
    }

    /// POST the payload to the channel's spade URL. `Ok(true)` iff the server answered 204.
    pub async fn send_pulse(&self, target: &WatchTarget) -> Result<bool> {
        let payload = self.generate_payload(target);
        let body = format!("data={}", payload);

        let response = self
            .client
            .post(&target.spade_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", CLIENT_ANDROID_APP.user_agent)
            .header("Client-Id", CLIENT_ANDROID_APP.client_id)
            .header("X-Device-Id", &self.auth.device_id)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if self.proxy_url.is_some() && (e.is_connect() || e.is_timeout()) {
                    return anyhow!(
                        "Proxy connection failed during pulse. Check settings. Details: {}",
                        e
                    );
                }
                anyhow!("Failed to send watch pulse: {}", e)
            })?;

        Ok(response.status().as_u16() == 204)
    }

    /// Scrape the spade beacon URL from the channel's page (or, failing that, its settings
    /// bundle), per §6's external scrape chain.
    pub async fn fetch_spade_url(&self, channel_login: &str) -> Result<String> {
        let url = format!("https://www.twitch.tv/{}", channel_login);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", CLIENT_WEB.user_agent)
            .send()
            .await
            .map_err(|e| {
                if self.proxy_url.is_some() && (e.is_connect() || e.is_timeout()) {
                    return anyhow!("Proxy connection failed fetching channel page. Check settings. Details: {}", e);
                }
                anyhow!("Failed to fetch channel page: {}", e)
            })?;

        let html = response
            .text()
            .await
            .context("Failed to read channel HTML")?;

        if let Some(captures) = SPADE_PATTERN.captures(&html) {
            return Ok(captures.get(1).unwrap().as_str().to_string());
        }

        if let Some(captures) = SETTINGS_PATTERN.captures(&html) {
            let settings_url = captures.get(1).unwrap().as_str();

            let settings_response = self
                .client
                .get(settings_url)
                .header("User-Agent", CLIENT_WEB.user_agent)
                .send()
                .await
                .context("Failed to fetch settings.js")?;

            let settings_js = settings_response
                .text()
                .await
                .context("Failed to read settings.js")?;

            if let Some(captures) = SPADE_PATTERN.captures(&settings_js) {
                return Ok(captures.get(1).unwrap().as_str().to_string());
            }
        }

        Err(anyhow!("Could not extract spade URL from channel page"))
    }
}

/// Shared, mutable "what are we watching" cell the state machine pushes updates into and the
/// watch loop reads from. `None` parks the loop.
#[derive(Clone)]
pub struct WatchHandle {
    target: Arc<Mutex<Option<WatchTarget>>>,
    restart: Arc<Notify>,
}

impl WatchHandle {
    pub fn new() -> Self {
        Self {
            target: Arc::new(Mutex::new(None)),
            restart: Arc::new(Notify::new()),
        }
    }

    /// Set (or clear, with `None`) the watch target and wake the loop immediately.
    pub async fn set_target(&self, target: Option<WatchTarget>) {
        *self.target.lock().await = target;
        self.restart.notify_one();
    }

    pub async fn current(&self) -> Option<WatchTarget> {
        self.target.lock().await.clone()
    }

    /// Best-effort synchronous clear/set, for callers that can't await (the state machine's
    /// `stop_watching`, exercised from plain unit tests with no tokio runtime). Returns `false`
    /// without applying the change if the lock is momentarily held elsewhere.
    pub fn try_set_target(&self, target: Option<WatchTarget>) -> bool {
        match self.target.try_lock() {
            Ok(mut guard) => {
                *guard = target;
                self.restart.notify_one();
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for WatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse Twitch's polymorphic `CurrentDrop` response shape (web vs. Android client) into
/// `(drop_id, current_minutes)`.
fn parse_current_drop(resp: &Value) -> Option<(String, i32)> {
    let drop_ctx = resp
        .get("currentUser")
        .and_then(|u| u.get("dropCurrentSession"))
        .or_else(|| resp.get("currentSession"))
        .or_else(|| resp.get("user").and_then(|u| u.get("dropCurrentSessionContext")))?;

    let drop_node = drop_ctx.get("drop").unwrap_or(drop_ctx);
    let self_node = drop_node.get("self").unwrap_or(drop_node);

    let drop_id = drop_node.get("id").and_then(|v| v.as_str())?.to_string();
    let minutes = self_node
        .get("currentMinutesWatched")
        .and_then(|v| v.as_i64())
        .unwrap_or(0) as i32;
    Some((drop_id, minutes))
}

/// The drop a channel's current stream can progress right now, if any: the first earnable drop
/// among campaigns for the channel's live game. Used by the controller to decide `drop_id` when
/// it hands the watch loop a new target.
pub(crate) fn active_drop_for_channel<'a>(
    campaigns: &'a [DropsCampaign],
    channel: &Channel,
) -> Option<(&'a DropsCampaign, &'a TimedDrop)> {
    let stream = channel.stream.as_deref()?;
    campaigns
        .iter()
        .filter(|c| c.game.id == stream.game.id)
        .find_map(|c| c.first_drop(Some(channel)).map(|d| (c, d)))
}

/// §4.7: the single watch-loop task. Runs forever; parks whenever `handle.current()` is `None`.
/// Holds no campaign or channel state of its own — the caller (app's watch-management layer)
/// decides what drop to track via `WatchTarget::drop_id` and applies the reported minutes to
/// its own data on [`WatchEvent`].
pub async fn watch_loop(
    gql: GqlClient,
    watcher: Watcher,
    progress: ProgressEngine,
    handle: WatchHandle,
    events: tokio::sync::mpsc::UnboundedSender<WatchEvent>,
) {
    loop {
        // Step 1: await a non-null target.
        let target = loop {
            if let Some(t) = handle.current().await {
                break t;
            }
            handle.restart.notified().await;
        };

        // Step 2: send the pulse, unless the channel isn't currently online — treated the same
        // as a failed beat for scheduling purposes (no minute credited, no pulse-failed log).
        let sent = if target.online.load(Ordering::Relaxed) {
            watcher.send_pulse(&target).await
        } else {
            Ok(false)
        };
        let ok = match sent {
            Ok(ok) => ok,
            Err(e) => {
                let _ = events.send(WatchEvent::PulseFailed {
                    channel_login: target.channel_login.clone(),
                    detail: e.to_string(),
                });
                false
            }
        };

        if !ok {
            // Step 3: failure - sleep 60s without crediting any minute, then retry.
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(60)) => {}
                _ = handle.restart.notified() => {}
            }
            continue;
        }

        let last_watch = Instant::now();

        // Step 4: correlate the pulse with an authoritative minute update, if there's a drop to
        // track on this channel at all.
        let event = match &target.drop_id {
            None => WatchEvent::PulseSent {
                channel_login: target.channel_login.clone(),
            },
            Some(drop_id) => {
                let handled = progress.await_update(drop_id, Duration::from_secs(10)).await;
                if handled {
                    // `handle_drop_progress` already applied the real minute count; the caller
                    // re-reads its own campaign data, so we just need to name which drop moved.
                    // The exact minute value isn't known here, so report what the progress
                    // engine was told by pulling it back out isn't possible through this
                    // interface; instead rely on the caller's own drop lookup after the event.
                    WatchEvent::MinuteAccounted {
                        channel_login: target.channel_login.clone(),
                        drop_id: drop_id.clone(),
                        minutes: -1,
                        via: MinuteSource::Websocket,
                    }
                } else {
                    match gql.get_current_drop(&target.channel_id, "").await {
                        Ok(resp) => match parse_current_drop(&resp) {
                            Some((reported_id, minutes)) if &reported_id == drop_id => {
                                WatchEvent::MinuteAccounted {
                                    channel_login: target.channel_login.clone(),
                                    drop_id: reported_id,
                                    minutes,
                                    via: MinuteSource::GraphQlFallback,
                                }
                            }
                            _ => WatchEvent::LocalEstimateBump {
                                channel_login: target.channel_login.clone(),
                                drop_id: drop_id.clone(),
                            },
                        },
                        Err(e) => {
                            tracing::warn!("CurrentDrop fallback failed: {e}");
                            WatchEvent::LocalEstimateBump {
                                channel_login: target.channel_login.clone(),
                                drop_id: drop_id.clone(),
                            }
                        }
                    }
                }
            }
        };
        let _ = events.send(event);

        // Step 5: sleep until last_watch + WATCH_INTERVAL, interruptible by a restart signal.
        let elapsed = last_watch.elapsed();
        if elapsed < WATCH_INTERVAL {
            tokio::select! {
                _ = tokio::time::sleep(WATCH_INTERVAL - elapsed) => {}
                _ = handle.restart.notified() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, DropSelfInfo, DropsCampaign, Game, Stream};
    use chrono::Utc;

    fn auth() -> AuthState {
        AuthState {
            access_token: "tok".to_string(),
            user_id: 42,
            device_id: "dev".to_string(),
            login: "user".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "v".to_string(),
        }
    }

    #[test]
    fn generate_payload_is_valid_base64_json() {
        let watcher = Watcher::new(auth());
        let target = WatchTarget {
            channel_id: "123".to_string(),
            channel_login: "someone".to_string(),
            broadcast_id: "456".to_string(),
            spade_url: "https://example.com/spade".to_string(),
            drop_id: None,
            online: Arc::new(AtomicBool::new(true)),
        };
        let payload = watcher.generate_payload(&target);
        let decoded = BASE64.decode(payload).unwrap();
        let json: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json[0]["event"], "minute-watched");
        assert_eq!(json[0]["properties"]["channel_id"], "123");
        assert_eq!(json[0]["properties"]["user_id"], 42);
    }

    #[test]
    fn parse_current_drop_reads_web_shape() {
        let resp = serde_json::json!({
            "currentSession": {
                "drop": {
                    "id": "drop-1",
                    "self": { "currentMinutesWatched": 12 }
                }
            }
        });
        assert_eq!(parse_current_drop(&resp), Some(("drop-1".to_string(), 12)));
    }

    #[test]
    fn parse_current_drop_returns_none_without_context() {
        assert_eq!(parse_current_drop(&serde_json::json!({})), None);
    }

    fn drop(id: &str) -> crate::models::TimedDrop {
        crate::models::TimedDrop {
            id: id.to_string(),
            name: "Drop".to_string(),
            required_minutes: 60,
            starts_at: Utc::now() - chrono::Duration::days(1),
            ends_at: Utc::now() + chrono::Duration::days(1),
            benefit_edges: vec![],
            self_info: Some(DropSelfInfo {
                current_minutes_watched: 0,
                is_claimed: false,
                drop_instance_id: None,
            }),
            precondition_drop_ids: vec![],
            extra_minutes: 0,
            extra_seconds: 0,
            claim_id: None,
        }
    }

    fn campaign(game: Game, drops: Vec<crate::models::TimedDrop>) -> DropsCampaign {
        DropsCampaign {
            id: "c1".to_string(),
            name: "Campaign".to_string(),
            game,
            starts_at: Utc::now() - chrono::Duration::days(1),
            ends_at: Utc::now() + chrono::Duration::days(1),
            status: "ACTIVE".to_string(),
            time_based_drops: drops,
            self_info: None,
            allowed_channels: None,
        }
    }

    #[test]
    fn active_drop_for_channel_finds_matching_campaign() {
        let game = Game {
            id: "g1".to_string(),
            display_name: "Game".to_string(),
            box_art_url: None,
            slug: None,
        };
        let channel = Channel {
            id: "c".to_string(),
            login: "c".to_string(),
            display_name: None,
            profile_image_url: None,
            stream: Some(Box::new(Stream {
                broadcast_id: "b".to_string(),
                game: game.clone(),
                viewers: 1,
                title: None,
                drops_enabled: true,
                started_observing_at: Utc::now(),
            })),
            acl_based: false,
            spade_url: None,
        };
        let campaigns = vec![campaign(game, vec![drop("d1")])];
        let found = active_drop_for_channel(&campaigns, &channel);
        assert_eq!(found.map(|(_, d)| d.id.clone()), Some("d1".to_string()));
    }

    #[test]
    fn active_drop_for_channel_none_when_offline() {
        let game = Game {
            id: "g1".to_string(),
            display_name: "Game".to_string(),
            box_art_url: None,
            slug: None,
        };
        let channel = Channel {
            id: "c".to_string(),
            login: "c".to_string(),
            display_name: None,
            profile_image_url: None,
            stream: None,
            acl_based: false,
            spade_url: None,
        };
        let campaigns = vec![campaign(game, vec![drop("d1")])];
        assert!(active_drop_for_channel(&campaigns, &channel).is_none());
    }
}
