use super::{App, AppState, CampaignOps};
use crate::models::{Channel, Game};
use crate::watcher::{active_drop_for_channel, MiningStatus, MinuteSource, WatchEvent, WatchTarget};
use crate::websocket::PubSubEvent;
use anyhow::{Context, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[allow(async_fn_in_trait)]
pub trait WatcherOps {
    /// §4.8 CHANNELS_FETCH: query the game directory for every active campaign's game (or just
    /// the priority games, if `priority_only` is set) and refresh `channel_set` from it. Drops
    /// any previously tracked channel that wasn't in this round's results, except the one
    /// currently being watched. Returns the number of candidates found.
    async fn refresh_channel_candidates(&mut self) -> Result<usize>;
    async fn start_watching(&mut self, channel: Channel, game_name: String) -> Result<()>;
    fn stop_watching(&mut self);
    /// §4.5/§4.8 CHANNEL_SWITCH: rank the tracked channel set and, if a better candidate than
    /// whatever's currently watched exists, switch to it. Returns `Some(channel_login)` if a
    /// switch happened.
    async fn select_channel(&mut self) -> Result<Option<String>>;
    fn is_watcher_active(&self) -> bool;
    async fn claim_unclaimed_drops(&mut self) -> Result<Vec<(String, String)>>;
    fn handle_watch_event(&mut self, event: WatchEvent) -> Vec<String>;
    async fn handle_pubsub_event(&mut self, event: PubSubEvent) -> Vec<String>;
    /// Follow-up from a spawned `confirm_claim_settled` poll (§4.6): resume watching the
    /// campaign's next drop, or trigger a fresh inventory fetch once it has none left.
    async fn handle_claim_settled(&mut self, has_remaining_drops: bool) -> Vec<String>;
    /// §4.5 pre-emption: a channel just went online. Re-fetch its stream info, and if it both
    /// `can_watch` and `should_switch` against whatever's currently watched, switch immediately
    /// rather than waiting for the next periodic `select_channel` sweep.
    async fn handle_stream_up(&mut self, channel_id: &str) -> Option<String>;
}

impl WatcherOps for App {
    async fn refresh_channel_candidates(&mut self) -> Result<usize> {
        let gql = self.gql.clone().context("Not logged in")?;

        let mut wanted: Vec<Game> = self
            .all_campaigns
            .iter()
            .chain(self.campaigns.iter())
            .filter(|c| self.config.wants_game(c))
            .map(|c| c.game.clone())
            .collect();
        wanted.sort_by(|a, b| a.id.cmp(&b.id));
        wanted.dedup_by(|a, b| a.id == b.id);

        let mut fetched: Vec<Channel> = Vec::new();
        for game in &wanted {
            // §4.8: ACL channels from every eligible campaign restricted to this game take the
            // place of a directory listing entirely — a game with an allow-list campaign is
            // never padded out with open directory streams.
            let acl_logins: std::collections::HashSet<String> = self
                .all_campaigns
                .iter()
                .chain(self.campaigns.iter())
                .filter(|c| c.is_active() && c.game.id == game.id)
                .filter(|c| c.eligible(self.config.enable_badges_emotes))
                .flat_map(|c| c.allowed_channels.iter().flat_map(|l| l.channels.iter()))
                .map(|ch| ch.login.clone())
                .collect();

            if !acl_logins.is_empty() {
                let mut pending = FuturesUnordered::new();
                for login in acl_logins {
                    let gql = gql.clone();
                    pending.push(async move {
                        let result = gql.get_stream_info(&login).await;
                        (login, result)
                    });
                }
                while let Some((login, result)) = pending.next().await {
                    match result {
                        Ok(value) => {
                            if let Some(channel) = parse_stream_info_channel(&value, &login, Some(game), true) {
                                fetched.push(channel);
                            }
                        }
                        Err(e) => {
                            tracing::debug!("stream info fetch failed for {}: {}", login, e);
                        }
                    }
                }
                continue;
            }

            let Some(slug) = game.slug.clone() else {
                continue;
            };
            match gql.get_game_directory(&slug, 30).await {
                Ok(directory) => {
                    let edges = directory
                        .get("data")
                        .and_then(|d| d.get("game"))
                        .and_then(|g| g.get("streams"))
                        .and_then(|s| s.get("edges"))
                        .and_then(|e| e.as_array())
                        .cloned()
                        .unwrap_or_default();
                    for edge in &edges {
                        if let Some(channel) = parse_directory_edge(edge, game) {
                            fetched.push(channel);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("directory fetch failed for {}: {}", game.display_name, e);
                }
            }
        }

        let found = fetched.len();
        let fetched_ids: std::collections::HashSet<String> =
            fetched.iter().map(|c| c.id.clone()).collect();
        let watching_id = self.channel_set.watching_id().map(|s| s.to_string());

        for channel in fetched {
            self.channel_set.upsert(channel);
        }
        self.channel_set
            .retain(|c| fetched_ids.contains(&c.id) || Some(c.id.as_str()) == watching_id.as_deref());

        // §4.8 CHANNELS_FETCH trim: reserve the two per-user topics out of the pool's total
        // capacity and drop the lowest-priority candidates beyond that (§5 backpressure).
        const CHANNEL_TOPIC_CAP: usize =
            crate::constants::MAX_WEBSOCKETS * crate::constants::WS_TOPICS_LIMIT - 2;
        if self.channel_set.len() > CHANNEL_TOPIC_CAP {
            let mut keep: std::collections::HashSet<String> = self
                .channel_set
                .ranked()
                .into_iter()
                .take(CHANNEL_TOPIC_CAP)
                .map(|c| c.id.clone())
                .collect();
            if let Some(id) = &watching_id {
                keep.insert(id.clone());
            }
            let dropped = self.channel_set.retain(|c| keep.contains(&c.id));
            if !dropped.is_empty() {
                tracing::debug!(
                    "trimmed {} lowest-priority channels beyond the websocket topic cap",
                    dropped.len()
                );
            }
        }

        self.sync_channel_topics().await;

        Ok(found)
    }

    /// Fetch a spade URL for `channel`, pick its best earnable drop, and hand the watch loop a
    /// new target. `self.channel_set` is updated to track it as the watched channel.
    async fn start_watching(&mut self, channel: Channel, game_name: String) -> Result<()> {
        let watcher = self.watcher.clone().context("Not logged in")?;

        let spade_url = match channel.spade_url.clone() {
            Some(url) => url,
            None => watcher.fetch_spade_url(&channel.login).await?,
        };

        let drop_id = active_drop_for_channel(&self.all_campaigns, &channel)
            .or_else(|| active_drop_for_channel(&self.campaigns, &channel))
            .map(|(_, drop)| drop.id.clone());

        let broadcast_id = channel
            .stream
            .as_ref()
            .map(|s| s.broadcast_id.clone())
            .unwrap_or_default();

        let target = WatchTarget {
            channel_id: channel.id.clone(),
            channel_login: channel.login.clone(),
            broadcast_id,
            spade_url,
            drop_id,
            online: Arc::new(AtomicBool::new(channel.online())),
        };

        self.channel_set.upsert(channel.clone());
        self.channel_set.set_watching(Some(channel.id.clone()));
        self.watching_channel = Some(channel);
        self.watching_target = Some(target.clone());
        self.current_attempt_game = Some(game_name);
        self.mining_status = None;
        self.has_live_stream = true;
        self.watch_handle.set_target(Some(target)).await;
        self.state = AppState::Watching;
        Ok(())
    }

    fn stop_watching(&mut self) {
        self.watching_channel = None;
        self.watching_target = None;
        self.has_live_stream = false;
        self.mining_status = None;
        self.current_attempt_game = None;
        self.channel_set.set_watching(None);
        self.watch_handle.try_set_target(None);
        self.state = AppState::Idle;
    }

    async fn select_channel(&mut self) -> Result<Option<String>> {
        // §4.8 GAMES_UPDATE: rebuild the wanted-games table so `ChannelSet`'s priority ordering
        // (§4.5) reflects the latest subscriptions, exclusions, and earnability.
        self.channel_set.wanted_games.clear();
        for campaign in self.all_campaigns.iter().chain(self.campaigns.iter()) {
            if self.config.wants_game(campaign) {
                let priority = self.config.game_priority(&campaign.game.display_name);
                self.channel_set.wanted_games.insert(campaign.game.clone(), priority);
            }
        }

        // Drop failed-attempt cooldowns that have expired.
        let now = Instant::now();
        self.failed_game_attempts
            .retain(|_, time| now.duration_since(*time) < Duration::from_secs(300));

        let all_campaigns = self.all_campaigns.clone();
        let campaigns = self.campaigns.clone();
        let failed_game_attempts = self.failed_game_attempts.clone();

        let ranked: Vec<Channel> = self
            .channel_set
            .ranked()
            .into_iter()
            .filter(|c| {
                self.channel_set.can_watch(c, &all_campaigns) || self.channel_set.can_watch(c, &campaigns)
            })
            .filter(|c| {
                c.stream
                    .as_ref()
                    .map(|s| !failed_game_attempts.contains_key(&s.game.display_name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let Some(best) = ranked.into_iter().next() else {
            return Ok(None);
        };

        if !self.channel_set.should_switch(&best) {
            return Ok(None);
        }

        let game_name = best
            .stream
            .as_ref()
            .map(|s| s.game.display_name.clone())
            .unwrap_or_default();
        let login = best.login.clone();
        tracing::info!("Selecting channel {} for {}", login, game_name);
        self.start_watching(best, game_name).await?;
        Ok(Some(login))
    }

    fn is_watcher_active(&self) -> bool {
        self.watching_channel.is_some()
    }

    /// Scan every tracked campaign for drops ready to claim (§4.6 fallback for claims the
    /// websocket never reported) and claim them.
    async fn claim_unclaimed_drops(&mut self) -> Result<Vec<(String, String)>> {
        let gql = match &self.gql {
            Some(g) => g.clone(),
            None => return Ok(Vec::new()),
        };
        let user_id = self.auth.as_ref().map(|a| a.user_id).unwrap_or(0);

        self.progress
            .synthesize_missing_claim_ids(&mut self.all_campaigns, user_id);
        self.progress
            .synthesize_missing_claim_ids(&mut self.campaigns, user_id);

        let mut claims_to_process: Vec<(String, String, String, String)> = Vec::new(); // (campaign_id, game, drop, drop_id)
        for campaigns in [&self.all_campaigns, &self.campaigns] {
            for campaign in campaigns {
                for drop in &campaign.time_based_drops {
                    if drop.can_claim_for_campaign(campaign) {
                        claims_to_process.push((
                            campaign.id.clone(),
                            campaign.game.display_name.clone(),
                            drop.name.clone(),
                            drop.id.clone(),
                        ));
                    }
                }
            }
        }

        if claims_to_process.is_empty() {
            return Ok(Vec::new());
        }

        claims_to_process.sort_by(|a, b| a.3.cmp(&b.3));
        claims_to_process.dedup_by(|a, b| a.3 == b.3);

        let mut claimed_drops = Vec::new();
        for (campaign_id, game_name, drop_name, drop_id) in claims_to_process {
            let outcome_all = self
                .progress
                .claim(&mut self.all_campaigns, &gql, &campaign_id, &drop_id)
                .await;
            let outcome_inv = self
                .progress
                .claim(&mut self.campaigns, &gql, &campaign_id, &drop_id)
                .await;
            if matches!(outcome_all, crate::progress::ClaimOutcome::Success)
                || matches!(outcome_inv, crate::progress::ClaimOutcome::Success)
            {
                self.mark_drop_claimed(&game_name, &drop_name);
                claimed_drops.push((game_name, drop_name));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        Ok(claimed_drops)
    }

    /// Consume one [`WatchEvent`] from the watch loop, updating campaign data and the UI-facing
    /// `mining_status` snapshot.
    fn handle_watch_event(&mut self, event: WatchEvent) -> Vec<String> {
        let mut logs = Vec::new();
        match event {
            WatchEvent::PulseSent { .. } => {
                self.has_live_stream = true;
                self.transient_error_count = 0;
            }
            WatchEvent::PulseFailed { channel_login, detail } => {
                logs.push(format!("WATCHER: pulse failed for {channel_login}: {detail}"));
                self.transient_error_count += 1;
                if self.transient_error_count >= 10 {
                    logs.push("WATCHER: too many failed pulses, switching channel".to_string());
                    tracing::warn!("too many failed pulses ({}), stopping", self.transient_error_count);
                    self.transient_error_count = 0;
                    if let Some(game) = self.current_attempt_game.clone() {
                        self.failed_game_attempts.insert(game, Instant::now());
                    }
                    self.stop_watching();
                }
            }
            WatchEvent::LocalEstimateBump { drop_id, .. } => {
                if self.apply_minute_update(&drop_id, None) {
                    logs.push(format!(
                        "WATCHER: {drop_id} hit the local estimate cap with no authoritative update, switching channel"
                    ));
                    tracing::warn!("drop {drop_id} reached MAX_EXTRA_MINUTES without an authoritative update");
                    if let Some(game) = self.current_attempt_game.clone() {
                        self.failed_game_attempts.insert(game, Instant::now());
                    }
                    self.stop_watching();
                }
            }
            WatchEvent::MinuteAccounted {
                channel_login,
                drop_id,
                minutes,
                via,
            } => {
                self.transient_error_count = 0;
                let minutes = if minutes >= 0 { Some(minutes) } else { None };
                self.apply_minute_update(&drop_id, minutes);
                self.refresh_mining_status(&drop_id, &channel_login);

                if via == MinuteSource::GraphQlFallback {
                    tracing::debug!("minute accounted via GraphQL fallback for drop {drop_id}");
                }

                if self.find_drop(&drop_id).map(|d| d.can_claim()).unwrap_or(false) {
                    logs.extend(self.claim_ready_drop(&drop_id));
                }
            }
        }
        logs
    }

    /// Consume one websocket PubSub event, routing progress/claim events through the progress
    /// engine (resolving the watch loop's pending `await_update` oneshot, §4.6/§4.7) and
    /// stream-state events through the channel set.
    async fn handle_pubsub_event(&mut self, event: PubSubEvent) -> Vec<String> {
        let mut logs = Vec::new();
        match event {
            PubSubEvent::DropProgress { drop_id, current_minutes } => {
                self.progress
                    .handle_drop_progress(&mut self.all_campaigns, &drop_id, current_minutes)
                    .await;
                for campaign in self.campaigns.iter_mut() {
                    if let Some(drop) = campaign.time_based_drops.iter_mut().find(|d| d.id == drop_id) {
                        drop.set_real_minutes(current_minutes);
                    }
                }
                if let Some(login) = self.watching_channel.as_ref().map(|c| c.login.clone()) {
                    self.refresh_mining_status(&drop_id, &login);
                }
            }
            PubSubEvent::DropClaim {
                drop_id,
                drop_instance_id,
            } => {
                let Some(gql) = self.gql.clone() else {
                    return logs;
                };
                let outcome = self
                    .progress
                    .handle_drop_claim(&mut self.all_campaigns, &gql, &drop_id, &drop_instance_id)
                    .await;
                for campaign in self.campaigns.iter_mut() {
                    if let Some(drop) = campaign.time_based_drops.iter_mut().find(|d| d.id == drop_id) {
                        drop.set_claim_id(drop_instance_id.clone());
                    }
                }

                let Some((campaign_id, outcome)) = outcome else {
                    logs.extend(self.claim_ready_drop(&drop_id));
                    return logs;
                };

                if !matches!(outcome, crate::progress::ClaimOutcome::Success) {
                    logs.push(format!("DROP: claim failed for {drop_id}"));
                    return logs;
                }

                let Some((game_name, drop_name, has_remaining)) =
                    self.all_campaigns.iter().find(|c| c.id == campaign_id).map(|c| {
                        let drop_name = c
                            .time_based_drops
                            .iter()
                            .find(|d| d.id == drop_id)
                            .map(|d| d.name.clone())
                            .unwrap_or_else(|| drop_id.clone());
                        let has_remaining = c
                            .time_based_drops
                            .iter()
                            .any(|d| d.id != drop_id && !d.is_claimed());
                        (c.game.display_name.clone(), drop_name, has_remaining)
                    })
                else {
                    return logs;
                };
                self.mark_drop_claimed(&game_name, &drop_name);
                logs.push(format!("DROP: claimed {drop_name} ({game_name})"));

                if let Some(channel_id) = self.watching_channel.as_ref().map(|c| c.id.clone()) {
                    let progress = self.progress.clone();
                    let tx = self.claim_settled_tx.clone();
                    tokio::spawn(async move {
                        progress.confirm_claim_settled(&gql, &channel_id, &drop_id).await;
                        let _ = tx.send(has_remaining);
                    });
                }
            }
            PubSubEvent::StreamUp { channel_id } => {
                if let Some(msg) = self.handle_stream_up(&channel_id).await {
                    logs.push(msg);
                }
            }
            PubSubEvent::StreamDown { channel_id } => {
                let was_watched = self.channel_set.on_stream_down(&channel_id);
                self.sync_watch_target_online(&channel_id);
                if was_watched {
                    logs.push("WATCHER: watched channel went offline".to_string());
                    self.stop_watching();
                }
            }
            PubSubEvent::ViewCount { channel_id, viewers } => {
                self.channel_set.on_viewcount(&channel_id, viewers);
            }
            PubSubEvent::PointsEarned { channel_id, balance } => {
                if let Some(channel) = self.channel_set.get(&channel_id) {
                    tracing::debug!("{} points balance now {}", channel.login, balance);
                }
            }
            // §4.8 maintenance (b): claim the bonus as soon as it's announced rather than
            // waiting for the next sweep — the original miner does this reactively too.
            PubSubEvent::ClaimAvailable { channel_id, claim_id } => {
                if let Some(gql) = self.gql.clone() {
                    match gql.claim_community_points(&channel_id, &claim_id).await {
                        Ok(_) => logs.push("Claimed channel points bonus".to_string()),
                        Err(e) => tracing::debug!("claim_community_points failed: {}", e),
                    }
                }
            }
            PubSubEvent::Unknown(_) => {}
        }
        logs
    }

    /// §4.6 follow-up once `confirm_claim_settled` returns: resume watching if the campaign has
    /// another earnable drop, otherwise force a fresh inventory fetch (§4.8 INVENTORY_FETCH).
    async fn handle_claim_settled(&mut self, has_remaining_drops: bool) -> Vec<String> {
        let mut logs = Vec::new();
        if has_remaining_drops {
            if let (Some(target), Some(channel)) =
                (self.watching_target.clone(), self.watching_channel.clone())
            {
                let drop_id = active_drop_for_channel(&self.all_campaigns, &channel)
                    .or_else(|| active_drop_for_channel(&self.campaigns, &channel))
                    .map(|(_, drop)| drop.id.clone());
                let mut next_target = target;
                next_target.drop_id = drop_id;
                self.watch_handle.set_target(Some(next_target)).await;
            }
        } else {
            logs.push("DROP: campaign exhausted, refreshing inventory".to_string());
            self.stop_watching();
            self.change_state(AppState::AllCampaignsFetch);
        }
        logs
    }

    async fn handle_stream_up(&mut self, channel_id: &str) -> Option<String> {
        let gql = self.gql.clone()?;
        let tracked = self.channel_set.get(channel_id)?;
        let login = tracked.login.clone();
        let acl_based = tracked.acl_based;

        let value = gql.get_stream_info(&login).await.ok()?;
        let parsed = parse_stream_info_channel(&value, &login, None, acl_based)?;
        let stream = *parsed.stream?;

        if !self.channel_set.on_stream_up(channel_id, stream) {
            return None;
        }
        self.sync_watch_target_online(channel_id);
        let channel = self.channel_set.get(channel_id)?.clone();

        let can_watch = self.channel_set.can_watch(&channel, &self.all_campaigns)
            || self.channel_set.can_watch(&channel, &self.campaigns);
        if can_watch && self.channel_set.should_switch(&channel) {
            let game_name = channel.stream.as_ref()?.game.display_name.clone();
            self.start_watching(channel.clone(), game_name).await.ok()?;
            return Some(format!("WATCHER: switched to {} (came online)", channel.login));
        }
        None
    }
}

impl App {
    /// Keep the in-flight `WatchTarget`'s shared online flag (read by `watch_loop` before every
    /// pulse) in sync with `channel_set`'s own record, whenever `channel_id` is the one currently
    /// being watched.
    fn sync_watch_target_online(&self, channel_id: &str) {
        let Some(target) = self.watching_target.as_ref() else {
            return;
        };
        if target.channel_id != channel_id {
            return;
        }
        let online = self.channel_set.get(channel_id).map(|c| c.online()).unwrap_or(false);
        target.online.store(online, Ordering::Relaxed);
    }

    fn find_drop(&self, drop_id: &str) -> Option<crate::models::TimedDrop> {
        self.all_campaigns
            .iter()
            .chain(self.campaigns.iter())
            .find_map(|c| c.time_based_drops.iter().find(|d| d.id == drop_id).cloned())
    }

    /// Apply an authoritative (`Some(minutes)`) or estimated (`None`) minute update to every
    /// campaign copy of `drop_id` (both the subscribed-detail list and the full inventory list
    /// carry their own instances). Returns `true` if an estimate bump just hit
    /// `MAX_EXTRA_MINUTES`, in which case the caller must force a channel switch (§4.6/§8).
    fn apply_minute_update(&mut self, drop_id: &str, minutes: Option<i32>) -> bool {
        let mut capped = false;
        for campaigns in [&mut self.all_campaigns, &mut self.campaigns] {
            for campaign in campaigns.iter_mut() {
                if let Some(drop) = campaign.time_based_drops.iter_mut().find(|d| d.id == drop_id) {
                    match minutes {
                        Some(m) => drop.set_real_minutes(m),
                        None => {
                            if drop.bump_extra_second() {
                                capped = true;
                            }
                        }
                    }
                }
            }
        }
        capped
    }

    /// §4.4/§4.8: diff `channel_set`'s current membership against the topics last registered on
    /// `ws_pool` and subscribe/unsubscribe `Channel/StreamState` for the difference.
    async fn sync_channel_topics(&mut self) {
        let Some(pool) = self.ws_pool.clone() else {
            return;
        };
        let current: std::collections::HashSet<String> =
            self.channel_set.iter().map(|c| c.id.clone()).collect();

        let to_add: Vec<String> = current
            .difference(&self.ws_channel_topics)
            .map(|id| channel_stream_state_topic(id))
            .collect();
        let to_remove: Vec<String> = self
            .ws_channel_topics
            .difference(&current)
            .map(|id| channel_stream_state_topic(id))
            .collect();

        if !to_add.is_empty() {
            if let Err(e) = pool.add_topics(to_add).await {
                tracing::warn!("failed to subscribe channel stream-state topics: {e}");
            }
        }
        if !to_remove.is_empty() {
            pool.remove_topics(&to_remove).await;
        }

        self.ws_channel_topics = current;
    }

    fn refresh_mining_status(&mut self, drop_id: &str, channel_login: &str) {
        let snapshot = self.all_campaigns.iter().chain(self.campaigns.iter()).find_map(|c| {
            c.time_based_drops.iter().find(|d| d.id == drop_id).map(|d| MiningStatus {
                game_name: c.game.display_name.clone(),
                channel_login: channel_login.to_string(),
                drop_name: d.name.clone(),
                progress_percent: d.progress() * 100.0,
                minutes_watched: d.current_minutes() as i32,
                minutes_required: d.total_required_minutes(c),
            })
        });
        if snapshot.is_some() {
            self.mining_status = snapshot;
            self.current_attempt_game = None;
        }
    }

    /// Flag `drop_id` as ready to claim when no websocket `drop-claim` event has been seen for
    /// it yet (progress reached 100% via the GraphQL fallback, or the drop belongs to no
    /// tracked campaign). The actual `ClaimDrop` call is deferred to the next
    /// `claim_unclaimed_drops` sweep, which is idempotent via the claim-id dedup.
    fn claim_ready_drop(&mut self, drop_id: &str) -> Vec<String> {
        let mut logs = Vec::new();
        let Some(game_name) = self
            .all_campaigns
            .iter()
            .chain(self.campaigns.iter())
            .find_map(|c| {
                c.time_based_drops
                    .iter()
                    .any(|d| d.id == drop_id)
                    .then(|| c.game.display_name.clone())
            })
        else {
            return logs;
        };
        logs.push(format!(
            "DROP: {} ready to claim ({}); will claim on the next sweep",
            drop_id, game_name
        ));
        logs
    }
}

fn channel_stream_state_topic(channel_id: &str) -> String {
    crate::constants::format_topic_str(crate::constants::websocket_topics::CHANNEL_STREAM_STATE, channel_id)
}

/// Parse a `GET_STREAM_INFO` response (`data.user`) into a [`Channel`]. `game` overrides
/// whatever game the stream reports (used by the ACL branch of CHANNELS_FETCH, which never
/// cross-checks the broadcaster's actual category against the campaign it was pulled off of);
/// pass `None` to read the game straight out of `broadcastSettings.game` instead, which is what
/// the stream-up pre-emption path needs since the channel isn't tied to one particular campaign.
fn parse_stream_info_channel(
    value: &Value,
    login: &str,
    game: Option<&Game>,
    acl_based: bool,
) -> Option<Channel> {
    let user = value.get("data")?.get("user")?;
    let id = user.get("id")?.as_str()?.to_string();
    let display_name = user
        .get("displayName")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let stream = match user.get("stream").filter(|s| !s.is_null()) {
        Some(stream) => stream,
        None => {
            return Some(Channel {
                id,
                login: login.to_string(),
                display_name,
                profile_image_url: None,
                stream: None,
                acl_based,
                spade_url: None,
            });
        }
    };

    let broadcast_id = stream
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let viewers = stream.get("viewersCount").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
    let drops_enabled = stream
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter()
                .any(|t| t.get("localizedName").and_then(|n| n.as_str()) == Some("Drops Enabled"))
        })
        .unwrap_or(true);
    let broadcast_settings = user.get("broadcastSettings");
    let title = broadcast_settings
        .and_then(|s| s.get("title"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let game = match game {
        Some(game) => game.clone(),
        None => serde_json::from_value(broadcast_settings?.get("game")?.clone()).ok()?,
    };

    Some(Channel {
        id,
        login: login.to_string(),
        display_name,
        profile_image_url: None,
        stream: Some(Box::new(crate::models::Stream {
            broadcast_id,
            game,
            viewers,
            title,
            drops_enabled,
            started_observing_at: chrono::Utc::now(),
        })),
        acl_based,
        spade_url: None,
    })
}

/// Parse one `streams.edges[]` entry from a `GAME_DIRECTORY` response into a [`Channel`].
fn parse_directory_edge(edge: &Value, game: &Game) -> Option<Channel> {
    let node = edge.get("node")?;
    let broadcaster = node.get("broadcaster")?;
    let id = broadcaster.get("id")?.as_str()?.to_string();
    let login = broadcaster.get("login")?.as_str()?.to_string();
    let display_name = broadcaster
        .get("displayName")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let broadcast_id = node
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let viewers = node.get("viewersCount").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
    let title = node.get("title").and_then(|v| v.as_str()).map(|s| s.to_string());
    let drops_enabled = node
        .get("freeformTags")
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter()
                .any(|t| t.get("name").and_then(|n| n.as_str()) == Some("Drops Enabled"))
        })
        .unwrap_or(true);

    Some(Channel {
        id,
        login,
        display_name,
        profile_image_url: None,
        stream: Some(Box::new(crate::models::Stream {
            broadcast_id,
            game: game.clone(),
            viewers,
            title,
            drops_enabled,
            started_observing_at: chrono::Utc::now(),
        })),
        acl_based: false,
        spade_url: None,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, AppConfig, AppState};
    use crate::auth::AuthState;

    fn mock_auth() -> AuthState {
        AuthState {
            access_token: "test_token".to_string(),
            user_id: 12345678,
            device_id: "test_device".to_string(),
            login: "testuser".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "test-version".to_string(),
        }
    }

    #[test]
    fn test_parse_directory_edge() {
        let game = Game {
            id: "game-1".to_string(),
            display_name: "Fortnite".to_string(),
            box_art_url: None,
            slug: Some("fortnite".to_string()),
        };
        let edge = serde_json::json!({
            "node": {
                "id": "broadcast-1",
                "viewersCount": 1234,
                "title": "Grinding drops",
                "broadcaster": {
                    "id": "987",
                    "login": "someone",
                    "displayName": "Someone"
                }
            }
        });

        let channel = parse_directory_edge(&edge, &game).expect("edge should parse");
        assert_eq!(channel.id, "987");
        assert_eq!(channel.login, "someone");
        let stream = channel.stream.expect("channel should carry a stream");
        assert_eq!(stream.broadcast_id, "broadcast-1");
        assert_eq!(stream.viewers, 1234);
        assert_eq!(stream.game.id, "game-1");
    }

    #[test]
    fn test_parse_directory_edge_missing_broadcaster() {
        let game = Game {
            id: "game-1".to_string(),
            display_name: "Fortnite".to_string(),
            box_art_url: None,
            slug: Some("fortnite".to_string()),
        };
        let edge = serde_json::json!({"node": {"id": "broadcast-1"}});
        assert!(parse_directory_edge(&edge, &game).is_none());
    }

    #[test]
    fn test_parse_stream_info_channel_online() {
        let game = Game {
            id: "game-1".to_string(),
            display_name: "Fortnite".to_string(),
            box_art_url: None,
            slug: Some("fortnite".to_string()),
        };
        let value = serde_json::json!({
            "data": {
                "user": {
                    "id": "555",
                    "displayName": "Acl Streamer",
                    "stream": {
                        "id": "broadcast-555",
                        "viewersCount": 42,
                        "tags": [{"localizedName": "Drops Enabled"}]
                    },
                    "broadcastSettings": {"title": "ACL stream", "game": {"id": "game-1"}}
                }
            }
        });

        let channel =
            parse_stream_info_channel(&value, "aclstreamer", Some(&game), true).expect("should parse");
        assert_eq!(channel.id, "555");
        assert!(channel.acl_based);
        let stream = channel.stream.expect("online channel should carry a stream");
        assert_eq!(stream.broadcast_id, "broadcast-555");
        assert_eq!(stream.viewers, 42);
        assert!(stream.drops_enabled);
    }

    #[test]
    fn test_parse_stream_info_channel_offline() {
        let game = Game {
            id: "game-1".to_string(),
            display_name: "Fortnite".to_string(),
            box_art_url: None,
            slug: Some("fortnite".to_string()),
        };
        let value = serde_json::json!({
            "data": {"user": {"id": "555", "stream": null}}
        });

        let channel =
            parse_stream_info_channel(&value, "aclstreamer", Some(&game), true).expect("should parse");
        assert!(channel.acl_based);
        assert!(channel.stream.is_none());
    }

    #[test]
    fn test_parse_stream_info_channel_reads_game_when_not_overridden() {
        let value = serde_json::json!({
            "data": {
                "user": {
                    "id": "777",
                    "stream": {
                        "id": "broadcast-777",
                        "viewersCount": 10,
                        "tags": [{"localizedName": "Drops Enabled"}]
                    },
                    "broadcastSettings": {
                        "title": "Some stream",
                        "game": {"id": "game-9", "displayName": "Apex Legends"}
                    }
                }
            }
        });

        let channel =
            parse_stream_info_channel(&value, "someone", None, false).expect("should parse");
        assert!(!channel.acl_based);
        let stream = channel.stream.expect("should carry a stream");
        assert_eq!(stream.game.id, "game-9");
        assert_eq!(stream.game.display_name, "Apex Legends");
    }

    #[test]
    fn test_stop_watching_resets_state() {
        let mut app = App::new(mock_auth(), AppConfig::default());
        app.has_live_stream = true;
        app.state = AppState::Watching;
        app.mining_status = Some(MiningStatus {
            game_name: "TestGame".to_string(),
            channel_login: "test_channel".to_string(),
            drop_name: "TestDrop".to_string(),
            progress_percent: 50.0,
            minutes_watched: 30,
            minutes_required: 60,
        });

        app.stop_watching();

        assert_eq!(app.state, AppState::Idle);
        assert!(!app.has_live_stream);
        assert!(app.mining_status.is_none());
        assert!(app.channel_set.watching().is_none());
    }

    #[tokio::test]
    async fn test_stream_down_on_watched_channel_stops_watching() {
        let mut app = App::new(mock_auth(), AppConfig::default());
        let channel = Channel {
            id: "123".to_string(),
            login: "someone".to_string(),
            display_name: None,
            profile_image_url: None,
            stream: None,
            acl_based: false,
            spade_url: None,
        };
        app.channel_set.upsert(channel);
        app.channel_set.set_watching(Some("123".to_string()));
        app.state = AppState::Watching;

        let logs = app
            .handle_pubsub_event(PubSubEvent::StreamDown {
                channel_id: "123".to_string(),
            })
            .await;

        assert_eq!(app.state, AppState::Idle);
        assert!(logs.iter().any(|l| l.contains("offline")));
    }

    #[test]
    fn test_sync_watch_target_online_flips_shared_flag() {
        let mut app = App::new(mock_auth(), AppConfig::default());
        let channel = Channel {
            id: "123".to_string(),
            login: "someone".to_string(),
            display_name: None,
            profile_image_url: None,
            stream: Some(Box::new(crate::models::Stream {
                broadcast_id: "b".to_string(),
                game: Game {
                    id: "g".to_string(),
                    display_name: "Game".to_string(),
                    box_art_url: None,
                    slug: None,
                },
                viewers: 1,
                title: None,
                drops_enabled: true,
                started_observing_at: chrono::Utc::now(),
            })),
            acl_based: false,
            spade_url: None,
        };
        app.channel_set.upsert(channel.clone());
        app.channel_set.set_watching(Some("123".to_string()));
        let online = Arc::new(AtomicBool::new(true));
        app.watching_target = Some(crate::watcher::WatchTarget {
            channel_id: "123".to_string(),
            channel_login: "someone".to_string(),
            broadcast_id: "b".to_string(),
            spade_url: "https://example.com".to_string(),
            drop_id: None,
            online: online.clone(),
        });

        app.sync_watch_target_online("123");
        assert!(online.load(Ordering::Relaxed));

        app.channel_set.on_stream_down("123");
        app.sync_watch_target_online("123");
        assert!(!online.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_handle_stream_up_noop_without_gql_client() {
        let mut app = App::new(mock_auth(), AppConfig::default());
        let channel = Channel {
            id: "123".to_string(),
            login: "someone".to_string(),
            display_name: None,
            profile_image_url: None,
            stream: None,
            acl_based: false,
            spade_url: None,
        };
        app.channel_set.upsert(channel);

        let logs = app
            .handle_pubsub_event(PubSubEvent::StreamUp {
                channel_id: "123".to_string(),
            })
            .await;

        assert!(logs.is_empty());
        assert!(!app.channel_set.get("123").unwrap().online());
    }

    #[tokio::test]
    async fn test_handle_stream_up_unknown_channel_is_noop() {
        let mut app = App::new(mock_auth(), AppConfig::default());

        let logs = app
            .handle_pubsub_event(PubSubEvent::StreamUp {
                channel_id: "does-not-exist".to_string(),
            })
            .await;

        assert!(logs.is_empty());
    }

    #[test]
    fn test_local_estimate_cap_forces_channel_switch() {
        use crate::models::{DropsCampaign, Game, TimedDrop};

        let mut app = App::new(mock_auth(), AppConfig::default());
        let now = chrono::Utc::now();
        let drop = TimedDrop {
            id: "drop-1".to_string(),
            name: "Drop".to_string(),
            required_minutes: 60,
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            benefit_edges: vec![],
            self_info: None,
            precondition_drop_ids: vec![],
            extra_minutes: crate::constants::MAX_EXTRA_MINUTES - 1,
            extra_seconds: 59,
            claim_id: None,
        };
        app.campaigns = vec![DropsCampaign {
            id: "campaign-1".to_string(),
            name: "Campaign".to_string(),
            game: Game {
                id: "game-1".to_string(),
                display_name: "Fortnite".to_string(),
                box_art_url: None,
                slug: None,
            },
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            status: "ACTIVE".to_string(),
            time_based_drops: vec![drop],
            self_info: None,
            allowed_channels: None,
        }];
        app.state = AppState::Watching;
        app.has_live_stream = true;

        let logs = app.handle_watch_event(WatchEvent::LocalEstimateBump {
            channel_login: "someone".to_string(),
            drop_id: "drop-1".to_string(),
        });

        assert_eq!(app.state, AppState::Idle);
        assert!(logs.iter().any(|l| l.contains("switching channel")));
    }

    #[test]
    fn test_pulse_failures_stop_watching_after_threshold() {
        let mut app = App::new(mock_auth(), AppConfig::default());
        app.state = AppState::Watching;
        app.has_live_stream = true;

        for _ in 0..10 {
            app.handle_watch_event(WatchEvent::PulseFailed {
                channel_login: "someone".to_string(),
                detail: "boom".to_string(),
            });
        }

        assert_eq!(app.state, AppState::Idle);
        assert_eq!(app.transient_error_count, 0);
    }
}
