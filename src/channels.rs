//! Channel set: the ranked, insertion-ordered collection of candidate channels the state
//! machine chooses a watch target from.
//!
//! Priority ranking (`get_priority`/`can_watch`/`should_switch`) is built around an owned `Vec`
//! (order matters for display and for the channel-fetch trim step) plus a side `HashMap` for
//! O(1) lookup by id.

use std::collections::HashMap;

use crate::models::{Channel, DropsCampaign, Game};

/// `Game -> priority` as rebuilt each GAMES_UPDATE cycle (higher is more preferred).
#[derive(Debug, Clone, Default)]
pub struct WantedGames {
    order: Vec<Game>,
    priority: HashMap<String, i32>,
}

impl WantedGames {
    pub fn clear(&mut self) {
        self.order.clear();
        self.priority.clear();
    }

    pub fn insert(&mut self, game: Game, priority: i32) {
        if !self.priority.contains_key(&game.id) {
            self.order.push(game.clone());
        }
        self.priority.insert(game.id.clone(), priority);
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, game: &Game) -> bool {
        self.priority.contains_key(&game.id)
    }

    /// Priority value for a game, or `None` if it isn't wanted at all.
    pub fn priority_of(&self, game: &Game) -> Option<i32> {
        self.priority.get(&game.id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Game> {
        self.order.iter()
    }
}

/// A channel's rank, compared lexicographically: game priority first, then the ACL tiebreak,
/// then viewer count. Higher sorts as more preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority {
    game_priority: i32,
    acl_based: bool,
    viewers: i32,
}

impl Priority {
    pub const NONE: Priority = Priority {
        game_priority: -1,
        acl_based: false,
        viewers: 0,
    };
}

/// The ranked set of channels the controller is tracking as watch candidates.
#[derive(Debug, Default)]
pub struct ChannelSet {
    order: Vec<String>,
    channels: HashMap<String, Channel>,
    pub wanted_games: WantedGames,
    watching: Option<String>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Channel> {
        self.channels.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.channels.contains_key(id)
    }

    /// Insertion-order iteration, matching the ordered-mapping semantics of §3.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.order.iter().filter_map(|id| self.channels.get(id))
    }

    /// Insert or replace a channel, preserving its original insertion slot if it already exists.
    pub fn upsert(&mut self, channel: Channel) {
        if !self.channels.contains_key(&channel.id) {
            self.order.push(channel.id.clone());
        }
        self.channels.insert(channel.id.clone(), channel);
    }

    /// Remove a channel by id. If it was the watched channel, clears the watch target (the
    /// caller is responsible for triggering `CHANNEL_SWITCH` in response).
    pub fn remove(&mut self, id: &str) -> Option<Channel> {
        self.order.retain(|existing| existing != id);
        if self.watching.as_deref() == Some(id) {
            self.watching = None;
        }
        self.channels.remove(id)
    }

    /// Remove every tracked channel (full cleanup).
    pub fn clear(&mut self) {
        self.order.clear();
        self.channels.clear();
        self.watching = None;
    }

    /// Remove every channel for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Channel) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.order.retain(|id| {
            let channel = self.channels.get(id).expect("order/channels out of sync");
            if keep(channel) {
                true
            } else {
                removed.push(id.clone());
                false
            }
        });
        for id in &removed {
            self.channels.remove(id);
            if self.watching.as_deref() == Some(id.as_str()) {
                self.watching = None;
            }
        }
        removed
    }

    pub fn watching_id(&self) -> Option<&str> {
        self.watching.as_deref()
    }

    pub fn watching(&self) -> Option<&Channel> {
        self.watching.as_deref().and_then(|id| self.channels.get(id))
    }

    pub fn set_watching(&mut self, id: Option<String>) {
        self.watching = id;
    }

    /// §4.5 priority: game priority (or -1 offline/gameless), ACL tiebreak, viewer tiebreak.
    pub fn priority(&self, channel: &Channel) -> Priority {
        let Some(stream) = channel.stream.as_deref() else {
            return Priority::NONE;
        };
        // Online but unmatched game ranks above NONE (-1) at 0, same as any non-priority game.
        let game_priority = self.wanted_games.priority_of(&stream.game).unwrap_or(0);
        Priority {
            game_priority,
            acl_based: channel.acl_based,
            viewers: stream.viewers,
        }
    }

    /// §4.5 `can_watch`: online, drops-enabled, game is wanted, and some campaign can still
    /// earn on it.
    pub fn can_watch(&self, channel: &Channel, campaigns: &[DropsCampaign]) -> bool {
        let Some(stream) = channel.stream.as_deref() else {
            return false;
        };
        if !stream.drops_enabled {
            return false;
        }
        if !self.wanted_games.contains(&stream.game) {
            return false;
        }
        campaigns
            .iter()
            .any(|c| c.game.id == stream.game.id && c.can_earn(Some(channel)))
    }

    /// §4.5 `should_switch`: nothing currently watched, strictly higher priority, or an
    /// ACL-based tie against a non-ACL incumbent.
    pub fn should_switch(&self, candidate: &Channel) -> bool {
        let Some(current) = self.watching() else {
            return true;
        };
        if current.id == candidate.id {
            return false;
        }
        let candidate_priority = self.priority(candidate);
        let current_priority = self.priority(current);
        match candidate_priority.cmp(&current_priority) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => candidate.acl_based && !current.acl_based,
            std::cmp::Ordering::Less => false,
        }
    }

    /// Channels sorted by descending priority (stable, preserving insertion order among ties).
    pub fn ranked(&self) -> Vec<&Channel> {
        let mut v: Vec<&Channel> = self.iter().collect();
        v.sort_by(|a, b| self.priority(b).cmp(&self.priority(a)));
        v
    }

    /// Apply an inbound `viewcount` stream-state event.
    pub fn on_viewcount(&mut self, channel_id: &str, viewers: i32) {
        if let Some(channel) = self.channels.get_mut(channel_id) {
            if let Some(stream) = channel.stream.as_mut() {
                stream.viewers = viewers;
            }
        }
    }

    /// Apply an inbound `stream-up` event: returns `true` if the channel is newly online.
    pub fn on_stream_up(
        &mut self,
        channel_id: &str,
        stream: crate::models::Stream,
    ) -> bool {
        if let Some(channel) = self.channels.get_mut(channel_id) {
            let was_online = channel.online();
            channel.set_online(stream);
            !was_online
        } else {
            false
        }
    }

    /// Apply an inbound `stream-down` event: returns `true` if this was the watched channel.
    pub fn on_stream_down(&mut self, channel_id: &str) -> bool {
        if let Some(channel) = self.channels.get_mut(channel_id) {
            channel.set_offline();
        }
        self.watching.as_deref() == Some(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stream;
    use chrono::Utc;

    fn game(id: &str) -> Game {
        Game {
            id: id.to_string(),
            display_name: format!("Game {id}"),
            box_art_url: None,
            slug: None,
        }
    }

    fn channel(id: &str, g: Option<&Game>, viewers: i32, acl: bool) -> Channel {
        Channel {
            id: id.to_string(),
            login: format!("login{id}"),
            display_name: None,
            profile_image_url: None,
            stream: g.map(|g| {
                Box::new(Stream {
                    broadcast_id: format!("b{id}"),
                    game: g.clone(),
                    viewers,
                    title: None,
                    drops_enabled: true,
                    started_observing_at: Utc::now(),
                })
            }),
            acl_based: acl,
            spade_url: None,
        }
    }

    #[test]
    fn offline_channel_has_lowest_priority() {
        let set = ChannelSet::new();
        let c = channel("1", None, 0, false);
        assert_eq!(set.priority(&c), Priority::NONE);
    }

    #[test]
    fn higher_game_priority_wins() {
        let mut set = ChannelSet::new();
        let g1 = game("1");
        let g2 = game("2");
        set.wanted_games.insert(g1.clone(), 1);
        set.wanted_games.insert(g2.clone(), 5);

        let a = channel("a", Some(&g1), 100, false);
        let b = channel("b", Some(&g2), 10, false);
        assert!(set.priority(&b) > set.priority(&a));
    }

    #[test]
    fn acl_tiebreaks_equal_game_priority() {
        let mut set = ChannelSet::new();
        let g = game("1");
        set.wanted_games.insert(g.clone(), 1);

        let a = channel("a", Some(&g), 500, false);
        let b = channel("b", Some(&g), 10, true);
        assert!(set.priority(&b) > set.priority(&a));
    }

    #[test]
    fn viewers_tiebreak_last() {
        let mut set = ChannelSet::new();
        let g = game("1");
        set.wanted_games.insert(g.clone(), 1);

        let a = channel("a", Some(&g), 10, false);
        let b = channel("b", Some(&g), 500, false);
        assert!(set.priority(&b) > set.priority(&a));
    }

    #[test]
    fn should_switch_when_nothing_watched() {
        let set = ChannelSet::new();
        let c = channel("a", None, 0, false);
        assert!(set.should_switch(&c));
    }

    #[test]
    fn should_switch_on_strictly_higher_priority() {
        let mut set = ChannelSet::new();
        let g1 = game("1");
        let g2 = game("2");
        set.wanted_games.insert(g1.clone(), 1);
        set.wanted_games.insert(g2.clone(), 5);

        let low = channel("low", Some(&g1), 10, false);
        let high = channel("high", Some(&g2), 10, false);
        set.upsert(low.clone());
        set.set_watching(Some("low".to_string()));

        assert!(set.should_switch(&high));
        assert!(!set.should_switch(&low));
    }

    #[test]
    fn should_switch_on_acl_tie() {
        let mut set = ChannelSet::new();
        let g = game("1");
        set.wanted_games.insert(g.clone(), 1);

        let incumbent = channel("incumbent", Some(&g), 10, false);
        let acl_candidate = channel("acl", Some(&g), 10, true);
        set.upsert(incumbent.clone());
        set.set_watching(Some("incumbent".to_string()));

        assert!(set.should_switch(&acl_candidate));
    }

    #[test]
    fn removing_watched_channel_clears_watch_target() {
        let mut set = ChannelSet::new();
        let c = channel("a", None, 0, false);
        set.upsert(c);
        set.set_watching(Some("a".to_string()));
        set.remove("a");
        assert!(set.watching().is_none());
    }

    #[test]
    fn retain_drops_unwanted_and_clears_watch_if_removed() {
        let mut set = ChannelSet::new();
        let g = game("1");
        set.wanted_games.insert(g.clone(), 1);
        let online = channel("online", Some(&g), 5, false);
        let offline = channel("offline", None, 0, false);
        set.upsert(online);
        set.upsert(offline);
        set.set_watching(Some("offline".to_string()));

        let removed = set.retain(|c| c.online());
        assert_eq!(removed, vec!["offline".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(set.watching().is_none());
    }
}
