//! Inventory models for drops campaigns and timed drops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Channel;

/// A game on Twitch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    /// The display name - ViewerDropsDashboard uses "displayName", Inventory uses "name"
    #[serde(alias = "displayName", alias = "name", default)]
    pub display_name: String,
    #[serde(rename = "boxArtURL")]
    pub box_art_url: Option<String>,
    pub slug: Option<String>,
}

impl Game {
    /// Special-events pseudo-games participate in every campaign's channel ACL check.
    pub fn is_special_event(&self) -> bool {
        self.id == "509658" // "Special Events" game id on Twitch
    }
}

/// A drops campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropsCampaign {
    pub id: String,
    pub name: String,
    pub game: Game,
    #[serde(rename = "startAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "endAt")]
    pub ends_at: DateTime<Utc>,
    pub status: String,
    /// Time-based drops - not included in ViewerDropsDashboard, only in detailed view
    #[serde(rename = "timeBasedDrops", default)]
    pub time_based_drops: Vec<TimedDrop>,
    #[serde(rename = "self")]
    pub self_info: Option<CampaignSelfInfo>,
    /// Channels this campaign is restricted to (ACL). Empty means unrestricted.
    #[serde(rename = "allow", default)]
    pub allowed_channels: Option<CampaignAllowList>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAllowList {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl DropsCampaign {
    /// Check if the campaign is currently active.
    pub fn is_active(&self) -> bool {
        let now = Utc::now();
        self.starts_at <= now && now <= self.ends_at && self.status == "ACTIVE"
    }

    /// Check if the campaign is upcoming.
    pub fn is_upcoming(&self) -> bool {
        Utc::now() < self.starts_at
    }

    /// Check if the campaign has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.ends_at
    }

    /// `eligible`: linked to the viewer's account, or opted into badge/emote-only campaigns.
    pub fn eligible(&self, enable_badges_emotes: bool) -> bool {
        let linked = self
            .self_info
            .as_ref()
            .map(|s| s.is_account_connected)
            .unwrap_or(false);
        linked || (enable_badges_emotes && self.has_badge_or_emote())
    }

    /// Whether any drop in this campaign rewards a badge or emote rather than an entitlement.
    pub fn has_badge_or_emote(&self) -> bool {
        self.time_based_drops.iter().any(|d| {
            d.benefit_edges
                .iter()
                .any(|e| e.benefit.kind.is_badge_or_emote())
        })
    }

    /// `finished`: every drop is claimed, or has no required minutes (claimed by completion).
    pub fn finished(&self) -> bool {
        self.time_based_drops
            .iter()
            .all(|d| d.is_claimed() || d.required_minutes <= 0)
    }

    /// Get the total required minutes for all drops (max over each drop's precondition chain).
    pub fn total_required_minutes(&self) -> i32 {
        self.time_based_drops
            .iter()
            .map(|d| d.total_required_minutes(self))
            .max()
            .unwrap_or(0)
    }

    /// Remaining minutes for the whole campaign (max over each drop's chained remaining time).
    pub fn remaining_minutes(&self) -> f64 {
        self.time_based_drops
            .iter()
            .map(|d| d.total_remaining_minutes(self))
            .fold(0.0, f64::max)
    }

    /// Drops still requiring claim.
    pub fn remaining_drops(&self) -> Vec<&TimedDrop> {
        self.time_based_drops.iter().filter(|d| !d.is_claimed()).collect()
    }

    /// The set of all precondition drop ids referenced by unclaimed drops.
    pub fn preconditions_chain(&self) -> std::collections::HashSet<&str> {
        self.time_based_drops
            .iter()
            .filter(|d| !d.is_claimed())
            .flat_map(|d| d.precondition_drop_ids.iter().map(String::as_str))
            .collect()
    }

    /// Whether `channel` is allowed to progress this campaign: no ACL, or channel is listed;
    /// and either `ignore_channel_status` or the channel's game matches (or is a special event).
    fn base_can_earn(&self, channel: Option<&Channel>, ignore_channel_status: bool) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(channel) = channel else { return true };

        let acl_ok = self
            .allowed_channels
            .as_ref()
            .map(|l| l.channels.is_empty() || l.channels.iter().any(|c| c.id == channel.id))
            .unwrap_or(true);

        let game_ok = ignore_channel_status
            || channel
                .stream
                .as_ref()
                .map(|s| s.game.id == self.game.id)
                .unwrap_or(false)
            || self.game.is_special_event();

        acl_ok && game_ok
    }

    /// `can_earn`: the campaign is progressable on `channel` and has at least one earnable drop.
    pub fn can_earn(&self, channel: Option<&Channel>) -> bool {
        self.base_can_earn(channel, false)
            && self.time_based_drops.iter().any(|d| d.can_earn(self, channel, false))
    }

    /// Like `can_earn` but evaluated as of a future timestamp, ignoring the channel's game.
    pub fn can_earn_within(&self, stamp: DateTime<Utc>) -> bool {
        stamp < self.ends_at
            && self
                .time_based_drops
                .iter()
                .any(|d| d.can_earn(self, None, true))
    }

    /// The lowest-remaining-minutes drop that can currently be earned.
    pub fn first_drop(&self, channel: Option<&Channel>) -> Option<&TimedDrop> {
        self.time_based_drops
            .iter()
            .filter(|d| d.can_earn(self, channel, false))
            .min_by(|a, b| {
                a.total_remaining_minutes(self)
                    .partial_cmp(&b.total_remaining_minutes(self))
                    .unwrap()
            })
    }

    /// Get the first unclaimed drop (prioritizing lowest remaining minutes).
    pub fn first_unclaimed_drop(&self) -> Option<&TimedDrop> {
        self.time_based_drops
            .iter()
            .filter(|d| !d.is_claimed())
            .min_by(|a, b| {
                a.remaining_minutes()
                    .partial_cmp(&b.remaining_minutes())
                    .unwrap()
            })
    }

    /// Get the count of claimed drops.
    pub fn claimed_drops_count(&self) -> usize {
        self.time_based_drops
            .iter()
            .filter(|d| d.is_claimed())
            .count()
    }

    /// Get total number of drops.
    pub fn total_drops_count(&self) -> usize {
        self.time_based_drops.len()
    }

    /// Get overall campaign progress as a percentage (0.0 - 1.0).
    /// TwitchDropsMiner formula: average of ALL drops' individual progress.
    /// Claimed drops = 1.0 (100%), unclaimed drops = their individual progress.
    pub fn campaign_progress(&self) -> f64 {
        if self.time_based_drops.is_empty() {
            return 0.0;
        }

        let total_progress: f64 = self.time_based_drops.iter().map(|d| d.progress()).sum();

        total_progress / self.time_based_drops.len() as f64
    }

    /// Get the total remaining minutes for the campaign (sum of all unclaimed drops).
    pub fn campaign_remaining_minutes(&self) -> f64 {
        self.time_based_drops
            .iter()
            .filter(|d| !d.is_claimed())
            .map(|d| d.remaining_minutes())
            .sum()
    }

    /// Get the time remaining for the campaign as a formatted H:MM:SS string.
    pub fn time_remaining(&self) -> String {
        let remaining_secs = (self.campaign_remaining_minutes() * 60.0).round() as i32;
        let hours = remaining_secs / 3600;
        let mins = (remaining_secs % 3600) / 60;
        let secs = remaining_secs % 60;
        format!("{}:{:02}:{:02} remaining", hours, mins, secs)
    }

    /// Check if the campaign is fully completed (all drops claimed).
    pub fn is_completed(&self) -> bool {
        if self.time_based_drops.is_empty() {
            return false;
        }
        self.claimed_drops_count() == self.total_drops_count()
    }

    /// Increment local watch-time tracking on the first earnable drop. Returns `true` if any
    /// drop just hit `MAX_EXTRA_MINUTES`, meaning the caller should force a channel switch.
    pub fn bump_minutes(&mut self, channel: Option<&Channel>) -> bool {
        let earnable_id = self
            .first_drop(channel)
            .map(|d| d.id.clone());
        let Some(id) = earnable_id else { return false };
        if let Some(drop) = self.time_based_drops.iter_mut().find(|d| d.id == id) {
            drop.bump_extra_second()
        } else {
            false
        }
    }
}

/// Self-referential info about user's campaign status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSelfInfo {
    #[serde(rename = "isAccountConnected")]
    pub is_account_connected: bool,
}

/// A timed drop within a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedDrop {
    pub id: String,
    pub name: String,
    #[serde(rename = "requiredMinutesWatched")]
    pub required_minutes: i32,
    #[serde(rename = "startAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "endAt")]
    pub ends_at: DateTime<Utc>,
    #[serde(rename = "benefitEdges")]
    pub benefit_edges: Vec<BenefitEdge>,
    #[serde(rename = "self")]
    pub self_info: Option<DropSelfInfo>,
    /// Ids of drops that must be claimed before this one becomes earnable.
    #[serde(rename = "preconditionDrops", default)]
    pub precondition_drop_ids: Vec<String>,
    #[serde(skip)]
    pub extra_minutes: i32,
    #[serde(skip)]
    pub extra_seconds: i32,
    /// Claim token handed out by a websocket `drop-claim` event, or synthesized locally by the
    /// progress engine as `"<user_id>#<campaign_id>#<drop_id>"` when that event is lost.
    #[serde(skip)]
    pub claim_id: Option<String>,
}

impl TimedDrop {
    /// Get current watched minutes (base + local extra).
    /// Returns float to represent fractional minutes from seconds.
    pub fn current_minutes(&self) -> f64 {
        let base = self
            .self_info
            .as_ref()
            .map(|s| s.current_minutes_watched)
            .unwrap_or(0);
        base as f64 + self.extra_minutes as f64 + (self.extra_seconds as f64 / 60.0)
    }

    /// Get remaining minutes to complete the drop.
    pub fn remaining_minutes(&self) -> f64 {
        (self.required_minutes as f64 - self.current_minutes()).max(0.0)
    }

    /// Get progress as a percentage (0.0 - 1.0).
    pub fn progress(&self) -> f64 {
        if self.required_minutes == 0 {
            return 1.0;
        }
        (self.current_minutes() / self.required_minutes as f64).min(1.0)
    }

    /// Check if the drop has been claimed OR is at 100% (effectively complete).
    /// This is used by first_unclaimed_drop() to skip completed drops.
    pub fn is_claimed(&self) -> bool {
        let explicitly_claimed = self
            .self_info
            .as_ref()
            .map(|s| s.is_claimed)
            .unwrap_or(false);

        // Also consider as "claimed" if we're at 100% progress
        // This handles the case where claim succeeded but local data wasn't updated
        let at_full_progress =
            self.required_minutes > 0 && self.current_minutes() >= self.required_minutes as f64;

        explicitly_claimed || at_full_progress
    }

    /// Whether every precondition drop id is already claimed within `campaign`.
    pub fn preconditions_met(&self, campaign: &DropsCampaign) -> bool {
        self.precondition_drop_ids.iter().all(|id| {
            campaign
                .time_based_drops
                .iter()
                .find(|d| &d.id == id)
                .map(|d| d.is_claimed())
                .unwrap_or(true)
        })
    }

    /// Whether this drop can currently accumulate progress: preconditions met, not claimed,
    /// within its own activity window, extra tracking hasn't hit the cap, and the enclosing
    /// channel/game check passes.
    pub fn can_earn(&self, campaign: &DropsCampaign, channel: Option<&Channel>, ignore_channel_status: bool) -> bool {
        let now = Utc::now();
        self.preconditions_met(campaign)
            && !self.is_claimed()
            && self.required_minutes > 0
            && self.extra_minutes < crate::constants::MAX_EXTRA_MINUTES
            && self.starts_at <= now
            && now < self.ends_at
            && campaign.base_can_earn(channel, ignore_channel_status)
    }

    /// Whether this drop is ready to be claimed (campaign may still be open for a 24h grace
    /// window after `ends_at`).
    pub fn can_claim(&self) -> bool {
        if let Some(info) = &self.self_info {
            info.current_minutes_watched >= self.required_minutes
                && !info.is_claimed
                && info.drop_instance_id.is_some()
        } else {
            false
        }
    }

    /// Get the drop instance ID for claiming.
    pub fn drop_instance_id(&self) -> Option<&str> {
        self.self_info
            .as_ref()
            .and_then(|s| s.drop_instance_id.as_deref())
    }

    /// §4.6 `can_claim`: a claim id is held, the drop isn't already claimed, and the campaign's
    /// 24h post-expiry grace window hasn't closed.
    pub fn can_claim_for_campaign(&self, campaign: &DropsCampaign) -> bool {
        self.claim_id.is_some()
            && !self.is_claimed()
            && Utc::now() < campaign.ends_at + chrono::Duration::hours(24)
    }

    /// Record the claim id delivered by a websocket `drop-claim` event (or synthesized
    /// locally, see `generate_claim_id`).
    pub fn set_claim_id(&mut self, claim_id: String) {
        self.claim_id = Some(claim_id);
    }

    /// Set the authoritative watched-minutes count from a websocket `drop-progress` event or a
    /// GraphQL `CurrentDrop` read, resetting the local `extra` estimator.
    pub fn set_real_minutes(&mut self, minutes: i32) {
        match self.self_info.as_mut() {
            Some(info) => info.current_minutes_watched = minutes,
            None => {
                self.self_info = Some(DropSelfInfo {
                    current_minutes_watched: minutes,
                    is_claimed: false,
                    drop_instance_id: None,
                })
            }
        }
        self.extra_minutes = 0;
        self.extra_seconds = 0;
    }

    /// Mark the drop claimed after a successful `ClaimDrop` call: `real_current_minutes <-
    /// required_minutes`, `extra <- 0`, `is_claimed <- true`.
    pub fn mark_claimed(&mut self) {
        let required = self.required_minutes;
        match self.self_info.as_mut() {
            Some(info) => {
                info.current_minutes_watched = required;
                info.is_claimed = true;
            }
            None => {
                self.self_info = Some(DropSelfInfo {
                    current_minutes_watched: required,
                    is_claimed: true,
                    drop_instance_id: None,
                })
            }
        }
        self.extra_minutes = 0;
        self.extra_seconds = 0;
        self.claim_id = None;
    }

    /// Synthesize a claim id in the shape Twitch expects when the API hasn't handed one back
    /// directly: `"<user_id>#<campaign_id>#<drop_id>"`.
    pub fn generate_claim_id(&self, user_id: u64, campaign_id: &str) -> String {
        format!("{}#{}#{}", user_id, campaign_id, self.id)
    }

    /// Format the remaining time as H:MM:SS like TwitchDropsMiner.
    pub fn time_remaining_display(&self) -> String {
        let remaining_secs = (self.remaining_minutes() * 60.0).round() as i32;
        let hours = remaining_secs / 3600;
        let mins = (remaining_secs % 3600) / 60;
        let secs = remaining_secs % 60;
        format!(
            "{} {:02}:{:02}:{:02} remaining",
            if remaining_secs <= 0 { "Done!" } else { "" },
            hours,
            mins,
            secs
        )
        .trim()
        .to_string()
    }

    /// Total required minutes including precondition drops, chained recursively.
    pub fn total_required_minutes(&self, campaign: &DropsCampaign) -> i32 {
        let preconditions_max = self
            .precondition_drop_ids
            .iter()
            .filter_map(|id| campaign.time_based_drops.iter().find(|d| &d.id == id))
            .map(|d| d.total_required_minutes(campaign))
            .max()
            .unwrap_or(0);
        preconditions_max + self.required_minutes
    }

    /// Total remaining minutes including any precondition drops, chained recursively.
    pub fn total_remaining_minutes(&self, campaign: &DropsCampaign) -> f64 {
        let preconditions_max = self
            .precondition_drop_ids
            .iter()
            .filter_map(|id| campaign.time_based_drops.iter().find(|d| &d.id == id))
            .map(|d| d.total_remaining_minutes(campaign))
            .fold(0.0, f64::max);
        preconditions_max + self.remaining_minutes()
    }

    /// Minutes-per-minute availability: how much slack remains before `ends_at` relative to
    /// the chained remaining time. `f64::INFINITY` when there's nothing left to do.
    pub fn availability(&self, campaign: &DropsCampaign) -> f64 {
        let remaining = self.total_remaining_minutes(campaign);
        let required = self.total_required_minutes(campaign);
        let now = Utc::now();
        if required > 0 && remaining > 0.0 && now < self.ends_at {
            (self.ends_at - now).num_minutes() as f64 / remaining
        } else {
            f64::INFINITY
        }
    }

    /// Bump extra minutes locally.
    pub fn bump_extra_minute(&mut self) {
        if self.extra_minutes < crate::constants::MAX_EXTRA_MINUTES {
            self.extra_minutes += 1;
        }
    }

    /// Bump extra seconds locally. Returns `true` if this bump reached `MAX_EXTRA_MINUTES`.
    pub fn bump_extra_second(&mut self) -> bool {
        if self.extra_minutes < crate::constants::MAX_EXTRA_MINUTES {
            self.extra_seconds += 1;
            if self.extra_seconds >= 60 {
                self.extra_minutes += 1;
                self.extra_seconds = 0;
            }
        }
        self.extra_minutes >= crate::constants::MAX_EXTRA_MINUTES
    }

    /// Reset extra minutes (e.g. after API refresh).
    pub fn reset_local_tracking(&mut self) {
        self.extra_minutes = 0;
        self.extra_seconds = 0;
    }
}

/// Self-referential info about user's drop progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSelfInfo {
    #[serde(rename = "currentMinutesWatched")]
    pub current_minutes_watched: i32,
    #[serde(rename = "isClaimed")]
    pub is_claimed: bool,
    #[serde(rename = "dropInstanceID")]
    pub drop_instance_id: Option<String>,
}

/// A benefit edge (reward info).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitEdge {
    pub benefit: Benefit,
}

/// What kind of reward a benefit grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BenefitKind {
    Badge,
    Emote,
    DirectEntitlement,
    #[serde(other)]
    #[default]
    Unknown,
}

impl BenefitKind {
    pub fn is_badge_or_emote(&self) -> bool {
        matches!(self, BenefitKind::Badge | BenefitKind::Emote)
    }
}

/// A benefit (reward).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub id: String,
    pub name: String,
    #[serde(rename = "imageAssetURL")]
    pub image_url: Option<String>,
    #[serde(rename = "benefitType", default)]
    pub kind: BenefitKind,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn drop(id: &str, required: i32, preconditions: Vec<&str>) -> TimedDrop {
        TimedDrop {
            id: id.to_string(),
            name: format!("Drop {}", id),
            required_minutes: required,
            starts_at: Utc::now() - chrono::Duration::days(1),
            ends_at: Utc::now() + chrono::Duration::days(1),
            benefit_edges: vec![],
            self_info: None,
            precondition_drop_ids: preconditions.into_iter().map(String::from).collect(),
            extra_minutes: 0,
            extra_seconds: 0,
            claim_id: None,
        }
    }

    fn campaign(drops: Vec<TimedDrop>) -> DropsCampaign {
        DropsCampaign {
            id: "c1".to_string(),
            name: "Campaign".to_string(),
            game: Game {
                id: "g1".to_string(),
                display_name: "Game".to_string(),
                box_art_url: None,
                slug: None,
            },
            starts_at: Utc::now() - chrono::Duration::days(1),
            ends_at: Utc::now() + chrono::Duration::days(1),
            status: "ACTIVE".to_string(),
            time_based_drops: drops,
            self_info: None,
            allowed_channels: None,
        }
    }

    #[test]
    fn test_campaign_parsing() {
        let json = r#"{
            "id": "campaign-123",
            "name": "Test Campaign",
            "game": {
                "id": "game-456",
                "name": "Test Game"
            },
            "startAt": "2024-01-01T00:00:00Z",
            "endAt": "2024-12-31T23:59:59Z",
            "status": "ACTIVE",
            "timeBasedDrops": []
        }"#;

        let campaign: DropsCampaign = serde_json::from_str(json).unwrap();
        assert_eq!(campaign.id, "campaign-123");
        assert_eq!(campaign.game.display_name, "Test Game");
        assert_eq!(campaign.status, "ACTIVE");
    }

    #[test]
    fn test_timed_drop_progress() {
        let mut d = drop("d1", 60, vec![]);
        d.self_info = Some(DropSelfInfo {
            current_minutes_watched: 30,
            is_claimed: false,
            drop_instance_id: None,
        });

        assert_eq!(d.current_minutes(), 30.0);
        assert_eq!(d.remaining_minutes(), 30.0);
        assert!((d.progress() - 0.5).abs() < 0.001);
        assert!(!d.is_claimed());
        assert!(!d.can_claim());
    }

    #[test]
    fn test_drop_can_claim() {
        let mut d = drop("d1", 60, vec![]);
        d.self_info = Some(DropSelfInfo {
            current_minutes_watched: 60,
            is_claimed: false,
            drop_instance_id: Some("instance-123".to_string()),
        });

        assert!(d.can_claim());
        assert_eq!(d.drop_instance_id(), Some("instance-123"));
    }

    #[test]
    fn test_precondition_chain_adds_required_minutes() {
        let pre = drop("pre", 30, vec![]);
        let main = drop("main", 60, vec!["pre"]);
        let c = campaign(vec![pre, main]);

        let main_drop = c.time_based_drops.iter().find(|d| d.id == "main").unwrap();
        assert_eq!(main_drop.total_required_minutes(&c), 90);
    }

    #[test]
    fn test_preconditions_met_blocks_earning() {
        let pre = drop("pre", 30, vec![]);
        let main = drop("main", 60, vec!["pre"]);
        let c = campaign(vec![pre, main]);

        let main_drop = c.time_based_drops.iter().find(|d| d.id == "main").unwrap();
        assert!(!main_drop.preconditions_met(&c));
        assert!(!main_drop.can_earn(&c, None, true));
    }

    #[test]
    fn test_preconditions_met_once_claimed() {
        let mut pre = drop("pre", 30, vec![]);
        pre.self_info = Some(DropSelfInfo {
            current_minutes_watched: 30,
            is_claimed: true,
            drop_instance_id: None,
        });
        let main = drop("main", 60, vec!["pre"]);
        let c = campaign(vec![pre, main]);

        let main_drop = c.time_based_drops.iter().find(|d| d.id == "main").unwrap();
        assert!(main_drop.preconditions_met(&c));
        assert!(main_drop.can_earn(&c, None, true));
    }

    #[test]
    fn test_campaign_total_minutes() {
        let c = campaign(vec![drop("d1", 30, vec![]), drop("d2", 60, vec![])]);
        assert_eq!(c.total_required_minutes(), 60);
    }

    #[test]
    fn test_generate_claim_id() {
        let d = drop("drop-9", 60, vec![]);
        assert_eq!(d.generate_claim_id(42, "campaign-7"), "42#campaign-7#drop-9");
    }

    #[test]
    fn test_benefit_kind_defaults_unknown() {
        let json = r#"{"id":"b1","name":"Badge","imageAssetURL":null}"#;
        let benefit: Benefit = serde_json::from_str(json).unwrap();
        assert_eq!(benefit.kind, BenefitKind::Unknown);
        assert!(!benefit.kind.is_badge_or_emote());
    }

    #[test]
    fn test_campaign_finished_when_all_claimed() {
        let mut d = drop("d1", 30, vec![]);
        d.self_info = Some(DropSelfInfo {
            current_minutes_watched: 30,
            is_claimed: true,
            drop_instance_id: None,
        });
        let c = campaign(vec![d]);
        assert!(c.finished());
    }
}

/// A drop reward from game event drops (claimed items).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEventDrop {
    pub id: String,
    pub name: String,
    #[serde(rename = "lastAwardedAt")]
    pub last_awarded_at: DateTime<Utc>,
    #[serde(rename = "totalCount")]
    pub total_count: i32,
}

/// Inventory containing various campaign types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(rename = "dropCampaignsInProgress")]
    pub drop_campaigns_in_progress: Option<Vec<DropsCampaign>>,
    #[serde(rename = "gameEventDrops")]
    pub game_event_drops: Option<Vec<GameEventDrop>>,
}
