//! Channel and Stream models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::inventory::Game;

/// A Twitch channel. Equality and hashing are by `id` only, matching the API's identity
/// semantics: two `Channel` values with the same id are the same channel even if their
/// `stream` snapshots differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "login")]
    pub login: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "profileImageURL")]
    pub profile_image_url: Option<String>,
    /// Present iff the channel is currently live. `online()` is just `stream.is_some()`.
    #[serde(default)]
    pub stream: Option<Box<Stream>>,
    /// Whether this channel is on a campaign's restricted allow-list (vs. open to anyone).
    #[serde(default)]
    pub acl_based: bool,
    /// Lazily scraped spade beacon URL, cached once resolved via `Watcher::fetch_spade_url`.
    #[serde(default)]
    pub spade_url: Option<String>,
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Channel {}

impl std::hash::Hash for Channel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Channel {
    /// Get the channel's display name, falling back to login.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.login)
    }

    /// Get the channel URL.
    pub fn url(&self) -> String {
        format!("https://www.twitch.tv/{}", self.login)
    }

    /// Whether the channel currently has a live stream attached.
    pub fn online(&self) -> bool {
        self.stream.is_some()
    }

    /// Mark the channel online with a freshly observed stream snapshot.
    pub fn set_online(&mut self, stream: Stream) {
        self.stream = Some(Box::new(stream));
    }

    /// Mark the channel offline, as driven by a websocket `stream-down` event.
    pub fn set_offline(&mut self) {
        self.stream = None;
    }
}

/// A live stream snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    /// The stream/broadcast id, distinct from the channel id.
    #[serde(alias = "id")]
    pub broadcast_id: String,
    pub game: Game,
    #[serde(rename = "viewersCount")]
    pub viewers: i32,
    pub title: Option<String>,
    /// Whether this stream carries the drops-enabled tag.
    #[serde(default)]
    pub drops_enabled: bool,
    /// When we first observed this stream online, used for the `ONLINE_DELAY` grace period.
    #[serde(skip, default = "Utc::now")]
    pub started_observing_at: DateTime<Utc>,
}

impl Stream {
    /// Check if the stream is playing a specific game.
    pub fn is_playing_game(&self, game_name: &str) -> bool {
        self.game.display_name.eq_ignore_ascii_case(game_name)
    }

    /// Whether `ONLINE_DELAY` has elapsed since this stream was first observed, i.e. it's
    /// stable enough to switch onto rather than a flicker.
    pub fn past_online_delay(&self) -> bool {
        Utc::now() - self.started_observing_at
            >= chrono::Duration::from_std(crate::constants::ONLINE_DELAY).unwrap()
    }
}

/// Stream status from WebSocket events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Online,
    Offline,
}

/// Parsed channel info from directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryChannel {
    pub id: String,
    pub login: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "viewersCount")]
    pub viewers: i32,
    pub title: Option<String>,
    #[serde(rename = "dropsEnabled")]
    pub drops_enabled: bool,
}

impl DirectoryChannel {
    /// Convert to a Channel.
    pub fn to_channel(&self) -> Channel {
        Channel {
            id: self.id.clone(),
            login: self.login.clone(),
            display_name: Some(self.display_name.clone()),
            profile_image_url: None,
            stream: None,
            acl_based: false,
            spade_url: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_channel(id: &str, login: &str, display_name: Option<&str>) -> Channel {
        Channel {
            id: id.to_string(),
            login: login.to_string(),
            display_name: display_name.map(String::from),
            profile_image_url: None,
            stream: None,
            acl_based: false,
            spade_url: None,
        }
    }

    #[test]
    fn test_channel_name() {
        let channel = bare_channel("123", "testuser", Some("Test User"));
        assert_eq!(channel.name(), "Test User");

        let channel_no_display = bare_channel("123", "testuser", None);
        assert_eq!(channel_no_display.name(), "testuser");
    }

    #[test]
    fn test_channel_url() {
        let channel = bare_channel("123", "streamer", None);
        assert_eq!(channel.url(), "https://www.twitch.tv/streamer");
    }

    #[test]
    fn test_channel_equality_is_by_id_only() {
        let mut a = bare_channel("123", "streamer", None);
        let b = bare_channel("123", "streamer", Some("Different Display"));
        assert_eq!(a, b);

        a.set_online(Stream {
            broadcast_id: "b1".to_string(),
            game: Game {
                id: "g1".to_string(),
                display_name: "Fortnite".to_string(),
                box_art_url: None,
                slug: None,
            },
            viewers: 10,
            title: None,
            drops_enabled: true,
            started_observing_at: Utc::now(),
        });
        assert!(a.online());
        assert_eq!(a, b, "online()-ness must not affect identity equality");
    }

    #[test]
    fn test_stream_is_playing_game() {
        let stream = Stream {
            broadcast_id: "stream-1".to_string(),
            game: Game {
                id: "game-1".to_string(),
                display_name: "Fortnite".to_string(),
                box_art_url: None,
                slug: None,
            },
            viewers: 1000,
            title: Some("Playing Fortnite!".to_string()),
            drops_enabled: true,
            started_observing_at: Utc::now(),
        };

        assert!(stream.is_playing_game("Fortnite"));
        assert!(stream.is_playing_game("fortnite")); // case insensitive
        assert!(!stream.is_playing_game("Minecraft"));
    }

    #[test]
    fn test_directory_channel_parsing() {
        let json = r#"{
            "id": "12345",
            "login": "streamer",
            "displayName": "Cool Streamer",
            "viewersCount": 5000,
            "title": "Playing games!",
            "dropsEnabled": true
        }"#;

        let dir_channel: DirectoryChannel = serde_json::from_str(json).unwrap();
        assert_eq!(dir_channel.login, "streamer");
        assert!(dir_channel.drops_enabled);

        let channel = dir_channel.to_channel();
        assert_eq!(channel.name(), "Cool Streamer");
        assert!(!channel.online());
    }
}
