use std::fmt;

use serde::Deserialize;

/// Codecs that are treated as lossless by the upgrade logic.
pub const LOSSLESS_CODECS: [&str; 2] = ["flac", "alac"];

/// Every Plex Media Server JSON response is wrapped in a `MediaContainer`.
#[derive(Debug, Deserialize, Clone)]
pub struct ContainerResponse<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetadataContainer<T> {
    #[serde(rename = "Metadata", default = "Vec::new")]
    pub metadata: Vec<T>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryContainer<T> {
    #[serde(rename = "Directory", default = "Vec::new")]
    pub directory: Vec<T>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub machine_identifier: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaylistType {
    Audio,
    Video,
    Photo,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub rating_key: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub smart: bool,
    pub playlist_type: PlaylistType,
    #[serde(default)]
    pub leaf_count: Option<u32>,
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
}

/// A track, movie or episode as returned in a `Metadata` array.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub rating_key: String,
    #[serde(rename = "playlistItemID", default)]
    pub playlist_item_id: Option<u64>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_sort: Option<String>,
    /// Track artist, when it differs from the album artist.
    #[serde(default)]
    pub original_title: Option<String>,
    /// Album artist for tracks, show title for episodes.
    #[serde(default)]
    pub grandparent_title: Option<String>,
    /// Album title for tracks.
    #[serde(default)]
    pub parent_title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub originally_available_at: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
}

impl MediaItem {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Track artist, falling back to the album artist.
    pub fn artist(&self) -> &str {
        self.original_title
            .as_deref()
            .or(self.grandparent_title.as_deref())
            .unwrap_or_default()
    }

    pub fn is_audio(&self) -> bool {
        self.item_type.as_deref() == Some("track")
    }

    pub fn bitrate(&self) -> Option<u32> {
        self.media.first().and_then(|media| media.bitrate)
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.media
            .first()
            .and_then(|media| media.audio_codec.as_deref())
    }

    pub fn is_lossless(&self) -> bool {
        self.audio_codec()
            .map(|codec| LOSSLESS_CODECS.contains(&codec.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn media_duration(&self) -> Option<u64> {
        self.media
            .first()
            .and_then(|media| media.duration)
            .or(self.duration)
    }

    /// One-line description of a track, e.g. `Artist - Title (Album) [03:25][flac][1011]`.
    pub fn to_audio_string(&self) -> String {
        format!(
            "{} - {} ({}) [{}][{}][{}]",
            self.artist(),
            self.title(),
            self.parent_title.as_deref().unwrap_or_default(),
            duration_to_str(self.media_duration().unwrap_or_default()),
            self.audio_codec().unwrap_or("?"),
            self.bitrate()
                .map(|bitrate| bitrate.to_string())
                .unwrap_or_else(|| "?".to_string()),
        )
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_audio_string())
    }
}

/// Library section (`/library/sections`).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Section {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Converts milliseconds to `mm:ss`.
pub fn duration_to_str(duration: u64) -> String {
    let seconds = duration / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Account-level models served by plex.tv.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlexUser {
    #[serde(default)]
    pub username: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub uri: String,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub relay: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub client_identifier: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Resource {
    pub fn is_media_server(&self) -> bool {
        self.product == "Plex Media Server"
    }

    /// Connections in the order they should be tried: local, remote, then relay.
    pub fn ordered_connections(&self) -> Vec<&Connection> {
        let mut connections = self.connections.iter().collect::<Vec<_>>();
        connections.sort_by_key(|connection| (connection.relay, !connection.local));
        connections
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlexTvErrors {
    #[serde(default)]
    pub errors: Vec<PlexTvError>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlexTvError {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}
