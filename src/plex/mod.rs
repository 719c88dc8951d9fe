use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use error_stack::{IntoReport, ResultExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use crate::config::AppConfig;
use crate::plex::models::{MediaItem, Playlist, PlaylistType, Section};

pub mod account;
pub mod api;
#[cfg(test)]
pub mod fake;
pub mod models;
pub mod server;

#[derive(Debug)]
pub struct PlexError;

impl fmt::Display for PlexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plex error")
    }
}

impl std::error::Error for PlexError {}

pub type PlexResult<T> = error_stack::Result<T, PlexError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side operations the organizer needs from a Plex Media Server.
#[async_trait]
pub trait MediaServer {
    /// Server name shown to the user.
    fn name(&self) -> &str;

    async fn playlists(&self) -> PlexResult<Vec<Playlist>>;

    async fn playlist_items(&self, playlist: &Playlist) -> PlexResult<Vec<MediaItem>>;

    /// Moves `item` right after `after`, or to the top when `after` is `None`.
    async fn move_item(
        &self,
        playlist: &Playlist,
        item: &MediaItem,
        after: Option<&MediaItem>,
    ) -> PlexResult<()>;

    async fn create_playlist(
        &self,
        title: &str,
        summary: &str,
        playlist_type: PlaylistType,
        items: &[MediaItem],
    ) -> PlexResult<Playlist>;

    /// Appends `items` to the end of the playlist.
    async fn add_items(&self, playlist: &Playlist, items: &[MediaItem]) -> PlexResult<()>;

    async fn remove_item(&self, playlist: &Playlist, item: &MediaItem) -> PlexResult<()>;

    /// Tracks of every library whose title contains `title`.
    async fn search_tracks(&self, title: &str) -> PlexResult<Vec<MediaItem>>;

    async fn sections(&self) -> PlexResult<Vec<Section>>;

    async fn albums(&self, section: &Section) -> PlexResult<Vec<MediaItem>>;

    async fn album_tracks(&self, album: &MediaItem) -> PlexResult<Vec<MediaItem>>;
}

/// Builds an HTTP client carrying the `X-Plex-*` identification headers.
pub fn build_client(client_identifier: &str, token: Option<&str>) -> PlexResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert("X-Plex-Product", HeaderValue::from_static(AppConfig::PRODUCT));
    headers.insert("X-Plex-Version", HeaderValue::from_static(AppConfig::VERSION));
    headers.insert(
        "X-Plex-Platform",
        HeaderValue::from_static(std::env::consts::OS),
    );
    headers.insert(
        "X-Plex-Client-Identifier",
        HeaderValue::from_str(client_identifier)
            .into_report()
            .attach_printable("Client identifier is not a valid header value")
            .change_context(PlexError)?,
    );
    if let Some(token) = token {
        let mut token = HeaderValue::from_str(token)
            .into_report()
            .attach_printable("Token is not a valid header value")
            .change_context(PlexError)?;
        token.set_sensitive(true);
        headers.insert("X-Plex-Token", token);
    }
    Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .into_report()
        .change_context(PlexError)
}
