//! In-memory [`MediaServer`] used by the organizer tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use error_stack::Report;

use crate::plex::models::{Media, MediaItem, Playlist, PlaylistType, Section};
use crate::plex::{MediaServer, PlexError, PlexResult};

#[derive(Default)]
struct State {
    playlists: Vec<Playlist>,
    entries: HashMap<String, Vec<MediaItem>>,
    library: Vec<MediaItem>,
    sections: Vec<Section>,
    albums: HashMap<String, Vec<MediaItem>>,
    album_tracks: HashMap<String, Vec<MediaItem>>,
    next_id: u64,
}

#[derive(Default)]
pub struct FakeServer {
    state: Mutex<State>,
    /// Titles whose search fails.
    pub failing_searches: Vec<String>,
}

pub fn track(rating_key: &str, title: &str, artist: &str, codec: &str, bitrate: u32) -> MediaItem {
    MediaItem {
        rating_key: rating_key.to_string(),
        item_type: Some("track".to_string()),
        title: Some(title.to_string()),
        grandparent_title: Some(artist.to_string()),
        media: vec![Media {
            bitrate: Some(bitrate),
            audio_codec: Some(codec.to_string()),
            duration: Some(200_000),
        }],
        ..Default::default()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(self, library: Vec<MediaItem>) -> Self {
        self.state.lock().unwrap().library = library;
        self
    }

    pub fn with_album(self, section: Section, album: MediaItem, tracks: Vec<MediaItem>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if !state.sections.contains(&section) {
                state.sections.push(section.clone());
            }
            state
                .albums
                .entry(section.key.clone())
                .or_default()
                .push(album.clone());
            state.album_tracks.insert(album.rating_key, tracks);
        }
        self
    }

    /// Stores a playlist and assigns playlist entry ids to `items`.
    pub fn add_playlist(&self, title: &str, playlist_type: PlaylistType, items: Vec<MediaItem>) -> Playlist {
        let mut state = self.state.lock().unwrap();
        let rating_key = format!("pl-{}", state.playlists.len() + 1);
        let playlist = Playlist {
            rating_key: rating_key.clone(),
            title: title.to_string(),
            summary: String::new(),
            smart: false,
            playlist_type,
            leaf_count: Some(items.len() as u32),
        };
        let entries = items
            .into_iter()
            .map(|item| {
                state.next_id += 1;
                MediaItem {
                    playlist_item_id: Some(state.next_id),
                    ..item
                }
            })
            .collect();
        state.entries.insert(rating_key, entries);
        state.playlists.push(playlist.clone());
        playlist
    }

    pub fn titles(&self, playlist: &Playlist) -> Vec<String> {
        self.state.lock().unwrap().entries[&playlist.rating_key]
            .iter()
            .map(|item| item.title().to_string())
            .collect()
    }

    pub fn rating_keys(&self, playlist: &Playlist) -> Vec<String> {
        self.state.lock().unwrap().entries[&playlist.rating_key]
            .iter()
            .map(|item| item.rating_key.clone())
            .collect()
    }

    pub fn playlist_count(&self) -> usize {
        self.state.lock().unwrap().playlists.len()
    }

    fn entry_index(entries: &[MediaItem], item: &MediaItem) -> PlexResult<usize> {
        entries
            .iter()
            .position(|entry| {
                entry.playlist_item_id.is_some() && entry.playlist_item_id == item.playlist_item_id
            })
            .ok_or_else(|| Report::new(PlexError).attach_printable("Unknown playlist entry"))
    }
}

#[async_trait]
impl MediaServer for FakeServer {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn playlists(&self) -> PlexResult<Vec<Playlist>> {
        Ok(self.state.lock().unwrap().playlists.clone())
    }

    async fn playlist_items(&self, playlist: &Playlist) -> PlexResult<Vec<MediaItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .entries
            .get(&playlist.rating_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn move_item(
        &self,
        playlist: &Playlist,
        item: &MediaItem,
        after: Option<&MediaItem>,
    ) -> PlexResult<()> {
        let mut state = self.state.lock().unwrap();
        let entries = state
            .entries
            .get_mut(&playlist.rating_key)
            .ok_or_else(|| Report::new(PlexError).attach_printable("Unknown playlist"))?;
        let from = Self::entry_index(entries, item)?;
        let moved = entries.remove(from);
        let to = match after {
            Some(after) => Self::entry_index(entries, after)? + 1,
            None => 0,
        };
        entries.insert(to, moved);
        Ok(())
    }

    async fn create_playlist(
        &self,
        title: &str,
        summary: &str,
        playlist_type: PlaylistType,
        items: &[MediaItem],
    ) -> PlexResult<Playlist> {
        let mut playlist = self.add_playlist(title, playlist_type, items.to_vec());
        playlist.summary = summary.to_string();
        Ok(playlist)
    }

    async fn add_items(&self, playlist: &Playlist, items: &[MediaItem]) -> PlexResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut next_id = state.next_id;
        let entries = state
            .entries
            .get_mut(&playlist.rating_key)
            .ok_or_else(|| Report::new(PlexError).attach_printable("Unknown playlist"))?;
        for item in items {
            next_id += 1;
            entries.push(MediaItem {
                playlist_item_id: Some(next_id),
                ..item.clone()
            });
        }
        state.next_id = next_id;
        Ok(())
    }

    async fn remove_item(&self, playlist: &Playlist, item: &MediaItem) -> PlexResult<()> {
        let mut state = self.state.lock().unwrap();
        let entries = state
            .entries
            .get_mut(&playlist.rating_key)
            .ok_or_else(|| Report::new(PlexError).attach_printable("Unknown playlist"))?;
        let index = Self::entry_index(entries, item)?;
        entries.remove(index);
        Ok(())
    }

    async fn search_tracks(&self, title: &str) -> PlexResult<Vec<MediaItem>> {
        if self.failing_searches.iter().any(|failing| failing == title) {
            return Err(Report::new(PlexError).attach_printable("Search failed"));
        }
        let needle = title.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .library
            .iter()
            .filter(|item| item.title().to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn sections(&self) -> PlexResult<Vec<Section>> {
        Ok(self.state.lock().unwrap().sections.clone())
    }

    async fn albums(&self, section: &Section) -> PlexResult<Vec<MediaItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .albums
            .get(&section.key)
            .cloned()
            .unwrap_or_default())
    }

    async fn album_tracks(&self, album: &MediaItem) -> PlexResult<Vec<MediaItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .album_tracks
            .get(&album.rating_key)
            .cloned()
            .unwrap_or_default())
    }
}
