use std::fmt;

use colored::Colorize;
use error_stack::ResultExt;

use crate::plex::models::{MediaItem, Playlist};
use crate::plex::MediaServer;

pub mod analyze;
pub mod commands;
pub mod sort;
pub mod upgrade;

#[derive(Debug)]
pub struct OrganizerError;

impl fmt::Display for OrganizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Organizer error")
    }
}

impl std::error::Error for OrganizerError {}

pub type OrganizerResult<T> = error_stack::Result<T, OrganizerError>;

/// How a wizard step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Done,
    Aborted,
}

pub const DUPLICATE_PREFIX: &str = "Copy of ";

/// Creates `Copy of <title>` holding `items` in the given order.
pub async fn duplicate_playlist<S: MediaServer>(
    server: &S,
    playlist: &Playlist,
    items: &[MediaItem],
) -> OrganizerResult<Playlist> {
    let title = format!("{}{}", DUPLICATE_PREFIX, playlist.title);
    println!("Creating new playlist {}...", title.clone().cyan());
    let new_playlist = server
        .create_playlist(&title, &playlist.summary, playlist.playlist_type, items)
        .await
        .attach_printable(format!("Failed to create playlist {}", title))
        .change_context(OrganizerError)?;
    log::debug!(
        "Created playlist {} ({})",
        new_playlist.title,
        new_playlist.rating_key
    );
    Ok(new_playlist)
}
