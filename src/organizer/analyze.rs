use colored::Colorize;
use error_stack::{IntoReport, ResultExt};
use indicatif::{ProgressBar, ProgressStyle};

use crate::organizer::upgrade::{meets_quality_requirements, UpgradeOptions};
use crate::organizer::{OrganizerError, OrganizerResult};
use crate::plex::models::{MediaItem, Playlist, Section};
use crate::plex::MediaServer;

/// Audio items whose bitrate is strictly below `threshold`, in playlist order.
/// Items without a known bitrate are left out.
pub fn below_threshold(items: &[MediaItem], threshold: u32) -> Vec<&MediaItem> {
    items
        .iter()
        .filter(|item| item.is_audio())
        .filter(|item| matches!(item.bitrate(), Some(bitrate) if bitrate < threshold))
        .collect()
}

pub async fn analyze_playlist<S: MediaServer>(
    server: &S,
    playlist: &Playlist,
    threshold: u32,
) -> OrganizerResult<Vec<MediaItem>> {
    println!("Preparing playlist items...");
    let items = server
        .playlist_items(playlist)
        .await
        .attach_printable(format!("Failed to read the items of {}", playlist.title))
        .change_context(OrganizerError)?;
    let low = below_threshold(&items, threshold)
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();

    if low.is_empty() {
        println!(
            "All tracks of {} have a bitrate of at least {} kbps.",
            playlist.title.clone().green(),
            threshold
        );
    } else {
        println!(
            "Tracks of {} below {} kbps:",
            playlist.title.clone().cyan(),
            threshold
        );
        for item in &low {
            println!("❌ {}", item);
        }
        println!(
            "{} of {} tracks are below the threshold.",
            low.len().to_string().red(),
            items.len()
        );
    }
    Ok(low)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LowBitrateAlbum {
    pub album: MediaItem,
    /// First track of the album that fails the quality requirements.
    pub track: MediaItem,
}

/// Scans every album of a music section and reports those holding a low quality track.
pub async fn low_bitrate_albums<S: MediaServer>(
    server: &S,
    section: &Section,
    options: &UpgradeOptions,
) -> OrganizerResult<Vec<LowBitrateAlbum>> {
    println!("Reading albums of {}...", section.title.clone().cyan());
    let albums = server
        .albums(section)
        .await
        .attach_printable(format!("Failed to read the albums of {}", section.title))
        .change_context(OrganizerError)?;

    let pb = ProgressBar::new(albums.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.white/blue}] {pos}/{len}")
            .into_report()
            .change_context(OrganizerError)?
            .progress_chars("█  "),
    );
    let mut found = vec![];
    for album in albums {
        pb.inc(1);
        let tracks = match server.album_tracks(&album).await {
            Ok(tracks) => tracks,
            Err(report) => {
                log::warn!("Skipping album {}: {:?}", album.title(), report);
                continue;
            }
        };
        if let Some(track) = tracks
            .into_iter()
            .find(|track| track.is_audio() && !meets_quality_requirements(track, options))
        {
            found.push(LowBitrateAlbum { album, track });
        }
    }
    pb.finish_and_clear();

    if found.is_empty() {
        println!("No albums with low bitrate tracks found.");
    } else {
        println!("Albums with low bitrate tracks:");
        for entry in &found {
            println!(
                "❌ {} - {} [{}][{}]",
                entry.track.artist(),
                entry.album.title().yellow(),
                entry.track.audio_codec().unwrap_or("?"),
                entry
                    .track
                    .bitrate()
                    .map(|bitrate| bitrate.to_string())
                    .unwrap_or_else(|| "?".to_string()),
            );
        }
    }
    Ok(found)
}
