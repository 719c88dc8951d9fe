use std::cmp::Ordering;

use colored::Colorize;
use error_stack::{IntoReport, ResultExt};
use lazy_regex::regex;

use crate::config::UpgradeConfig;
use crate::dialoguer::Choice;
use crate::organizer::sort::sortable_term;
use crate::organizer::{duplicate_playlist, OrganizerError, OrganizerResult};
use crate::plex::models::{MediaItem, Playlist};
use crate::plex::MediaServer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Treat every track as upgradeable.
    pub force_all: bool,
    /// Only lossless tracks satisfy the requirements and only lossless tracks replace.
    pub force_lossless: bool,
    /// Pick the best candidate instead of asking.
    pub simple_mode: bool,
    pub dry_run: bool,
    pub duplicate: bool,
}

impl UpgradeOptions {
    pub fn from_config(config: &UpgradeConfig) -> Self {
        Self {
            force_all: config.force_all,
            force_lossless: config.force_lossless,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    Satisfied,
    Upgraded(MediaItem),
    NotFound,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub playlist: Playlist,
    pub entries: Vec<(MediaItem, UpgradeOutcome)>,
    pub dry_run: bool,
}

pub fn meets_quality_requirements(item: &MediaItem, options: &UpgradeOptions) -> bool {
    if options.force_all {
        return false;
    }
    if options.force_lossless {
        return item.is_lossless();
    }
    let bitrate = item.bitrate().unwrap_or(0);
    match item.audio_codec().map(str::to_lowercase).as_deref() {
        Some("mp3") => bitrate >= 320,
        Some("aac") => bitrate >= 256,
        _ => true,
    }
}

/// Lower is better. Unknown codecs rank last.
pub fn codec_rank(codec: Option<&str>) -> u8 {
    match codec.map(str::to_lowercase).as_deref() {
        Some("flac") => 0,
        Some("alac") => 1,
        Some("aac") => 2,
        Some("mp3") => 3,
        _ => 4,
    }
}

/// Total order over candidates, best first: lossless, bitrate, codec, artist, rating key.
pub fn compare_candidates(a: &MediaItem, b: &MediaItem) -> Ordering {
    b.is_lossless()
        .cmp(&a.is_lossless())
        .then_with(|| b.bitrate().cmp(&a.bitrate()))
        .then_with(|| codec_rank(a.audio_codec()).cmp(&codec_rank(b.audio_codec())))
        .then_with(|| sortable_term(a.artist()).cmp(&sortable_term(b.artist())))
        .then_with(|| a.rating_key.cmp(&b.rating_key))
}

/// Title used for the library search, with punctuation removed.
pub fn search_title(title: &str) -> String {
    regex!(r"[^\w\s]").replace_all(title, "").trim().to_string()
}

fn is_better(candidate: &MediaItem, item: &MediaItem, options: &UpgradeOptions) -> bool {
    let higher_bitrate = match (candidate.bitrate(), item.bitrate()) {
        (Some(candidate), Some(current)) => candidate > current,
        (Some(_), None) => true,
        _ => false,
    };
    higher_bitrate && (!options.force_lossless || candidate.is_lossless())
}

/// Filters search results down to acceptable replacements for `item`, best first.
pub fn replacement_candidates(
    item: &MediaItem,
    search_results: Vec<MediaItem>,
    options: &UpgradeOptions,
) -> Vec<MediaItem> {
    let title = search_title(item.title()).to_lowercase();
    let artist = item.artist().to_lowercase();
    let mut candidates = search_results
        .into_iter()
        .filter(|result| result.rating_key != item.rating_key)
        .filter(|result| search_title(result.title()).to_lowercase() == title)
        .filter(|result| {
            let candidate_artist = result.artist().to_lowercase();
            if artist.is_empty() {
                candidate_artist.is_empty()
            } else {
                candidate_artist.contains(&artist)
            }
        })
        .filter(|result| is_better(result, item, options))
        .collect::<Vec<_>>();
    candidates.sort_by(compare_candidates);
    candidates
}

/// Decides the outcome of every item. Returns `None` when the user aborts.
pub async fn plan_upgrade<S, F>(
    server: &S,
    items: &[MediaItem],
    options: &UpgradeOptions,
    mut choose: F,
) -> OrganizerResult<Option<Vec<(MediaItem, UpgradeOutcome)>>>
where
    S: MediaServer,
    F: FnMut(&MediaItem, &[MediaItem]) -> OrganizerResult<Choice>,
{
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_audio() || meets_quality_requirements(item, options) {
            println!("✅ {}", item);
            entries.push((item.clone(), UpgradeOutcome::Satisfied));
            continue;
        }
        println!("❌ {} must be upgraded.", item.to_string().red());

        let title = search_title(item.title());
        if title.is_empty() {
            println!("❔ Title can't be searched. No changes to the track will be made.");
            entries.push((item.clone(), UpgradeOutcome::NotFound));
            continue;
        }
        let search_results = match server.search_tracks(&title).await {
            Ok(results) => results,
            Err(report) => {
                log::warn!("Search for {} failed: {:?}", item.title(), report);
                println!("❔ Search failed. No changes to the track will be made.");
                entries.push((item.clone(), UpgradeOutcome::Failed(report.to_string())));
                continue;
            }
        };
        let candidates = replacement_candidates(item, search_results, options);
        if candidates.is_empty() {
            println!("❔ No potential replacement tracks found. No changes to the track will be made.");
            entries.push((item.clone(), UpgradeOutcome::NotFound));
            continue;
        }

        let choice = if options.simple_mode {
            Choice::Item(0)
        } else {
            choose(item, &candidates)?
        };
        match choice {
            Choice::Item(index) => {
                let replacement = candidates
                    .get(index)
                    .cloned()
                    .ok_or(OrganizerError)
                    .into_report()
                    .attach_printable(format!(
                        "No replacement candidate at position {} for {}",
                        index,
                        item.title()
                    ))?;
                println!("🆕 {} will be used instead.", replacement.to_string().green());
                entries.push((item.clone(), UpgradeOutcome::Upgraded(replacement)));
            }
            Choice::None => {
                println!("❔ No replacement track selected. No changes to the track will be made.");
                entries.push((item.clone(), UpgradeOutcome::Skipped));
            }
            Choice::Abort => return Ok(None),
        }
    }
    Ok(Some(entries))
}

/// Adds `replacement` to the playlist, moves it right after `original` and removes `original`.
async fn replace_in_place<S: MediaServer>(
    server: &S,
    playlist: &Playlist,
    original: &MediaItem,
    replacement: &MediaItem,
) -> OrganizerResult<()> {
    server
        .add_items(playlist, std::slice::from_ref(replacement))
        .await
        .change_context(OrganizerError)?;
    let items = server
        .playlist_items(playlist)
        .await
        .change_context(OrganizerError)?;
    let added = items
        .iter()
        .rev()
        .find(|entry| entry.rating_key == replacement.rating_key)
        .ok_or(OrganizerError)
        .into_report()
        .attach_printable(format!(
            "{} was not added to {}",
            replacement.title(),
            playlist.title
        ))?;
    server
        .move_item(playlist, added, Some(original))
        .await
        .change_context(OrganizerError)?;
    server
        .remove_item(playlist, original)
        .await
        .change_context(OrganizerError)
}

/// Replaces low quality tracks of `playlist` with better versions from the library.
pub async fn upgrade_playlist<S, F>(
    server: &S,
    playlist: &Playlist,
    options: &UpgradeOptions,
    choose: F,
) -> OrganizerResult<Option<UpgradeReport>>
where
    S: MediaServer,
    F: FnMut(&MediaItem, &[MediaItem]) -> OrganizerResult<Choice>,
{
    let options = &UpgradeOptions {
        simple_mode: options.simple_mode || options.dry_run,
        duplicate: options.duplicate && !options.dry_run,
        ..*options
    };
    println!("Preparing playlist items...");
    let mut playlist = playlist.clone();
    let mut items = server
        .playlist_items(&playlist)
        .await
        .attach_printable(format!("Failed to read the items of {}", playlist.title))
        .change_context(OrganizerError)?;
    if items.is_empty() {
        println!(
            "Playlist {} is empty, nothing to upgrade.",
            playlist.title.clone().yellow()
        );
        return Ok(Some(UpgradeReport {
            playlist,
            entries: vec![],
            dry_run: options.dry_run,
        }));
    }

    if options.duplicate {
        playlist = duplicate_playlist(server, &playlist, &items).await?;
        items = server
            .playlist_items(&playlist)
            .await
            .change_context(OrganizerError)?;
    }

    let Some(entries) = plan_upgrade(server, &items, options, choose).await? else {
        return Ok(None);
    };
    let report = UpgradeReport {
        playlist,
        entries,
        dry_run: options.dry_run,
    };

    if !report.dry_run {
        for (original, replacement) in report.upgraded() {
            replace_in_place(server, &report.playlist, original, replacement)
                .await
                .attach_printable(format!("Failed to replace {}", original.title()))?;
        }
    }
    report.print_summary();
    Ok(Some(report))
}

impl UpgradeReport {
    pub fn upgraded(&self) -> impl Iterator<Item = (&MediaItem, &MediaItem)> {
        self.entries.iter().filter_map(|(item, outcome)| match outcome {
            UpgradeOutcome::Upgraded(replacement) => Some((item, replacement)),
            _ => None,
        })
    }

    pub fn not_upgraded(&self) -> impl Iterator<Item = (&MediaItem, &UpgradeOutcome)> {
        self.entries.iter().filter_map(|(item, outcome)| match outcome {
            UpgradeOutcome::NotFound | UpgradeOutcome::Skipped | UpgradeOutcome::Failed(_) => {
                Some((item, outcome))
            }
            _ => None,
        })
    }

    pub fn print_summary(&self) {
        println!();
        let verb = if self.dry_run { "would be" } else { "were" };
        if self.upgraded().next().is_some() {
            println!("The following tracks {} removed:", verb);
            for (original, _) in self.upgraded() {
                println!("❌ {}", original);
            }
            println!();
            println!("The following tracks {} added:", verb);
            for (_, replacement) in self.upgraded() {
                println!("🆕 {}", replacement.to_string().green());
            }
            println!();
        }
        if self.not_upgraded().next().is_some() {
            println!("The following tracks couldn't be upgraded:");
            for (item, outcome) in self.not_upgraded() {
                match outcome {
                    UpgradeOutcome::Failed(reason) => {
                        println!("❔ {} ({})", item, reason.red())
                    }
                    _ => println!("❔ {}", item),
                }
            }
            println!();
        }
        if !self.dry_run {
            println!(
                "Successfully upgraded playlist {}.",
                self.playlist.title.clone().green()
            );
        }
    }
}
