use colored::Colorize;
use error_stack::{IntoReport, ResultExt};
use indicatif::{ProgressBar, ProgressStyle};
use inflector::Inflector;
use lazy_regex::regex;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::organizer::{duplicate_playlist, OrganizerError, OrganizerResult};
use crate::plex::models::{MediaItem, Playlist, PlaylistType};
use crate::plex::MediaServer;

/// Leading articles dropped from sort terms.
const ARTICLES: [&str; 25] = [
    // German
    "die", "der", "das", "ein", "eine", //
    // English
    "the", "a", "an", //
    // Spanish
    "el", "la", "los", "las", "un", "una", "unos", "unas", //
    // French
    "le", "les", "une", "des", //
    // Italian
    "il", "lo", "i", "gli", "uno",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumIter)]
pub enum SortKey {
    Title,
    SortingTitle,
    ArtistName,
    AlbumArtistName,
    AlbumName,
    ReleaseYear,
    OriginallyAvailableAt,
    Duration,
    ShuffleRandomly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumIter)]
pub enum SortDirection {
    SortAscending,
    SortDescending,
}

/// Item attribute a sort key reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    TitleSort,
    OriginalTitle,
    GrandparentTitle,
    ParentTitle,
    Year,
    OriginallyAvailableAt,
    Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWithBackup {
    pub field: SortField,
    pub backup: Option<SortField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortMethod {
    pub primary: FieldWithBackup,
    /// Applied first on audio playlists so equal primary values end up grouped.
    pub secondary: Option<FieldWithBackup>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPlan {
    Shuffle,
    Ordered(SortMethod),
}

impl SortKey {
    pub fn label(&self) -> String {
        self.to_string().to_sentence_case()
    }

    /// Keys offered for a playlist of the given type, in menu order.
    pub fn available_for(playlist_type: PlaylistType) -> Vec<SortKey> {
        let mut keys = vec![SortKey::Title, SortKey::SortingTitle];
        match playlist_type {
            PlaylistType::Audio => keys.extend([
                SortKey::ArtistName,
                SortKey::AlbumArtistName,
                SortKey::AlbumName,
            ]),
            PlaylistType::Video => {
                keys.extend([SortKey::ReleaseYear, SortKey::OriginallyAvailableAt])
            }
            _ => {}
        }
        keys.extend([SortKey::Duration, SortKey::ShuffleRandomly]);
        keys
    }

    pub fn plan(&self, direction: SortDirection) -> SortPlan {
        use SortField::*;

        let by = |field, backup| FieldWithBackup { field, backup };
        let artist = by(OriginalTitle, Some(GrandparentTitle));
        let title = by(Title, None);
        let (primary, secondary) = match self {
            SortKey::ShuffleRandomly => return SortPlan::Shuffle,
            SortKey::Title => (title, Some(artist)),
            SortKey::SortingTitle => (by(TitleSort, Some(Title)), Some(artist)),
            SortKey::ArtistName => (artist, Some(title)),
            SortKey::AlbumArtistName => (by(GrandparentTitle, None), Some(title)),
            SortKey::AlbumName => (by(ParentTitle, None), Some(artist)),
            SortKey::ReleaseYear => (by(Year, None), Some(title)),
            SortKey::OriginallyAvailableAt => (by(OriginallyAvailableAt, None), Some(title)),
            SortKey::Duration => (by(Duration, None), Some(title)),
        };
        SortPlan::Ordered(SortMethod {
            primary,
            secondary,
            direction,
        })
    }
}

impl SortDirection {
    pub fn label(&self) -> String {
        self.to_string().to_sentence_case()
    }
}

impl SortField {
    pub fn value(&self, item: &MediaItem) -> Option<SortValue> {
        let text = |value: &Option<String>| value.as_deref().map(|v| SortValue::Text(sortable_term(v)));
        match self {
            SortField::Title => text(&item.title),
            SortField::TitleSort => text(&item.title_sort),
            SortField::OriginalTitle => text(&item.original_title),
            SortField::GrandparentTitle => text(&item.grandparent_title),
            SortField::ParentTitle => text(&item.parent_title),
            SortField::OriginallyAvailableAt => item
                .originally_available_at
                .as_ref()
                .map(|date| SortValue::Text(date.clone())),
            SortField::Year => item.year.map(|year| SortValue::Number(i64::from(year))),
            SortField::Duration => item
                .duration
                .or_else(|| item.media_duration())
                .map(|duration| SortValue::Number(duration as i64)),
        }
    }
}

impl FieldWithBackup {
    /// Missing values sort lowest.
    pub fn value(&self, item: &MediaItem) -> Option<SortValue> {
        self.field
            .value(item)
            .or_else(|| self.backup.and_then(|backup| backup.value(item)))
    }
}

/// Normalizes a term for sorting: lowercase ASCII, no leading article, no punctuation.
pub fn sortable_term(term: &str) -> String {
    let term = deunicode::deunicode(&term.to_lowercase());
    let mut words = term.split(' ').collect::<Vec<_>>();
    if words.len() > 1 && ARTICLES.contains(&words[0]) {
        words.remove(0);
    }
    let term = words.join(" ").replace('&', "and");
    let punctuation = regex!(r#"[*.:,;…'"/\\!?$()=+#<>|‘“¡¿´`]"#);
    punctuation.replace_all(&term, "").trim().to_string()
}

fn stable_sort_by(items: &mut [MediaItem], key: &FieldWithBackup, direction: SortDirection) {
    let mut keyed = items
        .iter()
        .map(|item| (key.value(item), item.clone()))
        .collect::<Vec<_>>();
    keyed.sort_by(|(a, _), (b, _)| match direction {
        SortDirection::SortAscending => a.cmp(b),
        SortDirection::SortDescending => b.cmp(a),
    });
    for (slot, (_, item)) in items.iter_mut().zip(keyed) {
        *slot = item;
    }
}

/// Computes the new order of `items`. Never fails; equal items keep their relative order.
pub fn order_items<R: Rng + ?Sized>(
    mut items: Vec<MediaItem>,
    plan: &SortPlan,
    playlist_type: PlaylistType,
    rng: &mut R,
) -> Vec<MediaItem> {
    match plan {
        SortPlan::Shuffle => items.shuffle(rng),
        SortPlan::Ordered(method) => {
            if let (Some(secondary), PlaylistType::Audio) = (&method.secondary, playlist_type) {
                stable_sort_by(&mut items, secondary, method.direction);
            }
            stable_sort_by(&mut items, &method.primary, method.direction);
        }
    }
    items
}

/// Sorts `playlist` in place, or into a new `Copy of` playlist when `duplicate` is set.
pub async fn sort_playlist<S: MediaServer>(
    server: &S,
    playlist: &Playlist,
    plan: &SortPlan,
    duplicate: bool,
) -> OrganizerResult<Playlist> {
    println!("Preparing playlist items...");
    let items = server
        .playlist_items(playlist)
        .await
        .attach_printable(format!("Failed to read the items of {}", playlist.title))
        .change_context(OrganizerError)?;
    if items.is_empty() {
        println!(
            "Playlist {} is empty, nothing to sort.",
            playlist.title.clone().yellow()
        );
        return Ok(playlist.clone());
    }

    let sorted = order_items(items, plan, playlist.playlist_type, &mut rand::thread_rng());

    if duplicate {
        let new_playlist = duplicate_playlist(server, playlist, &sorted).await?;
        println!(
            "Successfully created and sorted playlist {}.",
            new_playlist.title.clone().green()
        );
        return Ok(new_playlist);
    }

    println!("Sorting playlist {}...", playlist.title.clone().cyan());
    let pb = ProgressBar::new(sorted.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.white/blue}] {pos}/{len}")
            .into_report()
            .change_context(OrganizerError)?
            .progress_chars("█  "),
    );
    let mut previous: Option<&MediaItem> = None;
    for item in &sorted {
        server
            .move_item(playlist, item, previous)
            .await
            .attach_printable(format!("Failed to move {}", item.title()))
            .change_context(OrganizerError)?;
        previous = Some(item);
        pb.inc(1);
    }
    pb.finish_and_clear();
    println!(
        "Successfully sorted playlist {}.",
        playlist.title.clone().green()
    );
    Ok(playlist.clone())
}
