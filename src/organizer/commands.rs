use std::ops::ControlFlow;

use colored::Colorize;
use error_stack::ResultExt;
use strum::IntoEnumIterator;

use crate::config::OrganizeConfig;
use crate::dialoguer::{Choice, Dialoguer};
use crate::organizer::analyze::{analyze_playlist, low_bitrate_albums};
use crate::organizer::sort::{sort_playlist, SortDirection, SortKey, SortPlan};
use crate::organizer::upgrade::{upgrade_playlist, UpgradeOptions};
use crate::organizer::{Flow, OrganizerError, OrganizerResult};
use crate::plex::models::{Playlist, PlaylistType, Section};
use crate::plex::MediaServer;

/// Library sections of this type hold music.
const MUSIC_SECTION_TYPE: &str = "artist";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumIter)]
pub enum OrganizeCommands {
    #[strum(serialize = "Sort playlists (audio & video)")]
    SortPlaylist,
    #[strum(serialize = "Upgrade playlists (audio only)")]
    UpgradePlaylist,
    #[strum(serialize = "Analyze playlist bitrate (audio only)")]
    AnalyzePlaylistBitrate,
    #[strum(serialize = "Find all music albums with low bitrate (audio only)")]
    FindLowBitrateAlbums,
}

impl OrganizeCommands {
    pub async fn execute<S: MediaServer>(
        server: &S,
        config: &OrganizeConfig,
    ) -> OrganizerResult<Flow> {
        let options = Self::iter().collect::<Vec<_>>();
        let Some(index) = Self::ask(
            format!("What do you want to do on {}?", server.name()),
            &options,
        )?
        else {
            return Ok(Flow::Aborted);
        };

        match options[index] {
            OrganizeCommands::SortPlaylist => Self::sort(server).await,
            OrganizeCommands::UpgradePlaylist => Self::upgrade(server, config).await,
            OrganizeCommands::AnalyzePlaylistBitrate => Self::analyze(server, config).await,
            OrganizeCommands::FindLowBitrateAlbums => {
                Self::find_low_bitrate_albums(server, config).await
            }
        }
    }

    async fn sort<S: MediaServer>(server: &S) -> OrganizerResult<Flow> {
        let playlist =
            match Self::select_playlist(server, &[PlaylistType::Audio, PlaylistType::Video]).await? {
                ControlFlow::Continue(playlist) => playlist,
                ControlFlow::Break(flow) => return Ok(flow),
            };

        let keys = SortKey::available_for(playlist.playlist_type);
        let key_labels = keys.iter().map(SortKey::label).collect::<Vec<_>>();
        let Some(index) = Self::ask("Select sort key".to_string(), &key_labels)? else {
            return Ok(Flow::Aborted);
        };
        let key = keys[index];

        let plan = if key == SortKey::ShuffleRandomly {
            SortPlan::Shuffle
        } else {
            let directions = SortDirection::iter().collect::<Vec<_>>();
            let direction_labels = directions
                .iter()
                .map(SortDirection::label)
                .collect::<Vec<_>>();
            let Some(index) = Self::ask("Select sort direction".to_string(), &direction_labels)?
            else {
                return Ok(Flow::Aborted);
            };
            key.plan(directions[index])
        };

        let duplicate = Self::ask_duplicate()?;
        if !Self::confirm(format!(
            "{} {} by {}?",
            if duplicate { "Duplicate and sort" } else { "Sort" },
            playlist.title,
            key.label().to_lowercase()
        ))? {
            return Ok(Flow::Done);
        }
        sort_playlist(server, &playlist, &plan, duplicate).await?;
        Ok(Flow::Done)
    }

    async fn upgrade<S: MediaServer>(
        server: &S,
        config: &OrganizeConfig,
    ) -> OrganizerResult<Flow> {
        let playlist = match Self::select_playlist(server, &[PlaylistType::Audio]).await? {
            ControlFlow::Continue(playlist) => playlist,
            ControlFlow::Break(flow) => return Ok(flow),
        };

        let mut options = UpgradeOptions::from_config(&config.upgrade);
        options.dry_run = Dialoguer::select_yes_or_no(
            "Do you want to do a dry run (no changes are made)?".to_string(),
            false,
        )
        .change_context(OrganizerError)?;
        if !options.dry_run {
            options.duplicate = Self::ask_duplicate()?;
            options.simple_mode = Dialoguer::select_yes_or_no(
                "Do you want to use simple mode (the best replacement is picked automatically)?"
                    .to_string(),
                options.simple_mode,
            )
            .change_context(OrganizerError)?;
        }
        log::debug!("Upgrade options: {:?}", options);

        let report = upgrade_playlist(server, &playlist, &options, |item, candidates| {
            Dialoguer::question(
                format!("Select a replacement track for \"{}\"", item.to_string().cyan()),
                candidates,
                true,
            )
            .change_context(OrganizerError)
        })
        .await?;
        Ok(match report {
            Some(_) => Flow::Done,
            None => Flow::Aborted,
        })
    }

    async fn analyze<S: MediaServer>(
        server: &S,
        config: &OrganizeConfig,
    ) -> OrganizerResult<Flow> {
        let playlist = match Self::select_playlist(server, &[PlaylistType::Audio]).await? {
            ControlFlow::Continue(playlist) => playlist,
            ControlFlow::Break(flow) => return Ok(flow),
        };
        analyze_playlist(server, &playlist, config.min_bitrate).await?;
        Ok(Flow::Done)
    }

    async fn find_low_bitrate_albums<S: MediaServer>(
        server: &S,
        config: &OrganizeConfig,
    ) -> OrganizerResult<Flow> {
        let sections = server
            .sections()
            .await
            .attach_printable("Failed to read the library sections")
            .change_context(OrganizerError)?;
        let sections = music_sections(sections);
        if sections.is_empty() {
            println!("{}", "No music libraries found.".yellow());
            return Ok(Flow::Done);
        }
        let Some(index) = Self::ask("Select music library".to_string(), &sections)? else {
            return Ok(Flow::Aborted);
        };
        low_bitrate_albums(
            server,
            &sections[index],
            &UpgradeOptions::from_config(&config.upgrade),
        )
        .await?;
        Ok(Flow::Done)
    }

    /// Offers the eligible playlists. Breaks with `Done` when there are none.
    async fn select_playlist<S: MediaServer>(
        server: &S,
        types: &[PlaylistType],
    ) -> OrganizerResult<ControlFlow<Flow, Playlist>> {
        let playlists = server
            .playlists()
            .await
            .attach_printable(format!("Failed to read the playlists of {}", server.name()))
            .change_context(OrganizerError)?;
        let playlists = eligible_playlists(playlists, types);
        if playlists.is_empty() {
            println!("{}", "No playlists available for this operation.".yellow());
            return Ok(ControlFlow::Break(Flow::Done));
        }
        let labels = playlists.iter().map(playlist_label).collect::<Vec<_>>();
        Ok(match Self::ask("Select playlist".to_string(), &labels)? {
            Some(index) => ControlFlow::Continue(playlists[index].clone()),
            None => ControlFlow::Break(Flow::Aborted),
        })
    }

    /// Index of the picked item, `None` on abort.
    fn ask<T: ToString>(prompt_text: String, items: &[T]) -> OrganizerResult<Option<usize>> {
        let choice = Dialoguer::question(prompt_text, items, false).change_context(OrganizerError)?;
        Ok(match choice {
            Choice::Item(index) => Some(index),
            Choice::None | Choice::Abort => None,
        })
    }

    fn ask_duplicate() -> OrganizerResult<bool> {
        Dialoguer::select_yes_or_no(
            "Do you want to create a duplicate playlist instead of changing the original?"
                .to_string(),
            false,
        )
        .change_context(OrganizerError)
    }

    fn confirm(prompt_text: String) -> OrganizerResult<bool> {
        Dialoguer::select_yes_or_no(prompt_text, true).change_context(OrganizerError)
    }
}

/// Regular playlists of the given types.
pub fn eligible_playlists(playlists: Vec<Playlist>, types: &[PlaylistType]) -> Vec<Playlist> {
    playlists
        .into_iter()
        .filter(|playlist| !playlist.smart && types.contains(&playlist.playlist_type))
        .collect()
}

pub fn music_sections(sections: Vec<Section>) -> Vec<Section> {
    sections
        .into_iter()
        .filter(|section| section.section_type == MUSIC_SECTION_TYPE)
        .collect()
}

fn playlist_label(playlist: &Playlist) -> String {
    match playlist.leaf_count {
        Some(count) => format!("{} ({} items)", playlist.title, count),
        None => playlist.title.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(title: &str, playlist_type: PlaylistType, smart: bool) -> Playlist {
        Playlist {
            rating_key: title.to_string(),
            title: title.to_string(),
            summary: String::new(),
            smart,
            playlist_type,
            leaf_count: Some(3),
        }
    }

    #[test]
    fn test_eligible_playlists_excludes_smart_and_other_types() {
        let playlists = vec![
            playlist("Mix", PlaylistType::Audio, false),
            playlist("Recently added", PlaylistType::Audio, true),
            playlist("Movies", PlaylistType::Video, false),
            playlist("Holidays", PlaylistType::Photo, false),
        ];
        let audio = eligible_playlists(playlists.clone(), &[PlaylistType::Audio]);
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].title, "Mix");

        let sortable =
            eligible_playlists(playlists, &[PlaylistType::Audio, PlaylistType::Video]);
        let titles = sortable.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Mix", "Movies"]);
    }

    #[test]
    fn test_music_sections() {
        let section = |key: &str, section_type: &str| Section {
            key: key.to_string(),
            title: key.to_string(),
            section_type: section_type.to_string(),
        };
        let sections = music_sections(vec![section("1", "movie"), section("2", "artist")]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].key, "2");
    }

    #[test]
    fn test_command_labels() {
        let labels = OrganizeCommands::iter()
            .map(|command| command.to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels[0], "Sort playlists (audio & video)");
        assert_eq!(labels.len(), 4);
    }
}
