use reqwest::Method;

/// Plex Media Server endpoints used by the organizer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlexAPI {
    Identity,
    Playlists,
    PlaylistItems {
        playlist_key: String,
    },
    MovePlaylistItem {
        playlist_key: String,
        item_id: u64,
        after: Option<u64>,
    },
    CreatePlaylist {
        title: String,
        playlist_type: String,
        uri: String,
    },
    EditPlaylistSummary {
        playlist_key: String,
        summary: String,
    },
    AddPlaylistItems {
        playlist_key: String,
        uri: String,
    },
    RemovePlaylistItem {
        playlist_key: String,
        item_id: u64,
    },
    SearchTracks {
        title: String,
    },
    Sections,
    Albums {
        section_key: String,
    },
    AlbumTracks {
        album_key: String,
    },
}

/// Plex library type ids used in `type=` filters.
const TRACK_TYPE: &str = "10";
const ALBUM_TYPE: &str = "9";

impl PlexAPI {
    pub fn method(&self) -> Method {
        match self {
            PlexAPI::CreatePlaylist { .. } => Method::POST,
            PlexAPI::MovePlaylistItem { .. }
            | PlexAPI::EditPlaylistSummary { .. }
            | PlexAPI::AddPlaylistItems { .. } => Method::PUT,
            PlexAPI::RemovePlaylistItem { .. } => Method::DELETE,
            _ => Method::GET,
        }
    }

    pub fn path(&self) -> String {
        match self {
            PlexAPI::Identity => "/identity".to_string(),
            PlexAPI::Playlists | PlexAPI::CreatePlaylist { .. } => "/playlists".to_string(),
            PlexAPI::PlaylistItems { playlist_key } | PlexAPI::AddPlaylistItems { playlist_key, .. } => {
                format!("/playlists/{}/items", playlist_key)
            }
            PlexAPI::MovePlaylistItem {
                playlist_key,
                item_id,
                ..
            } => format!("/playlists/{}/items/{}/move", playlist_key, item_id),
            PlexAPI::EditPlaylistSummary { playlist_key, .. } => {
                format!("/playlists/{}", playlist_key)
            }
            PlexAPI::RemovePlaylistItem {
                playlist_key,
                item_id,
            } => format!("/playlists/{}/items/{}", playlist_key, item_id),
            PlexAPI::SearchTracks { .. } => "/library/all".to_string(),
            PlexAPI::Sections => "/library/sections".to_string(),
            PlexAPI::Albums { section_key } => format!("/library/sections/{}/all", section_key),
            PlexAPI::AlbumTracks { album_key } => format!("/library/metadata/{}/children", album_key),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            PlexAPI::MovePlaylistItem {
                after: Some(after), ..
            } => vec![("after", after.to_string())],
            PlexAPI::CreatePlaylist {
                title,
                playlist_type,
                uri,
            } => vec![
                ("type", playlist_type.clone()),
                ("title", title.clone()),
                ("smart", "0".to_string()),
                ("uri", uri.clone()),
            ],
            PlexAPI::EditPlaylistSummary { summary, .. } => vec![("summary", summary.clone())],
            PlexAPI::AddPlaylistItems { uri, .. } => vec![("uri", uri.clone())],
            PlexAPI::SearchTracks { title } => vec![
                ("type", TRACK_TYPE.to_string()),
                ("title", title.clone()),
            ],
            PlexAPI::Albums { .. } => vec![("type", ALBUM_TYPE.to_string())],
            _ => vec![],
        }
    }
}

/// Builds the `server://` uri Plex expects when adding library items to a playlist.
pub fn library_items_uri(machine_identifier: &str, rating_keys: &[&str]) -> String {
    format!(
        "server://{}/com.plexapp.plugins.library/library/metadata/{}",
        machine_identifier,
        rating_keys.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_top_has_no_after_param() {
        let api = PlexAPI::MovePlaylistItem {
            playlist_key: "12".to_string(),
            item_id: 5,
            after: None,
        };
        assert_eq!(api.method(), Method::PUT);
        assert_eq!(api.path(), "/playlists/12/items/5/move");
        assert!(api.query().is_empty());
    }

    #[test]
    fn test_move_after_item() {
        let api = PlexAPI::MovePlaylistItem {
            playlist_key: "12".to_string(),
            item_id: 5,
            after: Some(9),
        };
        assert_eq!(api.query(), vec![("after", "9".to_string())]);
    }

    #[test]
    fn test_search_tracks_filters_by_type() {
        let api = PlexAPI::SearchTracks {
            title: "Strobe".to_string(),
        };
        assert_eq!(api.method(), Method::GET);
        assert_eq!(api.path(), "/library/all");
        assert_eq!(
            api.query(),
            vec![("type", "10".to_string()), ("title", "Strobe".to_string())]
        );
    }

    #[test]
    fn test_library_items_uri() {
        assert_eq!(
            library_items_uri("abc", &["1", "2", "3"]),
            "server://abc/com.plexapp.plugins.library/library/metadata/1,2,3"
        );
    }
}
