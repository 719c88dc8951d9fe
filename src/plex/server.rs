use async_trait::async_trait;
use error_stack::{IntoReport, Report, ResultExt};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::plex::api::{library_items_uri, PlexAPI};
use crate::plex::models::{
    ContainerResponse, DirectoryContainer, Identity, MediaItem, MetadataContainer, Playlist,
    PlaylistType, Section,
};
use crate::plex::{build_client, MediaServer, PlexError, PlexResult};

/// A connection to one Plex Media Server.
#[derive(Debug, Clone)]
pub struct PlexServer {
    pub name: String,
    pub base_url: String,
    pub machine_identifier: String,
    client: Client,
}

impl PlexServer {
    /// Connects to `base_url` and reads the server identity.
    pub async fn connect(
        name: String,
        base_url: &str,
        token: &str,
        client_identifier: &str,
    ) -> PlexResult<Self> {
        let parsed = Url::parse(base_url)
            .into_report()
            .attach_printable(format!("Invalid server url: {}", base_url))
            .change_context(PlexError)?;
        let mut server = Self {
            name,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            machine_identifier: String::new(),
            client: build_client(client_identifier, Some(token))?,
        };
        let identity: Identity = server.get(PlexAPI::Identity).await?;
        server.machine_identifier = identity.machine_identifier;
        Ok(server)
    }

    async fn send(&self, api: &PlexAPI) -> PlexResult<Response> {
        let url = format!("{}{}", self.base_url, api.path());
        log::debug!("{} {}", api.method(), url);
        self.client
            .request(api.method(), &url)
            .query(&api.query())
            .send()
            .await
            .into_report()
            .attach_printable(format!("Request to {} failed", url))
            .change_context(PlexError)?
            .error_for_status()
            .into_report()
            .change_context(PlexError)
    }

    async fn get<T: DeserializeOwned>(&self, api: PlexAPI) -> PlexResult<T> {
        let response = self.send(&api).await?;
        let container = response
            .json::<ContainerResponse<T>>()
            .await
            .into_report()
            .attach_printable(format!("Unexpected response from {}", api.path()))
            .change_context(PlexError)?;
        Ok(container.media_container)
    }

    async fn execute(&self, api: PlexAPI) -> PlexResult<()> {
        self.send(&api).await?;
        Ok(())
    }

    fn items_uri(&self, items: &[MediaItem]) -> String {
        let keys = items
            .iter()
            .map(|item| item.rating_key.as_str())
            .collect::<Vec<_>>();
        library_items_uri(&self.machine_identifier, &keys)
    }
}

fn playlist_item_id(item: &MediaItem) -> PlexResult<u64> {
    item.playlist_item_id.ok_or_else(|| {
        Report::new(PlexError).attach_printable(format!(
            "{} is not a playlist entry",
            item.title()
        ))
    })
}

#[async_trait]
impl MediaServer for PlexServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn playlists(&self) -> PlexResult<Vec<Playlist>> {
        let container: MetadataContainer<Playlist> = self.get(PlexAPI::Playlists).await?;
        Ok(container.metadata)
    }

    async fn playlist_items(&self, playlist: &Playlist) -> PlexResult<Vec<MediaItem>> {
        let container: MetadataContainer<MediaItem> = self
            .get(PlexAPI::PlaylistItems {
                playlist_key: playlist.rating_key.clone(),
            })
            .await?;
        Ok(container.metadata)
    }

    async fn move_item(
        &self,
        playlist: &Playlist,
        item: &MediaItem,
        after: Option<&MediaItem>,
    ) -> PlexResult<()> {
        let after = match after {
            Some(after) => Some(playlist_item_id(after)?),
            None => None,
        };
        self.execute(PlexAPI::MovePlaylistItem {
            playlist_key: playlist.rating_key.clone(),
            item_id: playlist_item_id(item)?,
            after,
        })
        .await
    }

    async fn create_playlist(
        &self,
        title: &str,
        summary: &str,
        playlist_type: PlaylistType,
        items: &[MediaItem],
    ) -> PlexResult<Playlist> {
        if items.is_empty() {
            return Err(Report::new(PlexError)
                .attach_printable("A playlist can't be created without items"));
        }
        let container: MetadataContainer<Playlist> = self
            .get(PlexAPI::CreatePlaylist {
                title: title.to_string(),
                playlist_type: playlist_type.to_string(),
                uri: self.items_uri(items),
            })
            .await?;
        let mut playlist = container
            .metadata
            .into_iter()
            .next()
            .ok_or(PlexError)
            .into_report()
            .attach_printable(format!("Plex did not return the new playlist {}", title))?;
        if !summary.is_empty() {
            self.execute(PlexAPI::EditPlaylistSummary {
                playlist_key: playlist.rating_key.clone(),
                summary: summary.to_string(),
            })
            .await?;
            playlist.summary = summary.to_string();
        }
        Ok(playlist)
    }

    async fn add_items(&self, playlist: &Playlist, items: &[MediaItem]) -> PlexResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.execute(PlexAPI::AddPlaylistItems {
            playlist_key: playlist.rating_key.clone(),
            uri: self.items_uri(items),
        })
        .await
    }

    async fn remove_item(&self, playlist: &Playlist, item: &MediaItem) -> PlexResult<()> {
        self.execute(PlexAPI::RemovePlaylistItem {
            playlist_key: playlist.rating_key.clone(),
            item_id: playlist_item_id(item)?,
        })
        .await
    }

    async fn search_tracks(&self, title: &str) -> PlexResult<Vec<MediaItem>> {
        let container: MetadataContainer<MediaItem> = self
            .get(PlexAPI::SearchTracks {
                title: title.to_string(),
            })
            .await?;
        Ok(container.metadata)
    }

    async fn sections(&self) -> PlexResult<Vec<Section>> {
        let container: DirectoryContainer<Section> = self.get(PlexAPI::Sections).await?;
        Ok(container.directory)
    }

    async fn albums(&self, section: &Section) -> PlexResult<Vec<MediaItem>> {
        let container: MetadataContainer<MediaItem> = self
            .get(PlexAPI::Albums {
                section_key: section.key.clone(),
            })
            .await?;
        Ok(container.metadata)
    }

    async fn album_tracks(&self, album: &MediaItem) -> PlexResult<Vec<MediaItem>> {
        let container: MetadataContainer<MediaItem> = self
            .get(PlexAPI::AlbumTracks {
                album_key: album.rating_key.clone(),
            })
            .await?;
        Ok(container.metadata)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn mock_server_with_identity() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/identity"))
            .and(header("X-Plex-Token", "token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"machineIdentifier": "machine-1"}
            })))
            .mount(&mock_server)
            .await;
        mock_server
    }

    async fn connect(mock_server: &MockServer) -> PlexServer {
        PlexServer::connect("Home".to_string(), &mock_server.uri(), "token", "client-1")
            .await
            .unwrap()
    }

    fn playlist() -> Playlist {
        Playlist {
            rating_key: "100".to_string(),
            title: "Road trip".to_string(),
            summary: String::new(),
            smart: false,
            playlist_type: PlaylistType::Audio,
            leaf_count: Some(2),
        }
    }

    #[tokio::test]
    async fn test_connect_reads_machine_identifier() {
        let mock_server = mock_server_with_identity().await;
        let server = connect(&mock_server).await;
        assert_eq!(server.machine_identifier, "machine-1");
        assert_eq!(server.name(), "Home");
    }

    #[tokio::test]
    async fn test_playlists() {
        let mock_server = mock_server_with_identity().await;
        Mock::given(method("GET"))
            .and(path("/playlists"))
            .and(header("X-Plex-Client-Identifier", "client-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"size": 2, "Metadata": [
                    {"ratingKey": "100", "title": "Road trip", "playlistType": "audio", "smart": false},
                    {"ratingKey": "101", "title": "Recently played", "playlistType": "audio", "smart": true}
                ]}
            })))
            .mount(&mock_server)
            .await;

        let server = connect(&mock_server).await;
        let playlists = server.playlists().await.unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!(playlists[0].title, "Road trip");
        assert!(playlists[1].smart);
    }

    #[tokio::test]
    async fn test_move_item_after_previous() {
        let mock_server = mock_server_with_identity().await;
        Mock::given(method("PUT"))
            .and(path("/playlists/100/items/2/move"))
            .and(query_param("after", "1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = connect(&mock_server).await;
        let first = MediaItem {
            rating_key: "10".to_string(),
            playlist_item_id: Some(1),
            ..Default::default()
        };
        let second = MediaItem {
            rating_key: "11".to_string(),
            playlist_item_id: Some(2),
            ..Default::default()
        };
        server
            .move_item(&playlist(), &second, Some(&first))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_item_requires_playlist_entry() {
        let mock_server = mock_server_with_identity().await;
        let server = connect(&mock_server).await;
        let library_track = MediaItem {
            rating_key: "10".to_string(),
            ..Default::default()
        };
        assert!(server
            .move_item(&playlist(), &library_track, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_create_playlist_uses_server_uri() {
        let mock_server = mock_server_with_identity().await;
        Mock::given(method("POST"))
            .and(path("/playlists"))
            .and(query_param("title", "Copy of Road trip"))
            .and(query_param("type", "audio"))
            .and(query_param(
                "uri",
                "server://machine-1/com.plexapp.plugins.library/library/metadata/10,11",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [
                    {"ratingKey": "200", "title": "Copy of Road trip", "playlistType": "audio"}
                ]}
            })))
            .mount(&mock_server)
            .await;

        let server = connect(&mock_server).await;
        let items = ["10", "11"]
            .iter()
            .map(|key| MediaItem {
                rating_key: key.to_string(),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let created = server
            .create_playlist("Copy of Road trip", "", PlaylistType::Audio, &items)
            .await
            .unwrap();
        assert_eq!(created.rating_key, "200");
    }

    #[tokio::test]
    async fn test_search_tracks() {
        let mock_server = mock_server_with_identity().await;
        Mock::given(method("GET"))
            .and(path("/library/all"))
            .and(query_param("type", "10"))
            .and(query_param("title", "Strobe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [
                    {"ratingKey": "55", "type": "track", "title": "Strobe",
                     "grandparentTitle": "deadmau5",
                     "Media": [{"bitrate": 1011, "audioCodec": "flac"}]}
                ]}
            })))
            .mount(&mock_server)
            .await;

        let server = connect(&mock_server).await;
        let results = server.search_tracks("Strobe").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_lossless());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mock_server = mock_server_with_identity().await;
        Mock::given(method("GET"))
            .and(path("/library/sections"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let server = connect(&mock_server).await;
        assert!(server.sections().await.is_err());
    }
}
