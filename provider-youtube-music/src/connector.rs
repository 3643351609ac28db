//! YouTube Music InnerTube connector
//!
//! Implements `RemotePlaylistAccessor`, `PlaylistDirectory` and
//! `TrackMetadataSource` on top of the `youtubei/v1` endpoints used by the
//! YouTube Music web client.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::playlist::{
    ItemId, PlaylistDirectory, PlaylistEntry, PlaylistId, PlaylistSnapshot, PlaylistSummary,
    PrivacyStatus, RemotePlaylistAccessor, SlotId, TrackMetadata, TrackMetadataSource,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthHeaders;
use crate::error::YouTubeMusicError;
use crate::types::{
    BrowseRequest, BrowseResponse, ClientContext, ContentItem, ContentPage, Context, Continuation,
    CreatePlaylistRequest, CreatePlaylistResponse, EditAction, EditPlaylistRequest,
    EditPlaylistResponse, PlayerRequest, PlayerResponse, PlaylistIdRequest, UserContext,
};

/// InnerTube API base URL
const API_BASE: &str = "https://music.youtube.com/youtubei/v1";

const API_PARAMS: &str = "alt=json&prettyPrint=false";

const CLIENT_NAME: &str = "WEB_REMIX";

/// Browse id of the signed-in user's playlist library
const LIBRARY_PLAYLISTS: &str = "FEmusic_liked_playlists";

/// Stops a listing whose continuation tokens never run out
const MAX_PAGES: usize = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// YouTube Music InnerTube connector
///
/// Every trait method issues the minimum number of requests for the call and
/// reports failures as classified [`BridgeError::Remote`] values; retrying
/// is left to the caller.
///
/// # Example
///
/// ```ignore
/// use provider_youtube_music::{AuthHeaders, YouTubeMusicConnector};
/// use bridge_traits::playlist::RemotePlaylistAccessor;
///
/// let auth = AuthHeaders::from_json(&std::fs::read("browser.json")?)?;
/// let connector = YouTubeMusicConnector::new(http_client, auth);
/// let snapshot = connector.list_items(&"PLxxxxxxxx".into()).await?;
/// ```
///
/// [`BridgeError::Remote`]: bridge_traits::error::BridgeError::Remote
pub struct YouTubeMusicConnector {
    http_client: Arc<dyn HttpClient>,
    auth: AuthHeaders,
    context: Context,
}

impl YouTubeMusicConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, auth: AuthHeaders) -> Self {
        let version = Utc::now().format("1.%Y%m%d.01.00").to_string();
        Self::with_client_version(http_client, auth, version)
    }

    pub fn with_client_version(
        http_client: Arc<dyn HttpClient>,
        auth: AuthHeaders,
        client_version: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            auth,
            context: Context {
                client: ClientContext {
                    client_name: CLIENT_NAME,
                    client_version: client_version.into(),
                    hl: "en",
                },
                user: UserContext::default(),
            },
        }
    }

    /// `VL`-prefixed id used by browse requests
    fn browse_id(playlist_id: &PlaylistId) -> String {
        let id = playlist_id.as_str();
        if id.starts_with("VL") {
            id.to_string()
        } else {
            format!("VL{}", id)
        }
    }

    /// Bare id used by edit, create and delete requests
    fn bare_id(playlist_id: &PlaylistId) -> &str {
        let id = playlist_id.as_str();
        id.strip_prefix("VL").unwrap_or(id)
    }

    async fn post<B, R>(&self, endpoint: &str, extra_query: &str, body: &B) -> crate::Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}?{}{}", API_BASE, endpoint, API_PARAMS, extra_query);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .headers(&self.auth.request_headers())
            .timeout(REQUEST_TIMEOUT)
            .json(body)?;

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            let mut message = String::from_utf8_lossy(&response.body).into_owned();
            message.truncate(200);
            warn!(endpoint, status = response.status, "API request failed");
            return Err(YouTubeMusicError::ApiError {
                status_code: response.status,
                message,
            });
        }

        if response.body.is_empty() {
            return Err(YouTubeMusicError::ParseError(format!(
                "empty response from {}",
                endpoint
            )));
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            YouTubeMusicError::ParseError(format!("Failed to parse {} response: {}", endpoint, e))
        })
    }

    /// Walk a browse listing through all continuation pages.
    ///
    /// Returns `None` when the first page has no contents at all, which is
    /// how the service answers for ids it does not know.
    async fn browse_all(&self, browse_id: &str) -> crate::Result<Option<Vec<ContentItem>>> {
        let first: BrowseResponse = self
            .post(
                "browse",
                "",
                &BrowseRequest {
                    context: &self.context,
                    browse_id: Some(browse_id.to_string()),
                    continuation: None,
                },
            )
            .await?;
        if first.contents.is_none() {
            return Ok(None);
        }

        let ContentPage {
            mut items,
            mut continuation,
        } = first.into_page();

        let mut pages = 1;
        while let Some(next) = continuation.take() {
            if pages >= MAX_PAGES {
                warn!(browse_id, pages, "Stopping listing at page limit");
                break;
            }
            let response: BrowseResponse = match &next {
                Continuation::Command(token) => {
                    self.post(
                        "browse",
                        "",
                        &BrowseRequest {
                            context: &self.context,
                            browse_id: None,
                            continuation: Some(token.clone()),
                        },
                    )
                    .await?
                }
                Continuation::Legacy(token) => {
                    let token = urlencoding::encode(token);
                    let query = format!("&ctoken={}&continuation={}&type=next", token, token);
                    self.post(
                        "browse",
                        &query,
                        &BrowseRequest {
                            context: &self.context,
                            browse_id: None,
                            continuation: None,
                        },
                    )
                    .await?
                }
            };

            let page = response.into_page();
            debug!(browse_id, page = pages, items = page.items.len(), "Fetched continuation");
            items.extend(page.items);
            continuation = page.continuation.filter(|c| *c != next);
            pages += 1;
        }

        Ok(Some(items))
    }

    async fn edit(&self, playlist_id: &PlaylistId, actions: Vec<EditAction>) -> crate::Result<()> {
        let count = actions.len();
        let response: EditPlaylistResponse = self
            .post(
                "browse/edit_playlist",
                "",
                &EditPlaylistRequest {
                    context: &self.context,
                    playlist_id: Self::bare_id(playlist_id),
                    actions,
                },
            )
            .await?;

        match response.status.as_deref() {
            Some(status) if status.contains("SUCCEEDED") => {
                debug!(playlist_id = %playlist_id, actions = count, "Playlist edit succeeded");
                Ok(())
            }
            other => Err(YouTubeMusicError::EditRejected {
                status: other.unwrap_or("missing status").to_string(),
            }),
        }
    }

    fn to_entry(item: ContentItem) -> Option<PlaylistEntry> {
        let data = item.music_responsive_list_item_renderer?.playlist_item_data?;
        match data.playlist_set_video_id {
            Some(slot) if !data.video_id.is_empty() => Some(PlaylistEntry::new(data.video_id, slot)),
            _ => {
                debug!(video_id = %data.video_id, "Skipping row without a slot id");
                None
            }
        }
    }

    fn to_summary(item: ContentItem) -> Option<PlaylistSummary> {
        let renderer = item.music_two_row_item_renderer?;
        let browse_id = renderer
            .navigation_endpoint?
            .browse_endpoint?
            .browse_id;
        // The "New playlist" tile and auto mixes have no VL browse id
        let id = browse_id.strip_prefix("VL")?;
        Some(PlaylistSummary {
            id: PlaylistId::from(id),
            title: renderer.title.text(),
        })
    }

    fn strip_topic(author: &str) -> String {
        author
            .trim()
            .strip_suffix(" - Topic")
            .unwrap_or(author.trim())
            .to_string()
    }
}

#[async_trait]
impl RemotePlaylistAccessor for YouTubeMusicConnector {
    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    async fn list_items(&self, playlist_id: &PlaylistId) -> Result<PlaylistSnapshot> {
        let items = self
            .browse_all(&Self::browse_id(playlist_id))
            .await?
            .ok_or_else(|| YouTubeMusicError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            })?;

        let entries: Vec<PlaylistEntry> = items.into_iter().filter_map(Self::to_entry).collect();
        debug!(entries = entries.len(), "Listed playlist items");
        Ok(PlaylistSnapshot::new(entries))
    }

    #[instrument(skip(self, item_ids), fields(playlist_id = %playlist_id, items = item_ids.len()))]
    async fn add_items(
        &self,
        playlist_id: &PlaylistId,
        item_ids: &[ItemId],
        allow_duplicates: bool,
    ) -> Result<()> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let actions = item_ids
            .iter()
            .map(|id| EditAction::add(id.as_str(), allow_duplicates))
            .collect();
        Ok(self.edit(playlist_id, actions).await?)
    }

    #[instrument(skip(self, entries), fields(playlist_id = %playlist_id, slots = entries.len()))]
    async fn remove_slots(&self, playlist_id: &PlaylistId, entries: &[PlaylistEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let actions = entries
            .iter()
            .map(|e| EditAction::remove(e.item_id.as_str(), e.slot_id.as_str()))
            .collect();
        Ok(self.edit(playlist_id, actions).await?)
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    async fn move_slot(
        &self,
        playlist_id: &PlaylistId,
        slot: &SlotId,
        before: Option<&SlotId>,
    ) -> Result<()> {
        let action = EditAction::move_before(slot.as_str(), before.map(SlotId::as_str));
        Ok(self.edit(playlist_id, vec![action]).await?)
    }
}

#[async_trait]
impl PlaylistDirectory for YouTubeMusicConnector {
    #[instrument(skip(self))]
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let items = self.browse_all(LIBRARY_PLAYLISTS).await?.unwrap_or_default();
        let playlists: Vec<PlaylistSummary> =
            items.into_iter().filter_map(Self::to_summary).collect();
        info!("Listed {} library playlists", playlists.len());
        Ok(playlists)
    }

    #[instrument(skip(self, description, item_ids), fields(items = item_ids.len()))]
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
        item_ids: &[ItemId],
    ) -> Result<PlaylistId> {
        let response: CreatePlaylistResponse = self
            .post(
                "playlist/create",
                "",
                &CreatePlaylistRequest {
                    context: &self.context,
                    title,
                    description,
                    privacy_status: privacy.as_str(),
                    video_ids: item_ids.iter().map(ItemId::as_str).collect(),
                },
            )
            .await?;

        let id = response
            .playlist_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                YouTubeMusicError::ParseError("create response has no playlistId".to_string())
            })?;
        info!(playlist_id = %id, "Created playlist");
        Ok(PlaylistId::new(id))
    }

    #[instrument(skip(self, description), fields(playlist_id = %playlist_id))]
    async fn update_details(
        &self,
        playlist_id: &PlaylistId,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<()> {
        let actions = vec![
            EditAction::rename(title),
            EditAction::describe(description),
            EditAction::privacy(privacy.as_str()),
        ];
        Ok(self.edit(playlist_id, actions).await?)
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "playlist/delete",
                "",
                &PlaylistIdRequest {
                    context: &self.context,
                    playlist_id: Self::bare_id(playlist_id),
                },
            )
            .await?;
        info!("Deleted playlist");
        Ok(())
    }
}

#[async_trait]
impl TrackMetadataSource for YouTubeMusicConnector {
    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn track_metadata(&self, item_id: &ItemId) -> Result<Option<TrackMetadata>> {
        let response: PlayerResponse = self
            .post(
                "player",
                "",
                &PlayerRequest {
                    context: &self.context,
                    video_id: item_id.as_str(),
                },
            )
            .await?;

        if let Some(status) = &response.playability_status {
            if status.status == "ERROR" {
                debug!("Item is not playable");
                return Ok(None);
            }
        }

        Ok(response.video_details.map(|details| {
            let artist = Self::strip_topic(&details.author);
            TrackMetadata {
                item_id: item_id.clone(),
                title: details.title,
                artists: if artist.is_empty() { Vec::new() } else { vec![artist] },
                album: None,
                duration_seconds: details.length_seconds.and_then(|s| s.parse().ok()),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, RemoteErrorKind};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn auth() -> AuthHeaders {
        AuthHeaders::from_json(br#"{"cookie": "SAPISID=abc", "authorization": "SAPISIDHASH x"}"#)
            .unwrap()
    }

    fn connector(mock_http: MockHttpClient) -> YouTubeMusicConnector {
        YouTubeMusicConnector::with_client_version(Arc::new(mock_http), auth(), "1.20240501.01.00")
    }

    fn ok(body: &'static str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }

    fn body_of(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
    }

    const FIRST_PAGE: &str = r#"{
        "contents": {
            "twoColumnBrowseResultsRenderer": {
                "secondaryContents": {
                    "sectionListRenderer": {
                        "contents": [{
                            "musicPlaylistShelfRenderer": {
                                "contents": [
                                    {"musicResponsiveListItemRenderer": {"playlistItemData": {
                                        "videoId": "dQw4w9WgXcQ", "playlistSetVideoId": "56B44F6D10557CC6"}}},
                                    {"musicResponsiveListItemRenderer": {"playlistItemData": {
                                        "videoId": "unplayable1"}}},
                                    {"continuationItemRenderer": {"continuationEndpoint": {
                                        "continuationCommand": {"token": "next-token"}}}}
                                ]
                            }
                        }]
                    }
                }
            }
        }
    }"#;

    const SECOND_PAGE: &str = r#"{
        "onResponseReceivedActions": [{
            "appendContinuationItemsAction": {
                "continuationItems": [
                    {"musicResponsiveListItemRenderer": {"playlistItemData": {
                        "videoId": "9bZkp7q19f0", "playlistSetVideoId": "2089F05AB7F8B6F1"}}}
                ]
            }
        }]
    }"#;

    #[tokio::test]
    async fn test_list_items_follows_continuations() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.starts_with("https://music.youtube.com/youtubei/v1/browse?"));
                assert_eq!(req.headers.get("cookie").map(String::as_str), Some("SAPISID=abc"));
                let body = body_of(&req);
                assert_eq!(body["browseId"], "VLPL123");
                assert_eq!(body["context"]["client"]["clientName"], "WEB_REMIX");
                ok(FIRST_PAGE)
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                let body = body_of(&req);
                assert_eq!(body["continuation"], "next-token");
                assert!(body.get("browseId").is_none());
                ok(SECOND_PAGE)
            });

        let snapshot = connector(mock_http)
            .list_items(&PlaylistId::from("PL123"))
            .await
            .unwrap();

        assert_eq!(
            snapshot.entries,
            vec![
                PlaylistEntry::new("dQw4w9WgXcQ", "56B44F6D10557CC6"),
                PlaylistEntry::new("9bZkp7q19f0", "2089F05AB7F8B6F1"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_items_legacy_continuation_uses_query() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                ok(r#"{"contents": {"singleColumnBrowseResultsRenderer": {"tabs": [{"tabRenderer": {"content": {
                    "sectionListRenderer": {"contents": [{"musicPlaylistShelfRenderer": {
                        "contents": [],
                        "continuations": [{"nextContinuationData": {"continuation": "a+b"}}]
                    }}]}}}}]}}}"#)
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.contains("&ctoken=a%2Bb&continuation=a%2Bb&type=next"));
                ok(r#"{"continuationContents": {"musicPlaylistShelfContinuation": {"contents": [
                    {"musicResponsiveListItemRenderer": {"playlistItemData": {
                        "videoId": "dQw4w9WgXcQ", "playlistSetVideoId": "S1"}}}
                ]}}}"#)
            });

        let snapshot = connector(mock_http)
            .list_items(&PlaylistId::from("VLPL123"))
            .await
            .unwrap();

        assert_eq!(snapshot.entries, vec![PlaylistEntry::new("dQw4w9WgXcQ", "S1")]);
    }

    #[tokio::test]
    async fn test_list_items_unknown_playlist() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| ok(r#"{"responseContext": {}}"#));

        let err = connector(mock_http)
            .list_items(&PlaylistId::from("PLgone"))
            .await
            .unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 429,
                headers: HashMap::new(),
                body: Bytes::from("quota"),
            })
        });

        let err = connector(mock_http)
            .list_items(&PlaylistId::from("PL123"))
            .await
            .unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::RateLimited));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_network_error_passes_through() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::remote(RemoteErrorKind::Network, "reset")));

        let err = connector(mock_http).delete_playlist(&PlaylistId::from("PL1")).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::Network));
    }

    #[tokio::test]
    async fn test_add_items_builds_edit_actions() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("/browse/edit_playlist?"));
            let body = body_of(&req);
            assert_eq!(body["playlistId"], "PL123");
            let actions = body["actions"].as_array().unwrap();
            assert_eq!(actions.len(), 2);
            assert_eq!(actions[0]["action"], "ACTION_ADD_VIDEO");
            assert_eq!(actions[0]["addedVideoId"], "dQw4w9WgXcQ");
            assert_eq!(actions[0]["dedupeOption"], "DEDUPE_OPTION_SKIP");
            ok(r#"{"status": "STATUS_SUCCEEDED"}"#)
        });

        connector(mock_http)
            .add_items(
                &PlaylistId::from("VLPL123"),
                &[ItemId::from("dQw4w9WgXcQ"), ItemId::from("9bZkp7q19f0")],
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_edit_is_transient() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| ok(r#"{"status": "STATUS_FAILED"}"#));

        let err = connector(mock_http)
            .remove_slots(
                &PlaylistId::from("PL123"),
                &[PlaylistEntry::new("dQw4w9WgXcQ", "S1")],
            )
            .await
            .unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::ServerError));
    }

    #[tokio::test]
    async fn test_empty_mutations_skip_requests() {
        let mock_http = MockHttpClient::new();
        let connector = connector(mock_http);

        connector
            .add_items(&PlaylistId::from("PL1"), &[], false)
            .await
            .unwrap();
        connector
            .remove_slots(&PlaylistId::from("PL1"), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_to_end_omits_successor() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                let action = &body_of(&req)["actions"][0];
                assert_eq!(action["action"], "ACTION_MOVE_VIDEO_BEFORE");
                assert_eq!(action["setVideoId"], "S1");
                assert_eq!(action["movedSetVideoIdSuccessor"], "S2");
                ok(r#"{"status": "STATUS_SUCCEEDED"}"#)
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                let action = &body_of(&req)["actions"][0];
                assert!(action.get("movedSetVideoIdSuccessor").is_none());
                ok(r#"{"status": "STATUS_SUCCEEDED"}"#)
            });

        let connector = connector(mock_http);
        let playlist = PlaylistId::from("PL1");
        connector
            .move_slot(&playlist, &SlotId::from("S1"), Some(&SlotId::from("S2")))
            .await
            .unwrap();
        connector
            .move_slot(&playlist, &SlotId::from("S1"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_playlists_skips_non_playlist_tiles() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(body_of(&req)["browseId"], "FEmusic_liked_playlists");
            ok(r#"{"contents": {"singleColumnBrowseResultsRenderer": {"tabs": [{"tabRenderer": {"content": {
                "sectionListRenderer": {"contents": [{"gridRenderer": {"items": [
                    {"musicTwoRowItemRenderer": {"title": {"runs": [{"text": "New playlist"}]},
                        "navigationEndpoint": {"createPlaylistEndpoint": {}}}},
                    {"musicTwoRowItemRenderer": {"title": {"runs": [{"text": "Last.fm "}, {"text": "Recents"}]},
                        "navigationEndpoint": {"browseEndpoint": {"browseId": "VLPLabc"}}}},
                    {"musicTwoRowItemRenderer": {"title": {"runs": [{"text": "Liked Music"}]},
                        "navigationEndpoint": {"browseEndpoint": {"browseId": "VLLM"}}}}
                ]}}]}}}}]}}}"#)
        });

        let playlists = connector(mock_http).list_playlists().await.unwrap();

        assert_eq!(
            playlists,
            vec![
                PlaylistSummary {
                    id: PlaylistId::from("PLabc"),
                    title: "Last.fm Recents".to_string(),
                },
                PlaylistSummary {
                    id: PlaylistId::from("LM"),
                    title: "Liked Music".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_playlist() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("/playlist/create?"));
            let body = body_of(&req);
            assert_eq!(body["title"], "Recents");
            assert_eq!(body["privacyStatus"], "PRIVATE");
            assert_eq!(body["videoIds"][0], "dQw4w9WgXcQ");
            ok(r#"{"playlistId": "PLnew"}"#)
        });

        let id = connector(mock_http)
            .create_playlist(
                "Recents",
                "auto",
                PrivacyStatus::Private,
                &[ItemId::from("dQw4w9WgXcQ")],
            )
            .await
            .unwrap();

        assert_eq!(id, PlaylistId::from("PLnew"));
    }

    #[tokio::test]
    async fn test_create_without_id_is_malformed() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| ok("{}"));

        let err = connector(mock_http)
            .create_playlist("Recents", "", PrivacyStatus::Public, &[])
            .await
            .unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::MalformedResponse));
    }

    #[tokio::test]
    async fn test_update_details_sends_three_actions() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            let body = body_of(&req);
            let kinds: Vec<&str> = body["actions"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["action"].as_str().unwrap())
                .collect();
            assert_eq!(
                kinds,
                vec![
                    "ACTION_SET_PLAYLIST_NAME",
                    "ACTION_SET_PLAYLIST_DESCRIPTION",
                    "ACTION_SET_PLAYLIST_PRIVACY"
                ]
            );
            assert_eq!(body["actions"][2]["playlistPrivacy"], "UNLISTED");
            ok(r#"{"status": "STATUS_SUCCEEDED"}"#)
        });

        connector(mock_http)
            .update_details(&PlaylistId::from("PL1"), "t", "d", PrivacyStatus::Unlisted)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_track_metadata() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("/player?"));
            assert_eq!(body_of(&req)["videoId"], "dQw4w9WgXcQ");
            ok(r#"{"playabilityStatus": {"status": "OK"}, "videoDetails": {
                "videoId": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up",
                "author": "Rick Astley - Topic", "lengthSeconds": "213"}}"#)
        });

        let meta = connector(mock_http)
            .track_metadata(&ItemId::from("dQw4w9WgXcQ"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(meta.title, "Never Gonna Give You Up");
        assert_eq!(meta.artists, vec!["Rick Astley".to_string()]);
        assert_eq!(meta.duration_seconds, Some(213));
        assert_eq!(meta.album, None);
    }

    #[tokio::test]
    async fn test_track_metadata_unplayable() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| ok(r#"{"playabilityStatus": {"status": "ERROR"}}"#));

        let meta = connector(mock_http)
            .track_metadata(&ItemId::from("dQw4w9WgXcQ"))
            .await
            .unwrap();

        assert!(meta.is_none());
    }
}
