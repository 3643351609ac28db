//! YouTube Music InnerTube wire types
//!
//! Request bodies and the subset of response renderers the connector reads.
//! Responses are deeply nested and vary between page layouts, so every
//! renderer field is optional and missing pieces deserialize as empty.

use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Client context sent with every request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub client: ClientContext,
    pub user: UserContext,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub client_name: &'static str,
    pub client_version: String,
    pub hl: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserContext {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseRequest<'a> {
    pub context: &'a Context,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPlaylistRequest<'a> {
    pub context: &'a Context,
    pub playlist_id: &'a str,
    pub actions: Vec<EditAction>,
}

/// One `browse/edit_playlist` action
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAction {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedupe_option: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_set_video_id_successor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_privacy: Option<&'static str>,
}

impl EditAction {
    pub fn add(video_id: &str, allow_duplicates: bool) -> Self {
        Self {
            action: "ACTION_ADD_VIDEO",
            added_video_id: Some(video_id.to_string()),
            dedupe_option: (!allow_duplicates).then_some("DEDUPE_OPTION_SKIP"),
            ..Self::default()
        }
    }

    pub fn remove(video_id: &str, set_video_id: &str) -> Self {
        Self {
            action: "ACTION_REMOVE_VIDEO",
            removed_video_id: Some(video_id.to_string()),
            set_video_id: Some(set_video_id.to_string()),
            ..Self::default()
        }
    }

    /// Without a successor the slot moves to the end
    pub fn move_before(set_video_id: &str, successor: Option<&str>) -> Self {
        Self {
            action: "ACTION_MOVE_VIDEO_BEFORE",
            set_video_id: Some(set_video_id.to_string()),
            moved_set_video_id_successor: successor.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn rename(title: &str) -> Self {
        Self {
            action: "ACTION_SET_PLAYLIST_NAME",
            playlist_name: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn describe(description: &str) -> Self {
        Self {
            action: "ACTION_SET_PLAYLIST_DESCRIPTION",
            playlist_description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn privacy(privacy: &'static str) -> Self {
        Self {
            action: "ACTION_SET_PLAYLIST_PRIVACY",
            playlist_privacy: Some(privacy),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest<'a> {
    pub context: &'a Context,
    pub title: &'a str,
    pub description: &'a str,
    pub privacy_status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub video_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistIdRequest<'a> {
    pub context: &'a Context,
    pub playlist_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest<'a> {
    pub context: &'a Context,
    pub video_id: &'a str,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowseResponse {
    pub contents: Option<BrowseContents>,
    pub continuation_contents: Option<ContinuationContents>,
    pub on_response_received_actions: Vec<ResponseAction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowseContents {
    pub two_column_browse_results_renderer: Option<TwoColumnRenderer>,
    pub single_column_browse_results_renderer: Option<SingleColumnRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwoColumnRenderer {
    pub secondary_contents: Option<SectionListHolder>,
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SingleColumnRenderer {
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub tab_renderer: Option<TabRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabRenderer {
    pub content: Option<SectionListHolder>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionListHolder {
    pub section_list_renderer: Option<SectionListRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionListRenderer {
    pub contents: Vec<Section>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    pub music_playlist_shelf_renderer: Option<ItemList>,
    pub grid_renderer: Option<ItemList>,
}

/// Shelf or grid body; playlists use `contents`, grids use `items`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemList {
    #[serde(alias = "items")]
    pub contents: Vec<ContentItem>,
    pub continuations: Vec<LegacyContinuation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuationContents {
    pub music_playlist_shelf_continuation: Option<ItemList>,
    pub grid_continuation: Option<ItemList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseAction {
    pub append_continuation_items_action: Option<AppendItems>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppendItems {
    pub continuation_items: Vec<ContentItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentItem {
    pub music_responsive_list_item_renderer: Option<ListItemRenderer>,
    pub music_two_row_item_renderer: Option<TwoRowItemRenderer>,
    pub continuation_item_renderer: Option<ContinuationItemRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListItemRenderer {
    pub playlist_item_data: Option<PlaylistItemData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemData {
    pub video_id: String,
    pub playlist_set_video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwoRowItemRenderer {
    pub title: Runs,
    pub navigation_endpoint: Option<NavigationEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationEndpoint {
    pub browse_endpoint: Option<BrowseEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowseEndpoint {
    pub browse_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Runs {
    pub runs: Vec<Run>,
}

impl Runs {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Run {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuationItemRenderer {
    pub continuation_endpoint: Option<ContinuationEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuationEndpoint {
    pub continuation_command: Option<ContinuationCommand>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContinuationCommand {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyContinuation {
    pub next_continuation_data: Option<NextContinuationData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextContinuationData {
    pub continuation: String,
}

/// Where the next page of a listing comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Sent as `continuation` in the request body
    Command(String),
    /// Sent as `ctoken`/`continuation` query parameters
    Legacy(String),
}

/// Items of one listing page
#[derive(Debug, Default)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub continuation: Option<Continuation>,
}

impl BrowseResponse {
    /// Flatten whichever layout the response used into one page
    pub fn into_page(mut self) -> ContentPage {
        let mut lists: Vec<ItemList> = Vec::new();
        lists.extend(self.take_first_list());
        if let Some(continued) = self.continuation_contents.take() {
            lists.extend(continued.music_playlist_shelf_continuation);
            lists.extend(continued.grid_continuation);
        }

        let mut page = ContentPage::default();

        let mut raw = Vec::new();
        for list in lists {
            if page.continuation.is_none() {
                page.continuation = list
                    .continuations
                    .iter()
                    .filter_map(|c| c.next_continuation_data.as_ref())
                    .map(|d| Continuation::Legacy(d.continuation.clone()))
                    .next();
            }
            raw.extend(list.contents);
        }
        for action in self.on_response_received_actions {
            if let Some(append) = action.append_continuation_items_action {
                raw.extend(append.continuation_items);
            }
        }

        for item in raw {
            let token = item
                .continuation_item_renderer
                .as_ref()
                .and_then(|c| c.continuation_endpoint.as_ref())
                .and_then(|e| e.continuation_command.as_ref())
                .map(|command| command.token.clone());
            match token {
                Some(token) => page.continuation = Some(Continuation::Command(token)),
                None => page.items.push(item),
            }
        }
        page
    }

    /// Only the first shelf is the listing itself; later shelves are suggestions
    fn take_first_list(&mut self) -> Option<ItemList> {
        let contents = self.contents.as_mut()?;
        let mut holders: Vec<&mut SectionListHolder> = Vec::new();
        if let Some(two) = contents.two_column_browse_results_renderer.as_mut() {
            holders.extend(two.secondary_contents.as_mut());
            holders.extend(
                two.tabs
                    .iter_mut()
                    .filter_map(|t| t.tab_renderer.as_mut()?.content.as_mut()),
            );
        }
        if let Some(single) = contents.single_column_browse_results_renderer.as_mut() {
            holders.extend(
                single
                    .tabs
                    .iter_mut()
                    .filter_map(|t| t.tab_renderer.as_mut()?.content.as_mut()),
            );
        }

        holders
            .into_iter()
            .filter_map(|h| h.section_list_renderer.as_mut())
            .flat_map(|list| list.contents.iter_mut())
            .find_map(|section| {
                section
                    .music_playlist_shelf_renderer
                    .take()
                    .or_else(|| section.grid_renderer.take())
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditPlaylistResponse {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePlaylistResponse {
    pub playlist_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayabilityStatus {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub author: String,
    /// Decimal string
    pub length_seconds: Option<String>,
}
