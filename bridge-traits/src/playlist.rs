//! Remote Playlist Abstractions
//!
//! Data model and contracts for a hosted, ordered playlist service.
//!
//! ## Overview
//!
//! A remote playlist is an ordered list of *slots*. Each slot holds one item
//! (a playable track) and is addressed by its own [`SlotId`], distinct from the
//! [`ItemId`] of the track it holds. Moves and removals target slots; additions
//! take item ids and the service assigns the slot ids, which therefore cannot be
//! predicted by the caller.
//!
//! Implementations perform exactly one remote request per method call. Retry,
//! chunking and partial-failure handling are layered on top by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Length of a well-formed item identifier on the hosted service.
pub const ITEM_ID_LEN: usize = 11;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Identifier of a playable item. Equality is exact and case-sensitive.
    ///
    /// Construction does not validate: identifiers read back from the remote
    /// service may be malformed and must still be representable so that their
    /// slots can be removed.
    ItemId
);

opaque_id!(
    /// Identifier of one occurrence of an item inside a specific playlist
    SlotId
);

opaque_id!(
    /// Identifier of a remote playlist
    PlaylistId
);

impl ItemId {
    /// Exactly [`ITEM_ID_LEN`] characters from the URL-safe base64 alphabet.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ITEM_ID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

/// One slot of a remote playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub item_id: ItemId,
    pub slot_id: SlotId,
}

impl PlaylistEntry {
    pub fn new(item_id: impl Into<ItemId>, slot_id: impl Into<SlotId>) -> Self {
        Self {
            item_id: item_id.into(),
            slot_id: slot_id.into(),
        }
    }
}

/// Ordered contents of a remote playlist at the time it was read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub entries: Vec<PlaylistEntry>,
}

impl PlaylistSnapshot {
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Well-formed item ids in playlist order (duplicates preserved)
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter(|entry| entry.item_id.is_well_formed())
            .map(|entry| entry.item_id.clone())
            .collect()
    }
}

/// Lightweight descriptive metadata of a single item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub item_id: ItemId,
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<u32>,
}

/// Playlist visibility on the hosted service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "PUBLIC",
            PrivacyStatus::Private => "PRIVATE",
            PrivacyStatus::Unlisted => "UNLISTED",
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PUBLIC" => Ok(PrivacyStatus::Public),
            "PRIVATE" => Ok(PrivacyStatus::Private),
            "UNLISTED" => Ok(PrivacyStatus::Unlisted),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown privacy status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the user's playlist library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub title: String,
}

/// Read and mutate the contents of a remote playlist
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playlist::{PlaylistId, RemotePlaylistAccessor};
///
/// async fn count(accessor: &dyn RemotePlaylistAccessor, id: &PlaylistId) -> Result<usize> {
///     Ok(accessor.list_items(id).await?.len())
/// }
/// ```
#[async_trait]
pub trait RemotePlaylistAccessor: Send + Sync {
    /// Read every slot of the playlist, in order
    async fn list_items(&self, playlist_id: &PlaylistId) -> Result<PlaylistSnapshot>;

    /// Append items to the end of the playlist
    ///
    /// With `allow_duplicates == false` the service skips items already present.
    async fn add_items(
        &self,
        playlist_id: &PlaylistId,
        item_ids: &[ItemId],
        allow_duplicates: bool,
    ) -> Result<()>;

    /// Remove the given slots
    async fn remove_slots(&self, playlist_id: &PlaylistId, entries: &[PlaylistEntry]) -> Result<()>;

    /// Move one slot so it sits immediately before `before`, or at the end when `None`
    async fn move_slot(
        &self,
        playlist_id: &PlaylistId,
        slot: &SlotId,
        before: Option<&SlotId>,
    ) -> Result<()>;
}

/// Enumerate, create and delete playlists in the user's library
#[async_trait]
pub trait PlaylistDirectory: Send + Sync {
    /// All playlists owned by the user
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>>;

    /// Create a playlist pre-populated with `item_ids`
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
        item_ids: &[ItemId],
    ) -> Result<PlaylistId>;

    /// Update title, description and privacy of an existing playlist
    async fn update_details(
        &self,
        playlist_id: &PlaylistId,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<()>;

    async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<()>;
}

/// Fetch descriptive metadata for a single item
#[async_trait]
pub trait TrackMetadataSource: Send + Sync {
    /// `Ok(None)` when the service knows nothing about the item
    async fn track_metadata(&self, item_id: &ItemId) -> Result<Option<TrackMetadata>>;
}
