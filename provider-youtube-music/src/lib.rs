//! # YouTube Music Provider
//!
//! Implements the bridge playlist traits (`RemotePlaylistAccessor`,
//! `PlaylistDirectory`, `TrackMetadataSource`) against the YouTube Music
//! InnerTube API.
//!
//! ## Overview
//!
//! This module provides:
//! - Browser-header authentication loaded from a JSON file
//! - Paginated playlist listing with continuation tokens
//! - Batched add/remove and slot moves through `browse/edit_playlist`
//! - Playlist create/delete and library listing
//! - Track metadata lookups through the `player` endpoint
//!
//! Retries, chunking and per-item fallback are not done here; every call is
//! a single request whose failure is classified into a
//! [`RemoteErrorKind`](bridge_traits::error::RemoteErrorKind).

pub mod auth;
pub mod connector;
pub mod error;
pub mod types;

pub use auth::AuthHeaders;
pub use connector::YouTubeMusicConnector;
pub use error::{Result, YouTubeMusicError};
