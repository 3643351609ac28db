//! # Host Bridge Traits
//!
//! Contracts between the playlist reconciliation core and the outside world.
//!
//! ## Overview
//!
//! This crate defines every capability the core consumes but does not
//! implement itself. The core only ever talks to these traits; concrete
//! adapters live in `bridge-desktop` (HTTP, file system) and in provider crates
//! such as `provider-youtube-music` (remote playlist service).
//!
//! ## Traits
//!
//! ### Remote playlist service
//! - [`RemotePlaylistAccessor`](playlist::RemotePlaylistAccessor) - Read and mutate one playlist
//! - [`PlaylistDirectory`](playlist::PlaylistDirectory) - List, create and delete playlists
//! - [`TrackMetadataSource`](playlist::TrackMetadataSource) - Title/artist/duration lookups
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O for persistent caches
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Failures that
//! come from a remote service carry a [`RemoteErrorKind`](error::RemoteErrorKind)
//! assigned at the transport boundary; the core decides whether to retry from
//! that kind alone.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across async
//! tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod playlist;
pub mod storage;
pub mod time;

pub use error::{BridgeError, RemoteErrorKind};

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playlist::{
    ItemId, PlaylistDirectory, PlaylistEntry, PlaylistId, PlaylistSnapshot, PlaylistSummary,
    PrivacyStatus, RemotePlaylistAccessor, SlotId, TrackMetadata, TrackMetadataSource,
};
pub use storage::FileSystemAccess;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
