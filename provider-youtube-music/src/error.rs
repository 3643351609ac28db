//! Error types for the YouTube Music provider

use bridge_traits::error::{BridgeError, RemoteErrorKind};
use thiserror::Error;

/// YouTube Music provider errors
#[derive(Error, Debug)]
pub enum YouTubeMusicError {
    /// Auth header file missing, unreadable or lacking credentials
    #[error("Invalid auth headers: {0}")]
    InvalidAuth(String),

    /// Non-2xx HTTP response
    #[error("YouTube Music API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// `edit_playlist` answered with something other than `STATUS_SUCCEEDED`
    #[error("Playlist edit rejected: {status}")]
    EditRejected { status: String },

    /// Playlist does not exist or is not visible to this account
    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for YouTube Music operations
pub type Result<T> = std::result::Result<T, YouTubeMusicError>;

impl YouTubeMusicError {
    /// Remote classification used by the retry layer
    pub fn kind(&self) -> Option<RemoteErrorKind> {
        match self {
            YouTubeMusicError::InvalidAuth(_) => None,
            // The service answers throttled clients with 403, and 409 with a
            // concurrent edit in flight
            YouTubeMusicError::ApiError {
                status_code: 403 | 409,
                ..
            } => Some(RemoteErrorKind::RateLimited),
            YouTubeMusicError::ApiError { status_code, .. } => Some(
                RemoteErrorKind::from_status(*status_code).unwrap_or(RemoteErrorKind::ServerError),
            ),
            // Batches containing an unavailable item are rejected as a whole
            YouTubeMusicError::EditRejected { .. } => Some(RemoteErrorKind::ServerError),
            YouTubeMusicError::PlaylistNotFound { .. } => Some(RemoteErrorKind::NotFound),
            YouTubeMusicError::ParseError(_) => Some(RemoteErrorKind::MalformedResponse),
            YouTubeMusicError::BridgeError(e) => e.remote_kind(),
        }
    }
}

impl From<YouTubeMusicError> for BridgeError {
    fn from(error: YouTubeMusicError) -> Self {
        match error {
            YouTubeMusicError::BridgeError(e) => e,
            YouTubeMusicError::InvalidAuth(msg) => {
                BridgeError::OperationFailed(format!("Invalid auth headers: {}", msg))
            }
            other => {
                let kind = other.kind().unwrap_or(RemoteErrorKind::ServerError);
                BridgeError::remote(kind, other.to_string())
            }
        }
    }
}
