use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] BridgeError),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Template cache error: {0}")]
    Cache(String),

    #[error("Invalid playlist: {0}")]
    InvalidPlaylist(String),
}

impl SyncError {
    /// Whether the underlying remote failure was classified as transient.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn remote_kind(&self) -> Option<bridge_traits::RemoteErrorKind> {
        match self {
            SyncError::Remote(e) => e.remote_kind(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
