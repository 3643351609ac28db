use std::fmt;

use thiserror::Error;

/// Classification of a failure reported by a remote service.
///
/// The kind is assigned once, at the transport boundary, so that retry
/// decisions never depend on the wording of an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// HTTP 429 or an explicit quota signal from the service
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// Empty or unparsable response body
    MalformedResponse,
    /// Connection, DNS, TLS or timeout failure
    Network,
    /// The addressed playlist or item does not exist
    NotFound,
    /// Credentials rejected or insufficient (HTTP 401/403)
    PermissionDenied,
    /// The service rejected the request itself (other 4xx)
    InvalidRequest,
}

impl RemoteErrorKind {
    /// Whether a request failing with this kind may succeed when repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteErrorKind::RateLimited
                | RemoteErrorKind::ServerError
                | RemoteErrorKind::MalformedResponse
                | RemoteErrorKind::Network
        )
    }

    /// Classify an HTTP status code. Returns `None` for 2xx/3xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(RemoteErrorKind::RateLimited),
            401 | 403 => Some(RemoteErrorKind::PermissionDenied),
            404 | 410 => Some(RemoteErrorKind::NotFound),
            400..=499 => Some(RemoteErrorKind::InvalidRequest),
            500..=599 => Some(RemoteErrorKind::ServerError),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::ServerError => "server error",
            RemoteErrorKind::MalformedResponse => "malformed response",
            RemoteErrorKind::Network => "network failure",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::PermissionDenied => "permission denied",
            RemoteErrorKind::InvalidRequest => "invalid request",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote call failed ({kind}): {message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        BridgeError::Remote {
            kind,
            message: message.into(),
        }
    }

    /// The remote classification, if this error came from a remote service.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            BridgeError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Only classified remote failures are ever retried.
    pub fn is_transient(&self) -> bool {
        self.remote_kind().is_some_and(|kind| kind.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
