//! Browser request headers used to authenticate InnerTube calls
//!
//! The auth file is a flat JSON object of header names to values, copied
//! from an authenticated `music.youtube.com` browser session:
//!
//! ```json
//! {
//!   "cookie": "SAPISID=...; __Secure-3PAPISID=...",
//!   "authorization": "SAPISIDHASH 1714550400_...",
//!   "x-goog-authuser": "0"
//! }
//! ```

use crate::error::{Result, YouTubeMusicError};
use core_runtime::logging::redact_if_sensitive;
use std::collections::HashMap;
use std::fmt;

pub const ORIGIN: &str = "https://music.youtube.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Clone)]
pub struct AuthHeaders {
    headers: HashMap<String, String>,
}

impl AuthHeaders {
    /// Parse an auth file.
    ///
    /// Header names are lowercased. At least one of `cookie` or
    /// `authorization` must be present.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let parsed: HashMap<String, String> = serde_json::from_slice(raw)
            .map_err(|e| YouTubeMusicError::InvalidAuth(format!("not a JSON object: {}", e)))?;

        let headers: HashMap<String, String> = parsed
            .into_iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();

        if !headers.contains_key("cookie") && !headers.contains_key("authorization") {
            return Err(YouTubeMusicError::InvalidAuth(
                "neither cookie nor authorization header present".to_string(),
            ));
        }

        Ok(Self { headers })
    }

    /// Headers for one request: the auth file plus defaults it does not set
    pub fn request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.headers.clone();
        for (name, value) in [
            ("content-type", "application/json"),
            ("accept", "*/*"),
            ("origin", ORIGIN),
            ("x-origin", ORIGIN),
            ("x-goog-authuser", "0"),
            ("user-agent", USER_AGENT),
        ] {
            headers
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
        headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.headers.keys().collect();
        names.sort();
        f.debug_map()
            .entries(
                names
                    .into_iter()
                    .map(|k| (k, redact_if_sensitive(k, &self.headers[k]))),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases_and_fills_defaults() {
        let auth = AuthHeaders::from_json(
            br#"{"Cookie": "SAPISID=abc", "X-Goog-AuthUser": "2", "Empty": ""}"#,
        )
        .unwrap();

        assert_eq!(auth.len(), 2);
        let headers = auth.request_headers();
        assert_eq!(headers.get("cookie").map(String::as_str), Some("SAPISID=abc"));
        assert_eq!(headers.get("x-goog-authuser").map(String::as_str), Some("2"));
        assert_eq!(headers.get("origin").map(String::as_str), Some(ORIGIN));
        assert_eq!(
            headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_rejects_missing_credentials() {
        let err = AuthHeaders::from_json(br#"{"user-agent": "x"}"#).unwrap_err();
        assert!(matches!(err, YouTubeMusicError::InvalidAuth(_)));

        let err = AuthHeaders::from_json(b"[1, 2]").unwrap_err();
        assert!(matches!(err, YouTubeMusicError::InvalidAuth(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthHeaders::from_json(br#"{"cookie": "SAPISID=abc"}"#).unwrap();
        let rendered = format!("{:?}", auth);

        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("SAPISID=abc"));
    }
}
