use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Characters a short code may contain, in base62 digit order.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Upper bound for codes accepted on lookup paths; anything longer cannot have been issued.
const MAX_CODE_LEN: usize = 32;

/// A short code made only of [`ALPHABET`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Parse an externally supplied code, rejecting empty, oversized or non-alphanumeric input.
    pub fn parse(code: &str) -> Option<Self> {
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return None;
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(code.to_string()))
    }

    /// Wrap a code already known to be drawn from [`ALPHABET`].
    pub(crate) fn new_unchecked(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One stored mapping from short code to target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Insertion sequence assigned by storage, breaks `created_at` ties.
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

impl LinkRecord {
    pub fn short_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.short_code)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
}

/// Wire shape of a link returned by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_record(record: LinkRecord, base_url: &str) -> Self {
        let short_url = record.short_url(base_url);
        Self {
            short_code: record.short_code,
            short_url,
            original_url: record.original_url,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL cannot be empty")]
    Empty,
    #[error("URL must start with http:// or https://")]
    UnsupportedScheme,
    #[error("URL is malformed: {0}")]
    Malformed(String),
    #[error("URL must include a host")]
    MissingHost,
}

/// Validate a submitted target URL and return the form that gets stored.
///
/// Surrounding whitespace is dropped; the rest of the input is kept as the
/// caller wrote it so the redirect goes exactly where they asked.
pub fn normalize_original_url(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = trimmed
        .get(..8)
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
        return Err(UrlError::UnsupportedScheme);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::Malformed(e.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(UrlError::MissingHost),
    }
}
