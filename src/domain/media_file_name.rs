use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TOKEN_LEN: usize = 8;
const KNOWN_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi", "flv", "gif"];
const DEFAULT_EXTENSION: &str = "mp4";

/// Name of a persisted media file:
/// `{provider}_{timestamp}_{index}_{token}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileName(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileNameParts {
    pub provider: String,
    pub timestamp: DateTime<Utc>,
    pub index: u32,
    pub token: String,
    pub extension: String,
}

impl MediaFileName {
    /// Builds a fresh name for the media at `url`, using the current time and
    /// a random token.
    pub fn generate(provider: &str, index: u32, url: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self::compose(
            provider,
            Utc::now(),
            index,
            &token[..TOKEN_LEN],
            extension_from_url(url),
        )
    }

    pub fn compose(
        provider: &str,
        timestamp: DateTime<Utc>,
        index: u32,
        token: &str,
        extension: &str,
    ) -> Self {
        Self(format!(
            "{}_{}_{}_{}.{}",
            provider,
            timestamp.format(TIMESTAMP_FORMAT),
            index,
            token,
            extension
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits a file name back into its parts; `None` if it does not follow
    /// the naming scheme.
    pub fn parse(name: &str) -> Option<MediaFileNameParts> {
        let (stem, extension) = name.rsplit_once('.')?;
        let mut parts = stem.rsplitn(4, '_');
        let token = parts.next()?;
        let index = parts.next()?.parse::<u32>().ok()?;
        let timestamp = parts.next()?;
        let provider = parts.next()?;

        if provider.is_empty()
            || token.len() != TOKEN_LEN
            || !token.chars().all(|c| c.is_ascii_hexdigit())
        {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();

        Some(MediaFileNameParts {
            provider: provider.to_string(),
            timestamp,
            index,
            token: token.to_string(),
            extension: extension.to_string(),
        })
    }
}

impl fmt::Display for MediaFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media extension taken from the URL path, ignoring query and fragment.
pub fn extension_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| KNOWN_EXTENSIONS.iter().find(|known| **known == ext).copied())
        .unwrap_or(DEFAULT_EXTENSION)
}
