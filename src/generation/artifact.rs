//! Playable results of successful generations.
//!
//! The service always serves the latest audio under one stable path, so every
//! artifact gets its own `ts` query token to defeat caching of an older
//! result.

use std::time::{SystemTime, UNIX_EPOCH};

/// Handle to one generated audio result.  Opaque beyond being loadable by an
/// [`AudioEngine`](crate::playback::AudioEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub url: String,
    pub created_at: SystemTime,
}

/// Mints [`Artifact`]s with strictly increasing cache-busting tokens.
#[derive(Debug, Clone)]
pub struct ArtifactFactory {
    stream_url: String,
    last_token: u128,
}

impl ArtifactFactory {
    pub fn new(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            last_token: 0,
        }
    }

    /// A new artifact pointing at the stream URL with a fresh token.
    ///
    /// The token is the current time in milliseconds, bumped when two
    /// artifacts are minted within the same millisecond.
    pub fn mint(&mut self) -> Artifact {
        let created_at = SystemTime::now();
        let now_ms = created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let token = now_ms.max(self.last_token + 1);
        self.last_token = token;

        let separator = if self.stream_url.contains('?') { '&' } else { '?' };
        Artifact {
            url: format!("{}{separator}ts={token}", self.stream_url),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_appends_ts_token() {
        let mut factory = ArtifactFactory::new("http://127.0.0.1:5000/stream-mp3");
        let artifact = factory.mint();
        assert!(artifact
            .url
            .starts_with("http://127.0.0.1:5000/stream-mp3?ts="));
    }

    #[test]
    fn tokens_are_unique_even_within_one_millisecond() {
        let mut factory = ArtifactFactory::new("http://host/stream-mp3");
        let urls: Vec<String> = (0..50).map(|_| factory.mint().url).collect();
        let mut deduped = urls.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), urls.len());
    }

    #[test]
    fn existing_query_uses_ampersand() {
        let mut factory = ArtifactFactory::new("http://host/stream-mp3?voice=piano");
        assert!(factory.mint().url.contains("?voice=piano&ts="));
    }
}
