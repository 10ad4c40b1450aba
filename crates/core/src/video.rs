//! Video links accepted by the content editor.
//!
//! Content URLs are only checked locally against a fixed set of link shapes;
//! the backend stores whatever it is sent.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Hosting service of a video link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoProvider {
    YouTube,
    Vimeo,
    GoogleDrive,
}

/// Error returned for a URL that matches none of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoLinkError {
    #[error("影片網址不可為空")]
    Empty,
    #[error("不支援的影片網址格式")]
    Unsupported,
}

struct Pattern {
    provider: VideoProvider,
    regex: Regex,
}

#[allow(clippy::unwrap_used)] // Static patterns, covered by tests
static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    let pattern = |provider, re: &str| Pattern {
        provider,
        regex: Regex::new(re).unwrap(),
    };
    vec![
        pattern(
            VideoProvider::YouTube,
            r"^https?://(?:www\.|m\.)?youtube\.com/watch\?(?:.*&)?v=(?P<id>[\w-]{11})",
        ),
        pattern(
            VideoProvider::YouTube,
            r"^https?://youtu\.be/(?P<id>[\w-]{11})",
        ),
        pattern(
            VideoProvider::YouTube,
            r"^https?://(?:www\.)?youtube(?:-nocookie)?\.com/(?:embed|shorts)/(?P<id>[\w-]{11})",
        ),
        pattern(
            VideoProvider::Vimeo,
            r"^https?://(?:www\.)?vimeo\.com/(?P<id>\d+)",
        ),
        pattern(
            VideoProvider::Vimeo,
            r"^https?://player\.vimeo\.com/video/(?P<id>\d+)",
        ),
        pattern(
            VideoProvider::GoogleDrive,
            r"^https?://drive\.google\.com/file/d/(?P<id>[\w-]+)",
        ),
    ]
});

/// A validated video link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    provider: VideoProvider,
    id: String,
    original: String,
}

impl VideoLink {
    /// Match `url` against the accepted link shapes.
    ///
    /// # Errors
    ///
    /// Returns [`VideoLinkError::Empty`] for a blank URL and
    /// [`VideoLinkError::Unsupported`] when no shape matches.
    pub fn parse(url: &str) -> Result<Self, VideoLinkError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VideoLinkError::Empty);
        }

        PATTERNS
            .iter()
            .find_map(|pattern| {
                pattern.regex.captures(url).and_then(|caps| {
                    caps.name("id").map(|id| Self {
                        provider: pattern.provider,
                        id: id.as_str().to_owned(),
                        original: url.to_owned(),
                    })
                })
            })
            .ok_or(VideoLinkError::Unsupported)
    }

    #[must_use]
    pub const fn provider(&self) -> VideoProvider {
        self.provider
    }

    /// Provider-specific video identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The URL as submitted (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// URL suitable for an `<iframe>` player.
    #[must_use]
    pub fn embed_url(&self) -> String {
        match self.provider {
            VideoProvider::YouTube => format!("https://www.youtube.com/embed/{}", self.id),
            VideoProvider::Vimeo => format!("https://player.vimeo.com/video/{}", self.id),
            VideoProvider::GoogleDrive => {
                format!("https://drive.google.com/file/d/{}/preview", self.id)
            }
        }
    }
}

/// Player source for a stored content URL.
///
/// Known shapes are converted to their embed form; anything else is passed
/// through untouched.
#[must_use]
pub fn player_src(url: &str) -> String {
    VideoLink::parse(url).map_or_else(|_| url.trim().to_owned(), |link| link.embed_url())
}
