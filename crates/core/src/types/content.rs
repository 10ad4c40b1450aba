//! Content items as seen by the admin panel and by learners.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ContentId;

/// Access tier of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Available to every registered learner.
    #[default]
    Free,
    /// Standard paid tier.
    Paid,
    /// VIP tier, granted per user.
    Vip,
}

impl ContentType {
    /// All tiers, in display order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Paid, Self::Vip];

    /// Wire value (`free`, `paid`, `vip`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::Vip => "vip",
        }
    }

    /// Human-readable label shown in badges and selects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "免費",
            Self::Paid => "常態付費",
            Self::Vip => "VIP",
        }
    }

    /// Badge CSS modifier.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Free => "success",
            Self::Paid => "info",
            Self::Vip => "warning",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known content type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl std::str::FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            "vip" => Ok(Self::Vip),
            other => Err(UnknownContentType(other.to_owned())),
        }
    }
}

/// A content item in the admin catalogue (`getAllContent`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_id: ContentId,
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of users holding explicit access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u64>,
}

/// A content card on the learner dashboard (`getContent`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerContent {
    pub content_id: ContentId,
    pub title: String,
    /// Player URL. Only meaningful when `is_unlocked`.
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(alias = "type")]
    pub content_type: ContentType,
    #[serde(rename = "isUnlocked")]
    pub is_unlocked: bool,
}

impl LearnerContent {
    /// Badge CSS modifier: exactly one of `unlocked` / `locked`.
    #[must_use]
    pub const fn status_class(&self) -> &'static str {
        if self.is_unlocked { "unlocked" } else { "locked" }
    }

    /// Badge text matching [`Self::status_class`].
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.is_unlocked { "已解鎖" } else { "需付費" }
    }
}

/// Fields submitted by the content editor for `addContent` / `updateContent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDraft {
    pub title: String,
    pub url: String,
    pub content_type: ContentType,
    pub description: String,
}

/// One row of an `updateContentTypes` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeUpdate {
    pub content_id: ContentId,
    pub content_type: ContentType,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_wire_values() {
        for ty in ContentType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            assert_eq!(ty.as_str().parse::<ContentType>().unwrap(), ty);
        }
        assert!("gold".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_learner_content_accepts_type_alias() {
        let item: LearnerContent = serde_json::from_str(
            r#"{"content_id":"C1","title":"Intro","url":"https://youtu.be/x","type":"vip","isUnlocked":false}"#,
        )
        .unwrap();
        assert_eq!(item.content_type, ContentType::Vip);
        assert!(!item.is_unlocked);
        assert_eq!(item.thumbnail, None);
    }

    #[test]
    fn test_badge_is_exclusive() {
        let mut item = LearnerContent {
            content_id: ContentId::new("C1"),
            title: "Intro".to_string(),
            url: String::new(),
            thumbnail: None,
            content_type: ContentType::Free,
            is_unlocked: true,
        };
        assert_eq!((item.status_class(), item.status_label()), ("unlocked", "已解鎖"));
        item.is_unlocked = false;
        assert_eq!((item.status_class(), item.status_label()), ("locked", "需付費"));
    }

    #[test]
    fn test_content_item_optional_fields() {
        let item: ContentItem = serde_json::from_str(
            r#"{"content_id":"C2","title":"Deep dive","content_type":"paid"}"#,
        )
        .unwrap();
        assert_eq!(item.access_count, None);
        assert_eq!(item.description, None);
        assert!(item.url.is_empty());
    }
}
